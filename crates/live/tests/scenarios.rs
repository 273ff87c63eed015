use serde_json::{Value, json};
use std::collections::HashSet;
use turnweave_core::testing::{
    in_run, message_content, message_end, message_start, tool_args, tool_result, tool_start, turn,
};
use turnweave_core::{ConversationTurn, Role, TimelineItem, ToolStatus};
use turnweave_live::{
    LiveUpdate, RunSignal, SessionView, SyncError, assemble_turns, fold_timeline,
    merge_adjacent_turns, reconcile,
};
use turnweave_runtime_config::EngineConfig;

fn ids(turns: &[ConversationTurn]) -> Vec<&str> {
    turns.iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn user_message_assembles_into_one_turn() {
    let events = vec![
        message_start("m1", Role::User),
        message_content("m1", "ping"),
        message_end("m1"),
    ];
    assert_eq!(
        assemble_turns(&events),
        vec![ConversationTurn::new("m1", Role::User, "ping")]
    );
}

#[test]
fn streamed_tool_args_and_result_fold_into_one_item() {
    let events = vec![
        tool_start("t1", "search"),
        tool_args("t1", r#"{"q":"#),
        tool_args("t1", r#""x"}"#),
        tool_result("t1", "5 hits"),
    ];
    let timeline = fold_timeline(&events, 200);
    assert_eq!(timeline.len(), 1);
    let tool = timeline[0].as_tool().unwrap();
    assert_eq!(tool.id, "t1");
    assert_eq!(tool.name, "search");
    assert_eq!(tool.status, ToolStatus::Completed);
    assert_eq!(tool.args, r#"{"q":"x"}"#);
    assert_eq!(tool.result.as_deref(), Some("5 hits"));
}

#[test]
fn orphan_result_becomes_standalone_item() {
    let timeline = fold_timeline(&[tool_result("t2", "done")], 200);
    assert_eq!(timeline.len(), 1);
    let tool = timeline[0].as_tool().unwrap();
    assert_eq!(tool.id, "t2");
    assert_eq!(tool.status, ToolStatus::Completed);
    assert_eq!(tool.result.as_deref(), Some("done"));
}

#[test]
fn optimistic_turn_is_absorbed_on_confirmation() {
    let optimistic = vec![turn("tmp1", Role::User, "hello")];
    assert_eq!(reconcile(&[], &[], &optimistic), optimistic);

    let base = vec![turn("tmp1", Role::User, "hello")];
    let out = reconcile(&base, &[], &optimistic);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "tmp1");
}

#[test]
fn same_run_fragments_merge_without_separator() {
    let merged = merge_adjacent_turns(vec![
        turn("a", Role::Assistant, "The answer is").with_run_id("r1"),
        turn("b", Role::Assistant, " 42").with_run_id("r1"),
    ]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].content, "The answer is 42");
}

#[test]
fn content_is_concatenation_of_deltas() {
    let deltas = ["Hel", "lo", ", ", "", "wor", "ld", "\n"];
    let mut events = vec![message_start("m1", Role::Assistant)];
    events.extend(deltas.iter().map(|d| message_content("m1", d)));
    let turns = assemble_turns(&events);
    assert_eq!(turns[0].content, deltas.concat());
}

#[test]
fn separator_law() {
    let cases = [
        (Some("r1"), Some("r1"), "ab"),
        (Some("r1"), Some("r2"), "a\n\nb"),
        (None, Some("r1"), "a\n\nb"),
        (Some("r1"), None, "a\n\nb"),
        (None, None, "a\n\nb"),
    ];
    for (left, right, expected) in cases {
        let with_run = |t: ConversationTurn, run: Option<&str>| match run {
            Some(run) => t.with_run_id(run),
            None => t,
        };
        let merged = merge_adjacent_turns(vec![
            with_run(turn("1", Role::Assistant, "a"), left),
            with_run(turn("2", Role::Assistant, "b"), right),
        ]);
        assert_eq!(merged[0].content, expected, "runs {left:?} / {right:?}");
    }
}

#[test]
fn reconciled_ids_are_always_unique() {
    let base = vec![
        turn("x", Role::User, "1"),
        turn("x", Role::Assistant, "2"),
        turn("x:1", Role::User, "3"),
    ];
    let live = vec![turn("x", Role::Assistant, "4"), turn("y", Role::Assistant, "5")];
    let optimistic = vec![turn("y", Role::User, "6"), turn("x:2", Role::User, "7")];

    let out = reconcile(&base, &live, &optimistic);
    let unique: HashSet<&str> = ids(&out).into_iter().collect();
    assert_eq!(unique.len(), out.len());
}

#[test]
fn confirmed_superset_never_grows_visible_count() {
    let optimistic = vec![
        turn("tmp1", Role::User, "first"),
        turn("tmp2", Role::User, "second"),
    ];
    let before = reconcile(&[], &[], &optimistic);
    let base = vec![
        turn("tmp1", Role::User, "first"),
        turn("a1", Role::Assistant, "reply"),
    ];
    let after = reconcile(&base, &[], &optimistic);

    for id in ["tmp1", "tmp2"] {
        let count = |turns: &[ConversationTurn]| turns.iter().filter(|t| t.id == id).count();
        assert!(count(&after) <= count(&before));
    }
}

fn user(id: &str, text: &str) -> Value {
    json!({"id": id, "author": "user", "content": {"parts": [{"text": text}]}})
}

fn agent(id: &str, run: &str, text: &str) -> Value {
    json!({"id": id, "runId": run, "author": "agent", "content": {"parts": [{"text": text}]}})
}

#[test]
fn session_round_trip_from_optimistic_to_confirmed() {
    let mut view = SessionView::default();
    let ticket = view.switch_session("s1");

    view.apply(
        &ticket,
        LiveUpdate::LocalTurn(ConversationTurn::new("tmp1", Role::User, "what is 6x7?")),
    )
    .unwrap();
    view.apply(&ticket, LiveUpdate::Run(RunSignal::Started { run_id: None }))
        .unwrap();
    view.apply(
        &ticket,
        LiveUpdate::RecordsAppended(vec![
            agent("a1", "r1", "The answer is"),
            agent("a2", "r1", " 42"),
        ]),
    )
    .unwrap();

    let streaming = view.turns();
    assert_eq!(ids(&streaming), vec!["tmp1", "a1"]);
    assert_eq!(streaming[1].content, "The answer is 42");

    view.apply(
        &ticket,
        LiveUpdate::HistoryLoaded(vec![
            user("tmp1", "what is 6x7?"),
            agent("a1", "r1", "The answer is"),
            agent("a2", "r1", " 42"),
        ]),
    )
    .unwrap();

    let confirmed = view.render();
    assert_eq!(confirmed.pending_optimistic, 0);
    assert_eq!(ids(&confirmed.turns), vec!["tmp1", "a1"]);
    assert_eq!(confirmed.turns[1].content, "The answer is 42");
}

fn messages_snapshot(id: &str, messages: Value) -> Value {
    json!({"id": id, "actions": {"messagesSnapshot": messages}})
}

#[test]
fn streamed_reply_yields_to_confirmed_reply_with_different_id() {
    let mut view = SessionView::default();
    let ticket = view.switch_session("s1");
    view.apply(&ticket, LiveUpdate::HistoryLoaded(vec![user("u1", "q")]))
        .unwrap();
    view.apply(
        &ticket,
        LiveUpdate::RecordsAppended(vec![agent("chunk-1", "r1", "The answer is 42")]),
    )
    .unwrap();
    assert_eq!(ids(&view.turns()), vec!["u1", "chunk-1"]);

    view.apply(
        &ticket,
        LiveUpdate::HistoryLoaded(vec![user("u1", "q"), agent("a1", "r1", "The answer is 42")]),
    )
    .unwrap();
    let turns = view.turns();
    assert_eq!(ids(&turns), vec!["u1", "a1"]);
    assert_eq!(turns[1].content, "The answer is 42");
}

#[test]
fn streamed_reply_fills_empty_assistant_slot_until_confirmed() {
    let mut view = SessionView::default();
    let ticket = view.switch_session("s1");
    view.apply(
        &ticket,
        LiveUpdate::RecordsAppended(vec![
            messages_snapshot(
                "snap-1",
                json!([
                    {"id": "u1", "role": "user", "content": "q"},
                    {"id": "a1", "role": "assistant", "content": "", "runId": "r1"}
                ]),
            ),
            agent("chunk-1", "r1", "partial"),
        ]),
    )
    .unwrap();
    let streaming = view.turns();
    assert_eq!(ids(&streaming), vec!["u1", "a1"]);
    assert_eq!(streaming[1].content, "partial");

    view.apply(
        &ticket,
        LiveUpdate::RecordsAppended(vec![messages_snapshot(
            "snap-2",
            json!([
                {"id": "u1", "role": "user", "content": "q"},
                {"id": "a1", "role": "assistant", "content": "final", "runId": "r1"}
            ]),
        )]),
    )
    .unwrap();
    let confirmed = view.turns();
    assert_eq!(ids(&confirmed), vec!["u1", "a1"]);
    assert_eq!(confirmed[1].content, "final");
}

#[test]
fn history_and_snapshot_order_does_not_change_output() {
    let history = vec![user("u1", "q")];
    let snapshot = messages_snapshot(
        "snap-1",
        json!([
            {"id": "u1", "role": "user", "content": "q"},
            {"id": "a1", "role": "assistant", "content": "a", "runId": "r1"}
        ]),
    );

    let mut history_first = SessionView::default();
    let ticket = history_first.switch_session("s1");
    history_first
        .apply(&ticket, LiveUpdate::HistoryLoaded(history.clone()))
        .unwrap();
    history_first
        .apply(&ticket, LiveUpdate::RecordsAppended(vec![snapshot.clone()]))
        .unwrap();

    let mut snapshot_first = SessionView::default();
    let ticket = snapshot_first.switch_session("s1");
    snapshot_first
        .apply(&ticket, LiveUpdate::RecordsAppended(vec![snapshot]))
        .unwrap();
    snapshot_first
        .apply(&ticket, LiveUpdate::HistoryLoaded(history))
        .unwrap();

    assert_eq!(ids(&history_first.turns()), vec!["u1", "a1"]);
    assert_eq!(history_first.render(), snapshot_first.render());
}

#[test]
fn stale_callbacks_are_rejected_after_switch() {
    let mut view = SessionView::default();
    let first = view.switch_session("s1");
    let second = view.switch_session("s2");

    let err = view
        .apply(&first, LiveUpdate::RecordsAppended(vec![agent("a", "r", "late")]))
        .unwrap_err();
    assert!(matches!(err, SyncError::Stale { generation: 1, active_generation: 2, .. }));
    assert!(view.render().turns.is_empty());

    view.apply(&second, LiveUpdate::RecordsAppended(vec![agent("b", "r", "fresh")]))
        .unwrap();
    assert_eq!(ids(&view.turns()), vec!["b"]);
}

#[test]
fn failed_fetch_is_retryable_and_keeps_content() {
    let mut view = SessionView::default();
    let ticket = view.switch_session("s1");
    view.apply(&ticket, LiveUpdate::HistoryLoaded(vec![user("u1", "hi")]))
        .unwrap();

    let err = view
        .apply(&ticket, LiveUpdate::FetchFailed("timeout".to_string()))
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(ids(&view.turns()), vec!["u1"]);
}

#[test]
fn raw_event_ring_keeps_only_recent_events() {
    let mut config = EngineConfig::default();
    config.buffers.raw_event_cap = 2;
    config.buffers.timeline_display_cap = 10;
    let mut view = SessionView::new(config);
    let ticket = view.switch_session("s1");

    let records: Vec<Value> = (0..5)
        .map(|i| json!({"id": format!("e{i}"), "actions": {"stateDelta": {(format!("k{i}")): i}}}))
        .collect();
    view.apply_live(&ticket, &records).unwrap();

    let snapshot = view.render();
    assert_eq!(snapshot.timeline.len(), 2);
    let state = snapshot.state.unwrap();
    assert!(state.contains_key("k4"));
    assert!(!state.contains_key("k0"));
}

#[test]
fn timeline_display_cap_evicts_oldest() {
    let events: Vec<_> = (0..4)
        .map(|i| in_run(tool_start(&format!("t{i}"), "ls"), "r1"))
        .collect();
    let timeline = fold_timeline(&events, 3);
    let kept: Vec<&str> = timeline.iter().map(TimelineItem::id).collect();
    assert_eq!(kept, vec!["t1", "t2", "t3"]);
}
