//! Message Assembler: canonical events -> conversation turns.
//!
//! Content fragments are concatenated per message id in arrival order; the
//! turn order is the order in which each id was first seen.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use turnweave_core::{CanonicalEvent, ConversationTurn, EventKind, Role};

#[derive(Default)]
struct Assembler {
    turns: Vec<ConversationTurn>,
    index: HashMap<String, usize>,
}

impl Assembler {
    fn push(&mut self, event: &CanonicalEvent, suppressed: &HashSet<String>) {
        match &event.kind {
            EventKind::MessageStart { message_id, role } => {
                if suppressed.contains(message_id) || self.index.contains_key(message_id) {
                    return;
                }
                self.insert(message_id, *role, String::new(), event.run_id());
            }
            EventKind::MessageContent { message_id, delta } => {
                if let Some(&i) = self.index.get(message_id) {
                    let turn = &mut self.turns[i];
                    turn.content.push_str(delta);
                    if turn.run_id.is_none() {
                        turn.run_id = event.correlation.run_id.clone();
                    }
                } else if !suppressed.contains(message_id) {
                    // Content before start: the role was never declared.
                    self.insert(message_id, Role::Assistant, delta.clone(), event.run_id());
                }
            }
            _ => {}
        }
    }

    fn insert(&mut self, message_id: &str, role: Role, content: String, run_id: Option<&str>) {
        self.index.insert(message_id.to_string(), self.turns.len());
        self.turns.push(ConversationTurn {
            id: message_id.to_string(),
            role,
            content,
            run_id: run_id.map(str::to_string),
        });
    }

    fn finish(self, keep: impl Fn(&ConversationTurn) -> bool) -> Vec<ConversationTurn> {
        self.turns.into_iter().filter(keep).collect()
    }
}

/// Blank assistant turns are slots whose reply has not been persisted yet;
/// they stay in the confirmed list so the live overlay can fill them.
fn keep_confirmed(turn: &ConversationTurn) -> bool {
    !turn.is_blank() || turn.role == Role::Assistant
}

/// Assemble confirmed turns (history replay). Every role is kept, and so are
/// empty assistant slots.
pub fn assemble_turns<'a>(
    events: impl IntoIterator<Item = &'a CanonicalEvent>,
) -> Vec<ConversationTurn> {
    let none = HashSet::new();
    let mut assembler = Assembler::default();
    for event in events {
        assembler.push(event, &none);
    }
    assembler.finish(keep_confirmed)
}

/// Assemble the live overlay.
///
/// Ids in `suppressed` are already shown as optimistic entries and are not
/// echoed again. User turns are dropped: the user's own text comes from
/// history or optimistic entries, never from the live echo.
pub fn assemble_live_turns<'a>(
    events: impl IntoIterator<Item = &'a CanonicalEvent>,
    suppressed: &HashSet<String>,
) -> Vec<ConversationTurn> {
    let mut assembler = Assembler::default();
    for event in events {
        assembler.push(event, suppressed);
    }
    assembler.finish(|turn| !turn.is_blank() && turn.role != Role::User)
}

/// Turns carried by a `messages-snapshot` payload.
///
/// Each message needs an id and a conversational role. Tool messages are
/// skipped, as are entries without text unless they are assistant slots.
pub fn turns_from_messages_snapshot(messages: &[Value]) -> Vec<ConversationTurn> {
    messages
        .iter()
        .filter_map(|message| {
            let obj = message.as_object()?;
            let id = match obj.get("id")? {
                Value::String(s) if !s.trim().is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let role = obj
                .get("role")
                .and_then(Value::as_str)
                .and_then(Role::from_label)?;
            let content = obj.get("content").map(snapshot_content).unwrap_or_default();
            let run_id = obj
                .get("runId")
                .and_then(Value::as_str)
                .map(str::to_string);
            let turn = ConversationTurn {
                id,
                role,
                content,
                run_id,
            };
            keep_confirmed(&turn).then_some(turn)
        })
        .collect()
}

fn snapshot_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| {
                part.as_str()
                    .or_else(|| part.get("text").and_then(Value::as_str))
            })
            .collect(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnweave_core::testing::{in_run, message_content, message_end, message_start};

    #[test]
    fn content_concatenates_in_arrival_order() {
        let events = vec![
            message_start("m1", Role::Assistant),
            message_content("m1", "a"),
            message_content("m1", "b"),
            message_content("m1", " c"),
            message_end("m1"),
        ];
        let turns = assemble_turns(&events);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "ab c");
    }

    #[test]
    fn interleaved_ids_keep_first_seen_order() {
        let events = vec![
            message_start("m1", Role::User),
            message_start("m2", Role::Assistant),
            message_content("m2", "second"),
            message_content("m1", "first"),
        ];
        let ids: Vec<_> = assemble_turns(&events).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn content_without_start_creates_assistant_turn() {
        let events = vec![in_run(message_content("m9", "orphan"), "r1")];
        let turns = assemble_turns(&events);
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[0].run_id.as_deref(), Some("r1"));
    }

    #[test]
    fn duplicate_start_does_not_reset_content() {
        let events = vec![
            message_start("m1", Role::Assistant),
            message_content("m1", "kept"),
            message_start("m1", Role::Assistant),
        ];
        assert_eq!(assemble_turns(&events)[0].content, "kept");
    }

    #[test]
    fn blank_assistant_slots_survive_confirmed_assembly() {
        let events = vec![
            message_start("u1", Role::User),
            message_content("u1", "  \n"),
            message_start("a1", Role::Assistant),
        ];
        let turns = assemble_turns(&events);
        assert_eq!(turns, vec![ConversationTurn::new("a1", Role::Assistant, "")]);
        assert!(assemble_live_turns(&events, &HashSet::new()).is_empty());
    }

    #[test]
    fn live_assembly_drops_user_and_suppressed_ids() {
        let events = vec![
            message_start("u1", Role::User),
            message_content("u1", "hello"),
            message_start("a1", Role::Assistant),
            message_content("a1", "hi"),
            message_content("tmp", "echo of optimistic text"),
        ];
        let suppressed: HashSet<String> = ["tmp".to_string()].into_iter().collect();
        let turns = assemble_live_turns(&events, &suppressed);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].id, "a1");
    }

    #[test]
    fn messages_snapshot_turns() {
        let messages = vec![
            json!({"id": "m1", "role": "user", "content": "hi"}),
            json!({"id": "m2", "role": "assistant", "content": [{"type": "text", "text": "yo"}]}),
            json!({"id": "m3", "role": "tool", "content": "ignored"}),
            json!({"role": "assistant", "content": "no id"}),
            json!({"id": "m4", "role": "assistant", "content": ""}),
            json!({"id": "m5", "role": "user", "content": " "}),
        ];
        let turns = turns_from_messages_snapshot(&messages);
        assert_eq!(
            turns,
            vec![
                ConversationTurn::new("m1", Role::User, "hi"),
                ConversationTurn::new("m2", Role::Assistant, "yo"),
                ConversationTurn::new("m4", Role::Assistant, ""),
            ]
        );
    }
}
