use crate::{CanonicalEvent, ConversationTurn, Correlation, EventKind, Role};
use serde_json::{Map, Value};

/// Event with only a run id set.
pub fn event(run_id: Option<&str>, kind: EventKind) -> CanonicalEvent {
    CanonicalEvent::new(
        Correlation {
            run_id: run_id.map(str::to_string),
            timestamp: Some(f64::from(next_id())),
            ..Default::default()
        },
        kind,
    )
}

pub fn message_start(message_id: &str, role: Role) -> CanonicalEvent {
    event(
        None,
        EventKind::MessageStart {
            message_id: message_id.to_string(),
            role,
        },
    )
}

pub fn message_content(message_id: &str, delta: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::MessageContent {
            message_id: message_id.to_string(),
            delta: delta.to_string(),
        },
    )
}

pub fn message_end(message_id: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::MessageEnd {
            message_id: message_id.to_string(),
        },
    )
}

pub fn tool_start(tool_call_id: &str, tool_name: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::ToolStart {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            parent_message_id: None,
        },
    )
}

pub fn tool_args(tool_call_id: &str, delta: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::ToolArgs {
            tool_call_id: tool_call_id.to_string(),
            delta: delta.to_string(),
        },
    )
}

pub fn tool_end(tool_call_id: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::ToolEnd {
            tool_call_id: tool_call_id.to_string(),
        },
    )
}

pub fn tool_result(tool_call_id: &str, content: &str) -> CanonicalEvent {
    event(
        None,
        EventKind::ToolResult {
            tool_call_id: tool_call_id.to_string(),
            tool_name: None,
            content: content.to_string(),
        },
    )
}

/// State delta from a JSON object literal; non-objects yield an empty delta.
pub fn state_delta(delta: Value) -> CanonicalEvent {
    let delta = match delta {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    event(None, EventKind::StateDelta { delta })
}

/// Same event, attributed to `run_id`.
pub fn in_run(mut event: CanonicalEvent, run_id: &str) -> CanonicalEvent {
    event.correlation.run_id = Some(run_id.to_string());
    event
}

pub fn turn(id: &str, role: Role, content: &str) -> ConversationTurn {
    ConversationTurn::new(id, role, content)
}

fn next_id() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
