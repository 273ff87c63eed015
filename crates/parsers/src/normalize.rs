//! Origin record -> canonical events.
//!
//! Emission order for one record is fixed:
//! 1. text message (`message-start`, `message-content`, `message-end`)
//! 2. call-style tool invocations (`tool-start`, `tool-args`, `tool-end`)
//! 3. response-style parts (`tool-result`)
//! 4. artifact / state / step / raw / custom payloads
//!
//! All events from one record share its correlation fields.

use crate::common::{
    args_delta, function_call, function_response, is_tool_role, non_empty_object, parts_text,
    response_text, step_name, str_field, timestamp_seconds,
};
use crate::record::{
    MessageContent, OpenAiToolCall, OriginRecord, RecordActions, RecordContent,
};
use serde_json::Value;
use turnweave_core::{CanonicalEvent, Correlation, EventKind, Role};

/// Normalize a loosely-typed record. Non-object or unreadable records yield
/// no events.
pub fn normalize_value(value: &Value) -> Vec<CanonicalEvent> {
    if !value.is_object() {
        tracing::debug!("skipping non-object origin record");
        return Vec::new();
    }
    match serde_json::from_value::<OriginRecord>(value.clone()) {
        Ok(record) => normalize_record(&record),
        Err(e) => {
            tracing::debug!("skipping malformed origin record: {e}");
            Vec::new()
        }
    }
}

/// Normalize a batch, preserving record order.
pub fn normalize_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<CanonicalEvent> {
    values.into_iter().flat_map(normalize_value).collect()
}

pub fn normalize_record(record: &OriginRecord) -> Vec<CanonicalEvent> {
    let mut out = Emitter {
        correlation: Correlation {
            thread_id: record.thread_id.clone(),
            run_id: record.run_id.clone(),
            timestamp: record.timestamp.as_ref().and_then(timestamp_seconds),
            source_id: record.id.clone(),
        },
        events: Vec::new(),
    };

    let parts = record_parts(record);

    if let Some(id) = record.id.as_deref() {
        let tool_response = is_tool_response(record, parts);
        if !tool_response {
            emit_text(&mut out, id, record, parts);
        }
        emit_tool_calls(&mut out, id, record, parts);
        emit_tool_results(&mut out, id, record, parts, tool_response);
    } else if parts.is_some() || record.message.is_some() {
        tracing::debug!("origin record without id; dropping message and tool payloads");
    }

    if let Some(actions) = &record.actions {
        emit_actions(&mut out, actions);
    }
    if let Some(raw) = record.raw.as_ref().filter(|v| !v.is_null()) {
        out.push(EventKind::Raw { event: raw.clone() });
    }
    if let Some(custom) = record.custom.as_ref().filter(|v| !v.is_null()) {
        emit_custom(&mut out, custom);
    }

    out.events
}

struct Emitter {
    correlation: Correlation,
    events: Vec<CanonicalEvent>,
}

impl Emitter {
    fn push(&mut self, kind: EventKind) {
        self.events
            .push(CanonicalEvent::new(self.correlation.clone(), kind));
    }
}

fn record_parts(record: &OriginRecord) -> Option<&[Value]> {
    match &record.content {
        Some(RecordContent::Parts(content)) => Some(content.parts.as_slice()),
        _ => None,
    }
}

/// Declared role label, most specific source first.
fn role_label(record: &OriginRecord) -> Option<&str> {
    record
        .message
        .as_ref()
        .and_then(|m| m.role.as_deref())
        .or_else(|| match &record.content {
            Some(RecordContent::Parts(content)) => content.role.as_deref(),
            _ => None,
        })
}

fn resolve_role(record: &OriginRecord) -> Role {
    if let Some(role) = role_label(record).and_then(Role::from_label) {
        return role;
    }
    // Agent frameworks put the agent's name in `author`; only "user" is a user.
    match record.author.as_deref() {
        Some(author) => Role::from_label(author)
            .filter(|role| *role == Role::User)
            .unwrap_or(Role::Assistant),
        None => Role::Assistant,
    }
}

fn is_tool_response(record: &OriginRecord, parts: Option<&[Value]>) -> bool {
    if role_label(record).is_some_and(is_tool_role) {
        return true;
    }
    if record
        .message
        .as_ref()
        .is_some_and(|m| m.tool_call_id.is_some())
    {
        return true;
    }
    parts.is_some_and(|parts| parts.iter().any(|p| function_response(p).is_some()))
}

fn record_text(record: &OriginRecord, parts: Option<&[Value]>) -> String {
    if let Some(parts) = parts {
        let text = parts_text(parts);
        if !text.is_empty() {
            return text;
        }
    }
    if let Some(RecordContent::Text(text)) = &record.content {
        if !text.is_empty() {
            return text.clone();
        }
    }
    match record.message.as_ref().and_then(|m| m.content.as_ref()) {
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Parts(parts)) => parts_text(parts),
        Some(MessageContent::Other(_)) | None => String::new(),
    }
}

fn emit_text(out: &mut Emitter, id: &str, record: &OriginRecord, parts: Option<&[Value]>) {
    let text = record_text(record, parts);
    if text.is_empty() {
        return;
    }
    out.push(EventKind::MessageStart {
        message_id: id.to_string(),
        role: resolve_role(record),
    });
    out.push(EventKind::MessageContent {
        message_id: id.to_string(),
        delta: text,
    });
    out.push(EventKind::MessageEnd {
        message_id: id.to_string(),
    });
}

fn emit_tool_calls(out: &mut Emitter, id: &str, record: &OriginRecord, parts: Option<&[Value]>) {
    let mut index = 0usize;
    let mut next_id = |explicit: Option<&str>| {
        let call_id = explicit
            .map(str::to_string)
            .unwrap_or_else(|| format!("{id}:call:{index}"));
        index += 1;
        call_id
    };

    for call in parts.unwrap_or_default().iter().filter_map(function_call) {
        let call_id = next_id(str_field(call, "id"));
        let name = str_field(call, "name").unwrap_or("unknown").to_string();
        let args = call.get("args").or_else(|| call.get("arguments"));
        emit_call(out, id, call_id, name, args);
    }

    let tool_calls = record
        .message
        .as_ref()
        .and_then(|m| m.tool_calls.as_deref())
        .unwrap_or_default();
    for raw in tool_calls {
        let Ok(call) = serde_json::from_value::<OpenAiToolCall>(raw.clone()) else {
            tracing::debug!("skipping malformed tool_calls entry in record {id}");
            continue;
        };
        let call_id = next_id(call.id.as_deref());
        let function = call.function.unwrap_or_default();
        let name = function
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        emit_call(out, id, call_id, name, function.arguments.as_ref());
    }
}

fn emit_call(
    out: &mut Emitter,
    message_id: &str,
    tool_call_id: String,
    tool_name: String,
    args: Option<&Value>,
) {
    out.push(EventKind::ToolStart {
        tool_call_id: tool_call_id.clone(),
        tool_name,
        parent_message_id: Some(message_id.to_string()),
    });
    if let Some(delta) = args.and_then(args_delta) {
        out.push(EventKind::ToolArgs {
            tool_call_id: tool_call_id.clone(),
            delta,
        });
    }
    out.push(EventKind::ToolEnd { tool_call_id });
}

fn emit_tool_results(
    out: &mut Emitter,
    id: &str,
    record: &OriginRecord,
    parts: Option<&[Value]>,
    tool_response: bool,
) {
    let mut emitted = false;
    for (index, response) in parts
        .unwrap_or_default()
        .iter()
        .filter_map(function_response)
        .enumerate()
    {
        let tool_call_id = str_field(response, "id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{id}:result:{index}"));
        let payload = response
            .get("response")
            .or_else(|| response.get("result"))
            .unwrap_or(&Value::Null);
        out.push(EventKind::ToolResult {
            tool_call_id,
            tool_name: str_field(response, "name").map(str::to_string),
            content: response_text(payload),
        });
        emitted = true;
    }

    // Flat `{ role: "tool", tool_call_id, content }` message.
    if tool_response && !emitted {
        let message = record.message.as_ref();
        let tool_call_id = message
            .and_then(|m| m.tool_call_id.clone())
            .unwrap_or_else(|| id.to_string());
        out.push(EventKind::ToolResult {
            tool_call_id,
            tool_name: message.and_then(|m| m.name.clone()),
            content: record_text(record, parts),
        });
    }
}

fn emit_actions(out: &mut Emitter, actions: &RecordActions) {
    if let Some(delta) = non_empty_object(actions.artifact_delta.as_ref()) {
        out.push(EventKind::ArtifactDelta {
            delta: delta.clone(),
        });
    }
    if let Some(delta) = non_empty_object(actions.state_delta.as_ref()) {
        out.push(EventKind::StateDelta {
            delta: delta.clone(),
        });
    }
    if let Some(snapshot) = actions.state_snapshot.as_ref().filter(|v| !v.is_null()) {
        out.push(EventKind::StateSnapshot {
            snapshot: snapshot.clone(),
        });
    }
    if let Some(messages) = actions.messages_snapshot.as_ref().and_then(Value::as_array) {
        out.push(EventKind::MessagesSnapshot {
            messages: messages.clone(),
        });
    }
    if let Some(step_name) = actions.step_started.as_ref().and_then(step_name) {
        out.push(EventKind::StepStarted { step_name });
    }
    if let Some(step_name) = actions.step_finished.as_ref().and_then(step_name) {
        out.push(EventKind::StepFinished { step_name });
    }
}

fn emit_custom(out: &mut Emitter, custom: &Value) {
    let (name, value) = match custom.as_object() {
        Some(obj) => match str_field(obj, "name") {
            Some(name) => (
                name.to_string(),
                obj.get("value").cloned().unwrap_or(Value::Null),
            ),
            None => ("custom".to_string(), custom.clone()),
        },
        None => ("custom".to_string(), custom.clone()),
    };
    out.push(EventKind::Custom { name, value });
}
