//! Shared value helpers used by the normalizer.

use chrono::DateTime;
use serde_json::{Map, Value};

// ── Role helpers ────────────────────────────────────────────────────────────

/// True for role labels that mark a tool response rather than a turn.
pub fn is_tool_role(role: &str) -> bool {
    matches!(
        role.trim().to_ascii_lowercase().as_str(),
        "tool" | "function" | "tool_result" | "ipython"
    )
}

// ── Part helpers ────────────────────────────────────────────────────────────

/// Text of one content part: `{ "text": ... }`, `{ "type": "text", "text": ... }`
/// or a bare string. Reasoning parts (`"thought": true`) are not reply text.
pub fn part_text(part: &Value) -> Option<&str> {
    if let Some(text) = part.as_str() {
        return Some(text);
    }
    let obj = part.as_object()?;
    if obj.get("thought").and_then(Value::as_bool) == Some(true) {
        return None;
    }
    if let Some(kind) = obj.get("type").and_then(Value::as_str) {
        if kind != "text" && kind != "output_text" && kind != "input_text" {
            return None;
        }
    }
    obj.get("text").and_then(Value::as_str)
}

/// Concatenate the text of every text-bearing part, in order.
pub fn parts_text(parts: &[Value]) -> String {
    parts.iter().filter_map(part_text).collect()
}

/// `functionCall` object of a part, either spelling.
pub fn function_call(part: &Value) -> Option<&Map<String, Value>> {
    part.get("functionCall")
        .or_else(|| part.get("function_call"))
        .and_then(Value::as_object)
}

/// `functionResponse` object of a part, either spelling.
pub fn function_response(part: &Value) -> Option<&Map<String, Value>> {
    part.get("functionResponse")
        .or_else(|| part.get("function_response"))
        .and_then(Value::as_object)
}

pub fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ── Payload helpers ─────────────────────────────────────────────────────────

/// Tool arguments as a string delta: strings pass through untouched,
/// structured values are serialized. `null` means "no arguments".
pub fn args_delta(args: &Value) -> Option<String> {
    match args {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

/// Tool response rendered as result text. String responses pass through;
/// `{ "result": "..." }` / `{ "content": "..." }` / `{ "output": "..." }`
/// unwrap to the inner string; anything else is serialized.
pub fn response_text(response: &Value) -> String {
    match response {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(obj) if obj.len() == 1 => {
            for key in ["result", "content", "output"] {
                if let Some(s) = obj.get(key).and_then(Value::as_str) {
                    return s.to_string();
                }
            }
            response.to_string()
        }
        other => other.to_string(),
    }
}

/// Object payload with at least one key; empty objects and non-objects are noise.
pub fn non_empty_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|map| !map.is_empty())
}

/// Step name from `"plan"` or `{ "stepName": "plan" }` / `{ "name": "plan" }`.
pub fn step_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => str_field(obj, "stepName")
            .or_else(|| str_field(obj, "step_name"))
            .or_else(|| str_field(obj, "name"))
            .map(str::to_string),
        _ => None,
    }
}

/// Timestamp in seconds from a number, numeric string, or RFC 3339 string.
pub fn timestamp_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return Some(secs).filter(|v| v.is_finite());
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_part_text_shapes() {
        assert_eq!(part_text(&json!("bare")), Some("bare"));
        assert_eq!(part_text(&json!({"text": "a"})), Some("a"));
        assert_eq!(part_text(&json!({"type": "text", "text": "b"})), Some("b"));
        assert_eq!(part_text(&json!({"type": "image", "text": "x"})), None);
        assert_eq!(part_text(&json!({"text": "hmm", "thought": true})), None);
    }

    #[test]
    fn test_parts_text_keeps_whitespace() {
        let parts = vec![json!({"text": "The answer"}), json!({"text": " is 42"})];
        assert_eq!(parts_text(&parts), "The answer is 42");
    }

    #[test]
    fn test_args_delta() {
        assert_eq!(args_delta(&json!("{\"q\":")).as_deref(), Some("{\"q\":"));
        assert_eq!(args_delta(&json!({"q": "x"})).as_deref(), Some("{\"q\":\"x\"}"));
        assert_eq!(args_delta(&Value::Null), None);
    }

    #[test]
    fn test_response_text() {
        assert_eq!(response_text(&json!("5 hits")), "5 hits");
        assert_eq!(response_text(&json!({"result": "ok"})), "ok");
        assert_eq!(response_text(&json!({"a": 1, "b": 2})), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn test_non_empty_object() {
        assert!(non_empty_object(Some(&json!({}))).is_none());
        assert!(non_empty_object(Some(&json!([1]))).is_none());
        assert!(non_empty_object(None).is_none());
        assert!(non_empty_object(Some(&json!({"k": 1}))).is_some());
    }

    #[test]
    fn test_step_name() {
        assert_eq!(step_name(&json!("plan")).as_deref(), Some("plan"));
        assert_eq!(step_name(&json!({"stepName": "act"})).as_deref(), Some("act"));
        assert_eq!(step_name(&json!(3)), None);
    }

    #[test]
    fn test_timestamp_seconds() {
        assert_eq!(timestamp_seconds(&json!(1700000000.5)), Some(1700000000.5));
        assert_eq!(timestamp_seconds(&json!("12.25")), Some(12.25));
        assert_eq!(
            timestamp_seconds(&json!("2024-01-01T00:00:01Z")),
            Some(1704067201.0)
        );
        assert_eq!(timestamp_seconds(&json!("yesterday")), None);
    }

    #[test]
    fn test_tool_role() {
        assert!(is_tool_role("Tool"));
        assert!(is_tool_role("function"));
        assert!(!is_tool_role("assistant"));
    }
}
