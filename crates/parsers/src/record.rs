//! Serde model of the origin event record envelope.
//!
//! The envelope is loosely typed: content may be a parts array, a flat
//! string, or an OpenAI-style message. Every shape-bearing field has an
//! `Other(Value)` fallback, and nested objects that cannot be read are
//! treated as absent, so one odd field never rejects the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, alias = "sessionId", deserialize_with = "lenient_string")]
    pub thread_id: Option<String>,
    #[serde(default, alias = "invocationId", deserialize_with = "lenient_string")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<RecordContent>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<RecordMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub actions: Option<RecordActions>,
    #[serde(default)]
    pub raw: Option<Value>,
    #[serde(default)]
    pub custom: Option<Value>,
}

/// `content` is usually `{ role?, parts: [...] }`, sometimes a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordContent {
    Parts(PartsContent),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartsContent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    pub parts: Vec<Value>,
}

/// Flat OpenAI-style message object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default, deserialize_with = "lenient")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(default, alias = "toolCallId", deserialize_with = "lenient_string")]
    pub tool_call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
    Other(Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActions {
    #[serde(default)]
    pub state_delta: Option<Value>,
    #[serde(default)]
    pub artifact_delta: Option<Value>,
    #[serde(default)]
    pub state_snapshot: Option<Value>,
    #[serde(default)]
    pub messages_snapshot: Option<Value>,
    #[serde(default)]
    pub step_started: Option<Value>,
    #[serde(default)]
    pub step_finished: Option<Value>,
}

/// `tool_calls[]` entry: `{ id, type: "function", function: { name, arguments } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiToolCall {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAiFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiFunction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Accept ids given as strings or numbers; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Read a nested object; a value of the wrong shape reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match serde_json::from_value(v) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!("ignoring unreadable record field: {e}");
            None
        }
    }))
}
