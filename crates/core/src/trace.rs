use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conversation role of a turn or a `message-start` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Normalize cross-provider role labels into a conversation role.
    ///
    /// `tool`/`function` are deliberately not roles here: records carrying them
    /// are routed to tool results by the normalizer.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "assistant" | "agent" | "model" | "ai" | "bot" => Some(Self::Assistant),
            "system" | "developer" => Some(Self::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation fields shared by every canonical event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Seconds; roughly monotonic within one source, not across sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Id of the origin record this event was normalized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// One unit of streamed activity after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    #[serde(flatten)]
    pub correlation: Correlation,
    pub kind: EventKind,
}

impl CanonicalEvent {
    pub fn new(correlation: Correlation, kind: EventKind) -> Self {
        Self { correlation, kind }
    }

    pub fn run_id(&self) -> Option<&str> {
        self.correlation.run_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.correlation.timestamp
    }
}

/// Canonical event kind - the tagged union every consumer matches on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum EventKind {
    // Text messages
    MessageStart {
        message_id: String,
        role: Role,
    },
    MessageContent {
        message_id: String,
        delta: String,
    },
    MessageEnd {
        message_id: String,
    },

    // Tool calls
    ToolStart {
        tool_call_id: String,
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },
    ToolArgs {
        tool_call_id: String,
        delta: String,
    },
    ToolEnd {
        tool_call_id: String,
    },
    ToolResult {
        tool_call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        content: String,
    },

    // State and artifacts
    StateDelta {
        delta: Map<String, Value>,
    },
    StateSnapshot {
        snapshot: Value,
    },
    ArtifactDelta {
        delta: Map<String, Value>,
    },
    MessagesSnapshot {
        messages: Vec<Value>,
    },

    // Steps
    StepStarted {
        step_name: String,
    },
    StepFinished {
        step_name: String,
    },

    // Extension points
    Raw {
        event: Value,
    },
    Custom {
        name: String,
        value: Value,
    },
}

impl EventKind {
    /// Wire name of the kind, e.g. `tool-args`
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message-start",
            Self::MessageContent { .. } => "message-content",
            Self::MessageEnd { .. } => "message-end",
            Self::ToolStart { .. } => "tool-start",
            Self::ToolArgs { .. } => "tool-args",
            Self::ToolEnd { .. } => "tool-end",
            Self::ToolResult { .. } => "tool-result",
            Self::StateDelta { .. } => "state-delta",
            Self::StateSnapshot { .. } => "state-snapshot",
            Self::ArtifactDelta { .. } => "artifact-delta",
            Self::MessagesSnapshot { .. } => "messages-snapshot",
            Self::StepStarted { .. } => "step-started",
            Self::StepFinished { .. } => "step-finished",
            Self::Raw { .. } => "raw",
            Self::Custom { .. } => "custom",
        }
    }

    /// `messageId` or `toolCallId` of the entity this event belongs to
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::MessageStart { message_id, .. }
            | Self::MessageContent { message_id, .. }
            | Self::MessageEnd { message_id } => Some(message_id),
            Self::ToolStart { tool_call_id, .. }
            | Self::ToolArgs { tool_call_id, .. }
            | Self::ToolEnd { tool_call_id }
            | Self::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}

/// One role-attributed unit of conversational content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl ConversationTurn {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// A user turn created locally, before the authoritative source echoes it.
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self::new(
            format!("local-{}", uuid::Uuid::new_v4()),
            Role::User,
            content,
        )
    }

    /// True when the content is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Display-ready side-panel entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineItem {
    Tool(ToolItem),
    Artifact(ArtifactItem),
    State(StateItem),
    Event(EventItem),
}

impl TimelineItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Tool(item) => &item.id,
            Self::Artifact(item) => &item.id,
            Self::State(item) => &item.id,
            Self::Event(item) => &item.id,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            Self::Tool(item) => item.timestamp,
            Self::Artifact(item) => item.timestamp,
            Self::State(item) => item.timestamp,
            Self::Event(item) => item.timestamp,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolItem> {
        match self {
            Self::Tool(item) => Some(item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    /// A result arrived
    Completed,
    /// The call ended without a result (yet)
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub name: String,
    /// Accumulated, possibly partial, serialized arguments
    pub args: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub status: ToolStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub delta: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub change: StateChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "payload", rename_all = "snake_case")]
pub enum StateChange {
    Delta(Map<String, Value>),
    Snapshot(Value),
}

/// Generic activity entry (steps, raw and custom payloads, message snapshots)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub label: String,
    pub payload: Value,
}
