//! Canonical protocol messages.
//!
//! The canonical history is the exact message sequence sent to the inference
//! server on every request. It is append-only except for the system message at
//! position 0, whose content is replaced at the start of each turn, and for
//! compaction, which replaces the whole sequence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Server-assigned call id; tool results refer back to it.
    pub id: String,

    /// Name of the tool to invoke.
    pub name: String,

    /// Arguments as an opaque JSON-encoded object.
    pub arguments: String,
}

/// A single message in the canonical history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        /// `None` when the turn produced only tool calls.
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// A plain-text assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// An assistant message carrying tool calls. Empty prose becomes `None`.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let content = content.into();
        Self::Assistant {
            content: (!content.is_empty()).then_some(content),
            tool_calls,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// The text content, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                Some(content.as_str())
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

/// Check the tool-result pairing rule the server enforces: every `tool`
/// message must answer a call id of the nearest preceding assistant message,
/// and no id may be answered twice.
pub fn tool_results_are_paired(history: &[Message]) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for message in history {
        match message {
            Message::Assistant { tool_calls, .. } => {
                open = tool_calls.iter().map(|tc| tc.id.as_str()).collect();
            }
            Message::Tool { tool_call_id, .. } => {
                let Some(pos) = open.iter().position(|id| *id == tool_call_id.as_str()) else {
                    return false;
                };
                open.remove(pos);
            }
            Message::User { .. } | Message::System { .. } => open.clear(),
        }
    }
    true
}
