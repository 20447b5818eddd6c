//! Agent-level events for front ends.
//!
//! `AgentEvent` lets a front end render a turn incrementally while it is in
//! flight. The transcript remains the source of truth; events are advisory
//! and dropped silently when nobody listens.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the agent loop during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial text from the model, for a reply or a compaction summary.
    Chunk { content: String },

    /// The agent is about to run a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },

    /// A tool finished; `output` is exactly what the model will see.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// History is being summarized.
    CompactionStarted,

    CompactionFinished { success: bool },

    /// The turn failed; the last transcript entry carries the same message.
    Error { message: String },

    /// The turn is over, whatever its outcome.
    Done {
        conversation_id: String,
        last_total_tokens: u64,
        context_size: u64,
    },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::CompactionStarted => "compaction_started",
            Self::CompactionFinished { .. } => "compaction_finished",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }
}

/// Optional sender side of an event channel.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl EventSink {
    /// A sink that discards everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver just means nobody is rendering.
            let _ = tx.send(event);
        }
    }
}
