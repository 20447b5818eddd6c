//! Error types for the Qogito domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the binary wraps them in
//! `anyhow` at the edge.

use thiserror::Error;

/// Failures of the completion client and connection management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Not connected")]
    NotConnected,

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The caller cancelled the request. Never surfaced to the user.
    #[error("Request aborted")]
    Aborted,

    #[error("No models returned")]
    NoModels,

    #[error("Transport configuration error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// True for user-initiated cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Failures of a single tool invocation. These are folded into the tool's
/// result text by the agent loop and never abort a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Access denied: path '{path}' is outside the workspace")]
    AccessDenied { path: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("start_line {start_line} is beyond end of file ({total_lines} lines)")]
    OutOfRange { start_line: usize, total_lines: usize },

    #[error("{0}")]
    NotFound(String),

    #[error("old_str matches {occurrences} times — it must be unique")]
    NotUnique { occurrences: usize },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool \"{tool_name}\" is not permitted in {mode} mode")]
    PermissionDenied { tool_name: String, mode: String },

    #[error("No workspace folder open")]
    NoWorkspace,

    #[error("Command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Command output exceeded {limit_bytes} bytes")]
    OutputTooLarge { limit_bytes: usize },

    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
