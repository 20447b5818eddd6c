//! # Qogito Core
//!
//! Domain types, traits, and error definitions for the Qogito agent runtime.
//! This crate has no I/O; it defines the domain model that all other crates
//! implement against.
//!
//! Every collaborator of the agent loop is a trait here: the completion
//! client, the tool executor and the command approver. Implementations live in
//! their own crates, which keeps the loop testable with scripted stand-ins.

pub mod approval;
pub mod budget;
pub mod error;
pub mod message;
pub mod mode;
pub mod provider;
pub mod tool;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use approval::{CommandApprover, DenyAll};
pub use budget::{TokenBudget, estimate_tokens};
pub use error::{ProviderError, ToolError};
pub use message::{ConversationId, Message, ToolCall};
pub use mode::Mode;
pub use provider::{ChunkSink, CompletionClient, Outcome, Usage};
pub use tool::{ToolDefinition, ToolExecutor, ToolInvocation};
pub use transcript::{EntryRole, Transcript, TranscriptEntry};
