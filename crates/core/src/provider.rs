//! Completion client trait: the abstraction over the inference server.
//!
//! A client sends the canonical history to the model and reduces the streamed
//! reply into text callbacks plus one terminal [`Outcome`]. It also owns the
//! token budget, since usage reports only arrive inside the stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::budget::TokenBudget;
use crate::error::ProviderError;
use crate::message::{Message, ToolCall};
use crate::tool::ToolDefinition;

/// How a streamed completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Plain completion; all text was delivered through the chunk callback.
    Done,

    /// The model wants these tools called, in ascending fragment index order.
    ToolCalls(Vec<ToolCall>),
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Callback receiving streamed text fragments verbatim.
pub type ChunkSink<'a> = dyn FnMut(&str) + Send + 'a;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Stream one completion for `messages`, offering `tools` when non-empty.
    ///
    /// Returns [`ProviderError::Aborted`] when `cancel` fires mid-request.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ProviderError>;

    /// Current best-known token budget.
    fn token_budget(&self) -> TokenBudget;

    /// Forget the token count, e.g. after history was cleared or compacted.
    fn reset_token_count(&self);
}
