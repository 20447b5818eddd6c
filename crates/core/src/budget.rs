//! Token budget tracking.
//!
//! Usage is only reported authoritatively at some points of a stream, so in
//! between the count is estimated with a character-based heuristic:
//! 1 token ≈ 4 characters, rounded up.

use serde::{Deserialize, Serialize};

/// Fraction of the context window at which history is compacted.
pub const COMPACTION_THRESHOLD: f64 = 0.95;

/// Snapshot of the token budget of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Best known token count of the conversation, exact or estimated.
    pub last_total_tokens: u64,

    /// Context window size of the model; 0 when unknown.
    pub context_size: u64,
}

impl TokenBudget {
    pub fn new(last_total_tokens: u64, context_size: u64) -> Self {
        Self {
            last_total_tokens,
            context_size,
        }
    }

    /// Whether the conversation is close enough to the window to compact.
    /// Always false while the context size is unknown.
    pub fn is_near_capacity(&self) -> bool {
        self.context_size > 0
            && self.last_total_tokens as f64 >= self.context_size as f64 * COMPACTION_THRESHOLD
    }
}

/// Estimate the token count of a text fragment.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
