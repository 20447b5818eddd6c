//! The conversation loop: the heart of Qogito.
//!
//! One [`AgentLoop`] owns one conversation and runs it turn by turn:
//!
//! 1. **Receive** a user message
//! 2. **Stream** a completion for the canonical history
//! 3. **If tool calls**: run them in index order, append results, go to 2
//! 4. **If text**: the turn is over
//!
//! Before each request, and once after the turn, the token budget is checked.
//! At 95% of the server's context window the history is compacted into a
//! single summary.

pub mod compaction;
pub mod loop_runner;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use compaction::CompactionOutcome;
pub use loop_runner::{AgentLoop, StopHandle, TurnOutcome};
pub use stream_event::{AgentEvent, EventSink};
