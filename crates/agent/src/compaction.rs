//! Context compaction: replace the conversation with a model-written summary.
//!
//! Compaction is all-or-nothing: both histories are replaced only after a
//! non-empty summary has been received. Any failure leaves them untouched.

use qogito_core::error::ProviderError;
use qogito_core::message::Message;
use qogito_core::provider::CompletionClient;
use qogito_core::transcript::{EntryRole, Transcript, TranscriptEntry};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::stream_event::{AgentEvent, EventSink};

pub const COMPACTION_INSTRUCTION: &str = "The conversation context is almost full. Please write a complete, dense summary of everything discussed — goals, decisions, code written, files changed, and any other context needed to continue seamlessly. Be comprehensive.";

/// Prefix of the system message that replaces a compacted history.
pub const SUMMARY_PREFIX: &str = "Summary of the conversation so far:\n\n";

/// Content shown in place of a summary that could not be produced.
pub const COMPACTION_FAILED: &str = "[Compaction failed]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Both histories now hold only the summary.
    Compacted,

    /// The model returned no text; nothing was replaced.
    Empty,

    /// The request failed or was stopped; nothing was replaced.
    Failed(ProviderError),
}

/// Summarize `history` and, on success, collapse both histories onto it.
pub async fn compact(
    client: &dyn CompletionClient,
    history: &mut Vec<Message>,
    transcript: &mut Transcript,
    events: &EventSink,
    cancel: &CancellationToken,
) -> CompactionOutcome {
    let before = client.token_budget();
    info!(
        messages = history.len(),
        tokens = before.last_total_tokens,
        n_ctx = before.context_size,
        "Compacting conversation"
    );

    let mut request = history.clone();
    request.push(Message::user(COMPACTION_INSTRUCTION));

    transcript.push(EntryRole::Compaction, "");
    events.emit(AgentEvent::CompactionStarted);

    let mut summary = String::new();
    let result = {
        let mut on_chunk = |chunk: &str| {
            summary.push_str(chunk);
            transcript.append_to_last(chunk);
            events.emit(AgentEvent::Chunk {
                content: chunk.to_string(),
            });
        };
        client.complete(&request, &[], &mut on_chunk, cancel).await
    };

    if let Err(e) = result {
        warn!(error = %e, "Compaction failed, keeping full history");
        if let Some(entry) = transcript.last_mut() {
            entry.content = COMPACTION_FAILED.to_string();
            entry.error = Some(e.to_string());
        }
        events.emit(AgentEvent::CompactionFinished { success: false });
        return CompactionOutcome::Failed(e);
    }

    if summary.is_empty() {
        warn!("Compaction returned an empty summary");
        events.emit(AgentEvent::CompactionFinished { success: false });
        return CompactionOutcome::Empty;
    }

    transcript.replace_with(TranscriptEntry::new(EntryRole::Compaction, summary.as_str()));
    *history = vec![Message::system(format!("{SUMMARY_PREFIX}{summary}"))];
    client.reset_token_count();

    info!(summary_chars = summary.len(), "Conversation compacted");
    events.emit(AgentEvent::CompactionFinished { success: true });
    CompactionOutcome::Compacted
}
