//! Display transcript: the human-facing view of a conversation.
//!
//! Kept separately from the canonical history: it carries synthetic entries
//! (tool invocations, compaction summaries) that are never sent to the server,
//! and error annotations that are never part of the protocol.

use serde::{Deserialize, Serialize};

/// Role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    User,
    Assistant,
    ToolCall,
    ToolResult,
    Compaction,
}

impl EntryRole {
    /// Short label used by front ends.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "qogito",
            Self::ToolCall => "tool call",
            Self::ToolResult => "tool result",
            Self::Compaction => "context summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: EntryRole,
    pub content: String,

    /// Set when the operation that produced this entry failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptEntry {
    pub fn new(role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: EntryRole, content: impl Into<String>) {
        self.entries.push(TranscriptEntry::new(role, content));
    }

    /// Append streamed text to the most recent entry.
    pub fn append_to_last(&mut self, text: &str) {
        if let Some(last) = self.entries.last_mut() {
            last.content.push_str(text);
        }
    }

    /// Annotate the most recent entry with an error.
    pub fn mark_last_failed(&mut self, message: impl Into<String>) {
        if let Some(last) = self.entries.last_mut() {
            last.error = Some(message.into());
        }
    }

    pub fn pop(&mut self) -> Option<TranscriptEntry> {
        self.entries.pop()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut TranscriptEntry> {
        self.entries.last_mut()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace every entry with a single one.
    pub fn replace_with(&mut self, entry: TranscriptEntry) {
        self.entries = vec![entry];
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
