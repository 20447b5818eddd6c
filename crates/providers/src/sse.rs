//! Server-sent event decoding for streamed chat completions.
//!
//! Network reads are split at arbitrary byte positions, so bytes are carried
//! over until a full `\n`-terminated record is available. Only complete lines
//! are decoded as UTF-8, which keeps multi-byte characters intact.

use std::collections::BTreeMap;

use qogito_core::error::ProviderError;
use qogito_core::message::ToolCall;
use qogito_core::provider::{Outcome, Usage};
use serde::Deserialize;

/// Marks the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Byte buffer that yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network read and drain every complete line it finishes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.pending[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            lines.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end + 1;
            from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Payload of a `data:` record, or `None` for any other line.
pub fn data_payload(line: &str) -> Option<&str> {
    line.trim_end_matches('\r')
        .strip_prefix("data:")
        .map(str::trim)
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
pub struct StreamResponse {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call fragment. Fragments for one call arrive across records.
#[derive(Debug, Deserialize)]
pub struct StreamToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub struct StreamFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// What one data record contributed, for the caller to act on.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecordEffect {
    /// Authoritative token total, if the record carried usage.
    pub total_tokens: Option<u64>,

    /// Text fragment to forward verbatim.
    pub text: Option<String>,
}

/// Per-request merge state: tool call fragments by index and the most
/// recently determined outcome.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    calls: BTreeMap<u32, ToolCall>,
    outcome: Option<Outcome>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one data payload (not the sentinel).
    pub fn apply(&mut self, payload: &str) -> Result<RecordEffect, ProviderError> {
        let chunk: StreamResponse = serde_json::from_str(payload)
            .map_err(|e| ProviderError::Protocol(format!("invalid stream record: {e}")))?;

        let mut effect = RecordEffect {
            total_tokens: chunk.usage.map(|u| u.total_tokens),
            text: None,
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(effect);
        };

        effect.text = choice.delta.content.filter(|c| !c.is_empty());

        for fragment in choice.delta.tool_calls.unwrap_or_default() {
            self.merge(fragment);
        }

        match choice.finish_reason.as_deref() {
            Some("stop") => self.outcome = Some(Outcome::Done),
            Some("tool_calls") => {
                self.outcome = Some(Outcome::ToolCalls(self.calls.values().cloned().collect()))
            }
            _ => {}
        }

        Ok(effect)
    }

    fn merge(&mut self, fragment: StreamToolCallDelta) {
        let pending = self.calls.entry(fragment.index).or_insert_with(|| ToolCall {
            id: String::new(),
            name: String::new(),
            arguments: String::new(),
        });
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            pending.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                pending.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                pending.arguments.push_str(&arguments);
            }
        }
    }

    /// The outcome to report when the stream ends; `Done` if none was set.
    pub fn finish(self) -> Outcome {
        self.outcome.unwrap_or(Outcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_carries_partial_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.pending_len(), 10);
        let lines = buf.push(b":1}\n\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
        assert_eq!(buf.push(b"NE]\n"), vec!["data: [DONE]".to_string()]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn line_buffer_large_record_in_small_reads() {
        let payload = format!(
            r#"{{"choices":[{{"delta":{{"content":"{}"}}}}]}}"#,
            "x".repeat(200_000)
        );
        let record = format!("data: {payload}\n\ndata: [DONE]\n");
        let mut buf = LineBuffer::new();
        let mut lines = Vec::new();
        for piece in record.as_bytes().chunks(7) {
            lines.extend(buf.push(piece));
        }
        assert_eq!(
            lines,
            vec![
                format!("data: {payload}"),
                String::new(),
                "data: [DONE]".to_string()
            ]
        );
        assert_eq!(buf.pending_len(), 0);

        // The scan position survives a partial line followed by its end.
        assert!(buf.push(b"data: a").is_empty());
        assert!(buf.push(b"bc").is_empty());
        assert_eq!(buf.push(b"\nda"), vec!["data: abc".to_string()]);
        assert_eq!(buf.pending_len(), 2);
    }

    #[test]
    fn line_buffer_keeps_split_multibyte_chars() {
        let text = "data: héllo ✓\n".as_bytes();
        // Split inside the two-byte "é" and inside the three-byte check mark.
        let mut buf = LineBuffer::new();
        assert!(buf.push(&text[..8]).is_empty());
        assert!(buf.push(&text[8..15]).is_empty());
        assert_eq!(buf.push(&text[15..]), vec!["data: héllo ✓".to_string()]);
    }

    #[test]
    fn data_payload_extraction() {
        assert_eq!(data_payload("data: {\"x\":1}\r"), Some("{\"x\":1}"));
        assert_eq!(data_payload("data:[DONE]"), Some("[DONE]"));
        assert_eq!(data_payload(": keep-alive"), None);
        assert_eq!(data_payload("event: ping"), None);
        assert_eq!(data_payload(""), None);
    }

    #[test]
    fn content_is_forwarded() {
        let mut acc = StreamAccumulator::new();
        let effect = acc
            .apply(r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#)
            .unwrap();
        assert_eq!(effect.text.as_deref(), Some("Hel"));
        assert_eq!(effect.total_tokens, None);
    }

    #[test]
    fn usage_without_choices() {
        let mut acc = StreamAccumulator::new();
        let effect = acc
            .apply(r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#)
            .unwrap();
        assert_eq!(
            effect,
            RecordEffect {
                total_tokens: Some(15),
                text: None
            }
        );
        assert_eq!(acc.finish(), Outcome::Done);
    }

    #[test]
    fn usage_record_keeps_breakdown() {
        let chunk: StreamResponse = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();
        assert_eq!(
            chunk.usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            })
        );
    }

    #[test]
    fn fragments_merge_by_index() {
        let mut acc = StreamAccumulator::new();
        // Index 1 starts before index 0 finishes; fragments interleave.
        acc.apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"b","function":{"name":"read_","arguments":""}}]}}]}"#).unwrap();
        acc.apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"a","function":{"name":"run_","arguments":"{\"com"}}]}}]}"#).unwrap();
        acc.apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"","function":{"name":"file","arguments":"{}"}}]}}]}"#).unwrap();
        acc.apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"command","arguments":"mand\":\"ls\"}"}}]}}]}"#).unwrap();
        acc.apply(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#).unwrap();

        assert_eq!(
            acc.finish(),
            Outcome::ToolCalls(vec![
                ToolCall {
                    id: "a".into(),
                    name: "run_command".into(),
                    arguments: r#"{"command":"ls"}"#.into(),
                },
                ToolCall {
                    id: "b".into(),
                    name: "read_file".into(),
                    arguments: "{}".into(),
                },
            ])
        );
    }

    #[test]
    fn stop_sets_done() {
        let mut acc = StreamAccumulator::new();
        acc.apply(r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":"stop"}]}"#)
            .unwrap();
        assert_eq!(acc.finish(), Outcome::Done);
    }

    #[test]
    fn last_finish_reason_wins() {
        let mut acc = StreamAccumulator::new();
        acc.apply(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"x","function":{"name":"list_tools"}}]},"finish_reason":"tool_calls"}]}"#).unwrap();
        acc.apply(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#)
            .unwrap();
        assert_eq!(acc.finish(), Outcome::Done);
    }

    #[test]
    fn unparseable_record_is_protocol_error() {
        let mut acc = StreamAccumulator::new();
        assert!(matches!(
            acc.apply("{not json"),
            Err(ProviderError::Protocol(_))
        ));
    }
}
