//! `qogito complete`: fill-in-the-middle completion at a cursor offset.

use std::path::Path;

use anyhow::{Context, bail};
use qogito_providers::InfillClient;
use tokio_util::sync::CancellationToken;

use super::{load_config, transport};

/// Characters of context sent before the cursor.
const PREFIX_CHARS: usize = 4000;

/// Characters of context sent after the cursor.
const SUFFIX_CHARS: usize = 1000;

pub async fn run(file: &Path, offset: usize) -> anyhow::Result<()> {
    let config = load_config()?;
    if config.completion_url.is_empty() {
        bail!(
            "No completion server configured. Run `qogito config set completion_url http://localhost:8081` \
             or set QOGITO_COMPLETION_URL."
        );
    }

    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let (prefix, suffix) = infill_window(&text, offset);

    let client = InfillClient::new(&transport(&config))?;
    let cancel = CancellationToken::new();
    let insertion = tokio::select! {
        result = client.infill(&config.completion_url, prefix, suffix, &cancel) => result?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            return Ok(());
        }
    };

    print!("{insertion}");
    Ok(())
}

/// Split `text` at `offset` and keep the context windows on either side.
///
/// Offsets past the end clamp to the end; offsets inside a multi-byte
/// character move back to its start.
fn infill_window(text: &str, offset: usize) -> (&str, &str) {
    let mut cursor = offset.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let (before, after) = text.split_at(cursor);

    let prefix_start = before
        .char_indices()
        .rev()
        .nth(PREFIX_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let suffix_end = after
        .char_indices()
        .nth(SUFFIX_CHARS)
        .map_or(after.len(), |(i, _)| i);

    (&before[prefix_start..], &after[..suffix_end])
}
