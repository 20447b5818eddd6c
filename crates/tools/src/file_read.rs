//! Read-only filesystem tools: directory listing, file reads, metadata.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use qogito_core::error::ToolError;

/// Character ceiling for a single `read_file` result.
pub const MAX_READ_CHARS: usize = 8000;

/// One entry per line, directories suffixed with `/`, sorted by name.
pub async fn list_directory(path: &Path) -> Result<String, ToolError> {
    let mut reader = tokio::fs::read_dir(path).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await?.is_dir();
        entries.push(if is_dir { format!("{name}/") } else { name });
    }
    entries.sort();
    Ok(entries.join("\n"))
}

pub async fn read_file(path: &Path) -> Result<String, ToolError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(truncate_content(content))
}

fn truncate_content(content: String) -> String {
    let total = content.chars().count();
    if total <= MAX_READ_CHARS {
        return content;
    }
    let head: String = content.chars().take(MAX_READ_CHARS).collect();
    format!(
        "{head}\n[truncated: showing first {MAX_READ_CHARS} of {total} characters — use read_file_lines for specific ranges]"
    )
}

/// Lines `start_line ..= start_line + num_lines - 1` (1-based), joined by `\n`.
pub async fn read_file_lines(
    path: &Path,
    start_line: i64,
    num_lines: i64,
) -> Result<String, ToolError> {
    if start_line < 1 || num_lines < 1 {
        return Err(ToolError::InvalidArgument(
            "start_line and num_lines must be positive integers".into(),
        ));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let lines: Vec<&str> = content.lines().collect();
    let start = usize::try_from(start_line - 1).unwrap_or(usize::MAX);
    if start >= lines.len() {
        return Err(ToolError::OutOfRange {
            start_line: start.saturating_add(1),
            total_lines: lines.len(),
        });
    }
    let count = usize::try_from(num_lines).unwrap_or(usize::MAX);
    let end = start.saturating_add(count).min(lines.len());
    Ok(lines[start..end].join("\n"))
}

pub async fn get_file_info(path: &Path) -> Result<String, ToolError> {
    let meta = tokio::fs::metadata(path).await?;
    let kind = if meta.is_dir() { "directory" } else { "file" };
    let modified: DateTime<Utc> = meta.modified()?.into();
    Ok(format!(
        "type: {kind}\nsize: {} bytes\nmodified: {}",
        meta.len(),
        modified.to_rfc3339_opts(SecondsFormat::Millis, true)
    ))
}
