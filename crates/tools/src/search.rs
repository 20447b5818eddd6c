//! Recursive regex search over a directory tree.
//!
//! Hidden entries and `node_modules` are pruned from the walk. An optional
//! filename glob (`*` and `?` only) restricts which files are scanned, and
//! files containing a NUL byte are treated as binary and skipped.

use std::path::Path;

use qogito_core::error::ToolError;
use regex::Regex;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

pub const MAX_SEARCH_RESULTS: usize = 50;

pub fn search_files(root: &Path, pattern: &str, glob: Option<&str>) -> Result<String, ToolError> {
    let regex = Regex::new(pattern)
        .map_err(|e| ToolError::InvalidArgument(format!("invalid pattern: {e}")))?;
    let glob = glob
        .filter(|g| !g.is_empty())
        .map(glob_to_regex)
        .transpose()?;

    let mut matches = Vec::new();
    let mut truncated = false;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

    'files: for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(glob) = &glob {
            if !glob.is_match(&entry.file_name().to_string_lossy()) {
                continue;
            }
        }

        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        if bytes.contains(&0) {
            continue;
        }
        let text = String::from_utf8_lossy(&bytes);
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        for (i, line) in text.lines().enumerate() {
            if regex.is_match(line) {
                if matches.len() == MAX_SEARCH_RESULTS {
                    truncated = true;
                    break 'files;
                }
                matches.push(format!("{rel}:{}:{}", i + 1, line.trim()));
            }
        }
    }

    if matches.is_empty() {
        return Ok("No matches found.".into());
    }
    let mut out = matches.join("\n");
    if truncated {
        out.push_str(&format!("\n(truncated at {MAX_SEARCH_RESULTS} matches)"));
    }
    Ok(out)
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}

/// Translate a `*`/`?` filename glob into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, ToolError> {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| ToolError::InvalidArgument(format!("invalid glob: {e}")))
}
