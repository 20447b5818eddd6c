//! Path validation: filesystem sandboxing to the workspace directory.
//!
//! A requested path is joined onto the workspace root (absolute requests are
//! taken as-is), `.` and `..` segments are folded lexically, and the result
//! must still lie under the root. Symlinks are not followed.

use std::path::{Component, Path, PathBuf};

use qogito_core::error::ToolError;
use tracing::warn;

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Invalid workspace root '{root}': {reason}")]
    InvalidRoot { root: String, reason: String },
}

impl From<PathValidationError> for ToolError {
    fn from(e: PathValidationError) -> Self {
        match e {
            PathValidationError::OutsideWorkspace { path } => ToolError::AccessDenied { path },
            PathValidationError::InvalidRoot { .. } => ToolError::Io(e.to_string()),
        }
    }
}

/// Resolve `requested` against `workspace_root` and ensure it stays inside.
///
/// Returns the normalized absolute path on success. Performs no filesystem
/// access beyond making a relative root absolute.
pub fn resolve_in_workspace(
    requested: &str,
    workspace_root: &Path,
) -> Result<PathBuf, PathValidationError> {
    let root = std::path::absolute(workspace_root).map_err(|e| {
        PathValidationError::InvalidRoot {
            root: workspace_root.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    let root = normalize(&root);

    let candidate = Path::new(requested);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = normalize(&joined);

    if !resolved.starts_with(&root) {
        warn!(path = %requested, root = %root.display(), "Blocked path outside workspace");
        return Err(PathValidationError::OutsideWorkspace {
            path: requested.to_string(),
        });
    }

    Ok(resolved)
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
