//! The sandboxed executor: validates paths, then dispatches to a tool module.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use qogito_core::error::ToolError;
use qogito_core::tool::{ToolExecutor, ToolInvocation};
use qogito_security::resolve_in_workspace;
use tracing::{debug, warn};

use crate::{file_read, file_write, search, shell};

/// Stateless [`ToolExecutor`] confined to the workspace root it is handed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxExecutor;

impl SandboxExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn resolve(path: &str, root: &Path) -> Result<PathBuf, ToolError> {
    Ok(resolve_in_workspace(path, root)?)
}

#[async_trait]
impl ToolExecutor for SandboxExecutor {
    async fn execute(
        &self,
        invocation: &ToolInvocation,
        workspace_root: &Path,
    ) -> Result<String, ToolError> {
        let started = Instant::now();
        let root = workspace_root;

        let result = match invocation {
            ToolInvocation::ListDirectory(a) => {
                file_read::list_directory(&resolve(&a.path, root)?).await
            }
            ToolInvocation::ReadFile(a) => file_read::read_file(&resolve(&a.path, root)?).await,
            ToolInvocation::ReadFileLines(a) => {
                file_read::read_file_lines(&resolve(&a.path, root)?, a.start_line, a.num_lines)
                    .await
            }
            ToolInvocation::SearchFiles(a) => {
                let dir = resolve(&a.path, root)?;
                let pattern = a.pattern.clone();
                let glob = a.glob.clone();
                tokio::task::spawn_blocking(move || {
                    search::search_files(&dir, &pattern, glob.as_deref())
                })
                .await
                .map_err(|e| ToolError::Io(format!("search task failed: {e}")))?
            }
            ToolInvocation::GetFileInfo(a) => {
                file_read::get_file_info(&resolve(&a.path, root)?).await
            }
            ToolInvocation::CreateDirectory(a) => {
                file_write::create_directory(&resolve(&a.path, root)?).await
            }
            ToolInvocation::MoveFile(a) => {
                let source = resolve(&a.source, root)?;
                let destination = resolve(&a.destination, root)?;
                file_write::move_file(&source, &destination).await
            }
            ToolInvocation::DeleteFile(a) => {
                file_write::delete_file(&resolve(&a.path, root)?).await
            }
            ToolInvocation::StrReplace(a) => {
                file_write::str_replace(&resolve(&a.path, root)?, &a.old_str, &a.new_str).await
            }
            ToolInvocation::WriteFile(a) => {
                file_write::write_file(&resolve(&a.path, root)?, &a.content).await
            }
            ToolInvocation::RunCommand(a) => {
                let cwd = resolve(a.working_dir.as_deref().unwrap_or("."), root)?;
                shell::run_command(&a.command, &cwd).await
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => debug!(
                tool = invocation.name(),
                elapsed_ms,
                output_len = output.len(),
                "Tool executed"
            ),
            Err(e) => warn!(tool = invocation.name(), elapsed_ms, error = %e, "Tool failed"),
        }
        result
    }
}
