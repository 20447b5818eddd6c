//! Shell tool: execute a command in the workspace.
//!
//! Runs through `sh -c` (`cmd /C` on Windows) with a wall-clock timeout and
//! a per-stream output ceiling. The child is killed when either limit trips.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use qogito_core::error::ToolError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum bytes captured from each of stdout and stderr.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

pub async fn run_command(command: &str, working_dir: &Path) -> Result<String, ToolError> {
    run_with_limits(command, working_dir, COMMAND_TIMEOUT, MAX_OUTPUT_BYTES).await
}

pub(crate) async fn run_with_limits(
    command: &str,
    working_dir: &Path,
    timeout: Duration,
    max_output: usize,
) -> Result<String, ToolError> {
    debug!(command = %command, cwd = %working_dir.display(), "Executing shell command");

    let mut child = shell(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let collect = async {
        let (out, err) = tokio::try_join!(
            read_bounded(stdout, max_output),
            read_bounded(stderr, max_output)
        )?;
        let status = child.wait().await?;
        Ok::<_, ToolError>((out, err, status))
    };

    let (stdout, stderr, status) = match tokio::time::timeout(timeout, collect).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(command = %command, "Command timed out");
            return Err(ToolError::Timeout {
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let mut parts = Vec::new();
    if !status.success() {
        let code = status.code().unwrap_or(-1);
        warn!(command = %command, exit_code = code, "Command failed");
        parts.push(format!("[exit code: {code}]"));
    }
    if !stdout.is_empty() {
        parts.push(stdout);
    }
    if !stderr.is_empty() {
        parts.push(format!("[stderr]\n{stderr}"));
    }
    if parts.is_empty() {
        return Ok("(no output)".into());
    }
    Ok(parts.join("\n"))
}

fn shell(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

async fn read_bounded<R>(stream: Option<R>, limit: usize) -> Result<String, ToolError>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    stream
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > limit {
        return Err(ToolError::OutputTooLarge { limit_bytes: limit });
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("echo hello", dir.path()).await.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn stderr_follows_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("echo out; echo err >&2", dir.path())
            .await
            .unwrap();
        assert_eq!(out, "out\n\n[stderr]\nerr\n");
    }

    #[tokio::test]
    async fn silent_command_reports_no_output() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_command("true", dir.path()).await.unwrap(), "(no output)");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("echo partial; exit 3", dir.path())
            .await
            .unwrap();
        assert_eq!(out, "[exit code: 3]\npartial\n");
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let out = run_command("ls", dir.path()).await.unwrap();
        assert!(out.contains("marker.txt"));
    }

    #[tokio::test]
    async fn timeout_kills_command() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_with_limits("sleep 5", dir.path(), Duration::from_millis(100), 1024)
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Timeout { timeout_secs: 0 });
    }

    #[tokio::test]
    async fn oversized_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_with_limits(
            "head -c 4096 /dev/zero",
            dir.path(),
            COMMAND_TIMEOUT,
            1024,
        )
        .await
        .unwrap_err();
        assert_eq!(err, ToolError::OutputTooLarge { limit_bytes: 1024 });
    }
}
