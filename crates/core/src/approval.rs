//! Interactive approval of risky tool calls.

use async_trait::async_trait;

/// Asks the user whether a shell command may run.
///
/// The literal command is shown unmodified; the implementation returns `true`
/// only on explicit approval.
#[async_trait]
pub trait CommandApprover: Send + Sync {
    async fn approve(&self, command: &str) -> bool;
}

/// Denies every command. Used when no interactive user is present.
pub struct DenyAll;

#[async_trait]
impl CommandApprover for DenyAll {
    async fn approve(&self, command: &str) -> bool {
        tracing::debug!(command = %command, "Denying command: no approver attached");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deny_all_denies() {
        assert!(!DenyAll.approve("rm -rf target").await);
    }
}
