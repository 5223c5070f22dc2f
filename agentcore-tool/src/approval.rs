//! External collaborators consulted before a destructive tool call runs.

use async_trait::async_trait;

/// What the approver decided about a proposed destructive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Proceed with the call as proposed.
    Approve,
    /// Refuse the call outright.
    Reject,
    /// Proceed, but with the arguments replaced.
    Edited(serde_json::Value),
}

/// Gatekeeper for tool calls flagged `dangerous` in their metadata.
///
/// Receives the operation kind (the tool name), its target (a short
/// human-readable description of what would be affected), and a preview
/// (e.g. a unified diff for a file edit).
#[async_trait]
pub trait Approver: Send + Sync {
    /// Ask whether a dangerous operation may proceed.
    async fn request_approval(
        &self,
        operation: &str,
        target: &str,
        preview: &str,
    ) -> ApprovalDecision;
}

/// Approver that always approves. The default for non-interactive runs.
pub struct NoopApprover;

#[async_trait]
impl Approver for NoopApprover {
    async fn request_approval(
        &self,
        _operation: &str,
        _target: &str,
        _preview: &str,
    ) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Captures pre-images of files about to be mutated, so they can be
/// restored if the agent (or operator) decides the change was wrong.
///
/// Called only for mutating file operations, after approval and before
/// the tool actually writes.
#[async_trait]
pub trait BackupManager: Send + Sync {
    /// Capture the current contents at `path` under `reason`, returning
    /// an id the pre-image can later be restored by.
    async fn create_backup(&self, session_id: &str, path: &str, reason: &str) -> Result<String, String>;

    /// Restore a previously captured backup by id.
    async fn restore(&self, backup_id: &str) -> Result<(), String>;

    /// List backup ids captured for a session.
    async fn list(&self, session_id: &str) -> Vec<String>;
}

/// Backup manager that performs no capture and always "succeeds".
///
/// Useful for tools that don't mutate the filesystem, or for tests that
/// don't exercise the backup path.
pub struct NoopBackupManager;

#[async_trait]
impl BackupManager for NoopBackupManager {
    async fn create_backup(
        &self,
        _session_id: &str,
        _path: &str,
        _reason: &str,
    ) -> Result<String, String> {
        Ok("noop-backup".to_string())
    }

    async fn restore(&self, _backup_id: &str) -> Result<(), String> {
        Ok(())
    }

    async fn list(&self, _session_id: &str) -> Vec<String> {
        Vec::new()
    }
}
