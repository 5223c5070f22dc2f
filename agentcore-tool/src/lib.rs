#![deny(missing_docs)]
//! Tool registry and executor: a named catalog of tools plus a dispatcher
//! that runs calls concurrently, validates arguments, applies approval
//! and backup policy to destructive operations, and normalizes outcomes
//! into `ErrorKind`-tagged `ToolResult`s the model can react to.

pub mod approval;
pub mod executor;
pub mod registry;
pub mod schema;

pub use approval::{ApprovalDecision, Approver, BackupManager, NoopApprover, NoopBackupManager};
pub use executor::{Executor, ExecutorConfig};
pub use registry::{ToolDyn, ToolError, ToolRegistry};
