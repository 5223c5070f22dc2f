//! Shared error vocabulary: the closed `ErrorKind` tag set plus the
//! state-store error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of error categories that cross component boundaries.
///
/// This tag travels *inside* richer, component-specific `thiserror` types
/// (see each crate's own error enum) rather than replacing them: the
/// thiserror enum explains where and why a call failed, this tag explains
/// what category it falls into for cross-layer decision logic (retry?
/// surface to the model? fatal to the task?).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Likely to succeed if retried (network blip, 429, 5xx).
    Transient,
    /// Retrying will not help.
    Permanent,
    /// Tool arguments failed schema validation.
    InvalidArguments,
    /// No tool registered under the requested name.
    UnknownTool,
    /// The approver rejected a dangerous operation.
    UserRejected,
    /// Pre-mutation backup could not be captured.
    BackupFailed,
    /// The operation was cancelled before completion.
    Cancelled,
    /// The operation was denied by policy, independent of user approval.
    Denied,
    /// The provider's circuit breaker is open for this provider.
    CircuitOpen,
    /// A configured budget (cost, tokens, iterations) was exceeded.
    BudgetExceeded,
}

impl ErrorKind {
    /// Whether the model-call layer should retry an error of this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }

    /// Whether this kind is permanent from the engine's perspective —
    /// i.e. re-invoking with the same input cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ErrorKind::Permanent
                | ErrorKind::InvalidArguments
                | ErrorKind::UnknownTool
                | ErrorKind::UserRejected
                | ErrorKind::BackupFailed
                | ErrorKind::Denied
        )
    }
}

/// State-store errors (generic key/value persistence used for the memory
/// sink and any auxiliary session-scoped state).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// Key not found in the given scope.
    #[error("not found: {scope}/{key}")]
    NotFound {
        /// The scope that was searched.
        scope: String,
        /// The key that was not found.
        key: String,
    },

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
