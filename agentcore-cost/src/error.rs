//! Errors from the cost/usage tracker's persistence layer.

use thiserror::Error;

/// Failures recording or querying usage. Never allowed to propagate into
/// the model-call path — callers log and move on.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CostError {
    /// The records file or index could not be read or written.
    #[error("io error: {0}")]
    Io(String),

    /// A stored record failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The advisory file lock could not be acquired.
    #[error("lock failed: {0}")]
    LockFailed(String),
}

impl From<std::io::Error> for CostError {
    fn from(e: std::io::Error) -> Self {
        CostError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CostError {
    fn from(e: serde_json::Error) -> Self {
        CostError::Serialization(e.to_string())
    }
}
