//! Scoping for state-store reads/writes.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};

/// Which namespace a state read/write applies to.
///
/// Kept deliberately small: the core only ever needs session-scoped state
/// (compaction memory extraction, per-session auxiliary data) and
/// process-wide global state (the pricing table override, registries).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    /// Per-conversation.
    Session(SessionId),
    /// Shared across all sessions.
    Global,
}
