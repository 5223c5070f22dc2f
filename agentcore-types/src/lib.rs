//! # agentcore-types — shared data model and protocol traits
//!
//! The vocabulary every other crate in this workspace builds on: the
//! session/message/tool-call data model (§3), the closed `ErrorKind` set
//! that crosses component boundaries (§7), the `StateStore` trait used
//! by the memory sink and auxiliary persistence, and the `EngineEvent`
//! vocabulary delivered to the external event sink (§6).
//!
//! Nothing in this crate executes anything — it is pure data and traits.

#![deny(missing_docs)]

pub mod duration;
pub mod error;
pub mod event;
pub mod id;
pub mod model;
pub mod scope;
pub mod state;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use duration::DurationMs;
pub use error::{ErrorKind, StateError};
pub use event::EngineEvent;
pub use id::{SessionId, SubAgentId, ToolCallId};
pub use model::{
    CostSelector, CostSummary, Message, ModelCostBreakdown, Role, Session, StopReason, TaskState,
    TokenTotals, ToolCall, ToolMetadata, ToolResult, UsageRecord,
};
pub use scope::Scope;
pub use state::{SearchResult, StateReader, StateStore};
