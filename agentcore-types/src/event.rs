//! Structured events delivered to the external event sink.
//!
//! Delivery is best-effort: a slow consumer must never block the core
//! loop, so producers publish into a bounded, drop-oldest channel rather
//! than calling the sink directly.

use crate::id::{SessionId, ToolCallId};
use serde::{Deserialize, Serialize};

/// One structured event describing core-loop progress, for observability
/// and UI consumption.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new iteration of the ReAct loop began.
    IterationStart {
        /// Which session.
        session_id: SessionId,
        /// 0-indexed iteration number.
        iteration: u32,
    },
    /// One tool call was dispatched.
    ToolCallStart {
        /// Which session.
        session_id: SessionId,
        /// The call being dispatched.
        tool_call_id: ToolCallId,
        /// The tool name.
        tool_name: String,
    },
    /// One tool call finished (success or failure).
    ToolCallEnd {
        /// Which session.
        session_id: SessionId,
        /// The call that finished.
        tool_call_id: ToolCallId,
        /// Whether it succeeded.
        success: bool,
    },
    /// An incremental model-response delta arrived (streaming only).
    /// The engine only acts on the fully-assembled response; this event
    /// exists purely for UI consumption.
    ModelDelta {
        /// Which session.
        session_id: SessionId,
        /// The text fragment.
        text: String,
    },
    /// Context pressure observed before a model call.
    ContextPressure {
        /// Which session.
        session_id: SessionId,
        /// Fraction of the budget in use, 0.0-1.0+.
        fill_ratio: f64,
    },
    /// Compaction ran and replaced a prefix with a summary.
    CompactionComplete {
        /// Which session.
        session_id: SessionId,
        /// Messages folded into the summary.
        messages_folded: usize,
        /// Estimated tokens freed.
        tokens_freed: u64,
    },
    /// The task reached a terminal state.
    TaskComplete {
        /// Which session.
        session_id: SessionId,
        /// Why the loop stopped.
        stop_reason: crate::model::StopReason,
    },
}
