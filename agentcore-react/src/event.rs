//! The event sink port: best-effort delivery of `EngineEvent`s to an
//! external observer. Implementations must never block the engine —
//! a bounded, drop-oldest channel adapter lives in the coordinator crate.

use agentcore_types::EngineEvent;
use async_trait::async_trait;

/// Receives structured progress events from the engine.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit one event. Must not block the caller for long; slow sinks
    /// should buffer internally and drop under pressure rather than
    /// stall the loop.
    async fn emit(&self, event: EngineEvent);
}

/// Discards every event. The default when no observer is wired up.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _event: EngineEvent) {}
}
