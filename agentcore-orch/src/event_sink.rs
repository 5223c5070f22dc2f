//! Bounded, drop-oldest adapter for `agentcore_react::EventSink`.
//!
//! A slow or absent observer must never stall the engine, so delivery
//! rides a `tokio::sync::broadcast` channel: once the ring buffer fills,
//! the oldest unread event is silently discarded rather than blocking
//! the sender.

use agentcore_react::EventSink;
use agentcore_types::EngineEvent;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Publishes engine events to any number of subscribers without ever
/// blocking the emitting task.
pub struct BroadcastEventSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastEventSink {
    /// Create a sink whose internal ring buffer holds `capacity` events
    /// per lagging subscriber before it starts dropping the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to this sink's event stream. Each subscriber gets its
    /// own lag tracking; a subscriber that falls behind loses the
    /// oldest events first, never blocks the publisher.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: EngineEvent) {
        // No subscribers is not an error — observability is optional.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::SessionId;

    #[tokio::test]
    async fn delivers_to_subscriber() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();
        sink.emit(EngineEvent::IterationStart {
            session_id: SessionId::new("s1"),
            iteration: 0,
        })
        .await;

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, EngineEvent::IterationStart { iteration: 0, .. }));
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_panic() {
        let sink = BroadcastEventSink::new(4);
        sink.emit(EngineEvent::TaskComplete {
            session_id: SessionId::new("s1"),
            stop_reason: agentcore_types::StopReason::FinalAnswer,
        })
        .await;
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_oldest_not_newest() {
        let sink = BroadcastEventSink::new(2);
        let mut rx = sink.subscribe();
        for i in 0..5u32 {
            sink.emit(EngineEvent::IterationStart {
                session_id: SessionId::new("s1"),
                iteration: i,
            })
            .await;
        }

        // Lagged: the receiver missed some, but what it does get is in
        // order and ends with the most recent event.
        let mut last = None;
        loop {
            match rx.try_recv() {
                Ok(event) => last = Some(event),
                Err(_) => break,
            }
        }
        assert!(matches!(
            last,
            Some(EngineEvent::IterationStart { iteration: 4, .. })
        ));
    }
}
