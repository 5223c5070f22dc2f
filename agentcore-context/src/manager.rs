//! The context manager: an append-only message log with budget-aware
//! auto-compaction and point-in-time snapshot/restore.

use crate::memory::MemorySink;
use crate::strategy::CompactionStrategy;
use crate::token_estimate;
use agentcore_types::Message;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Tuning knobs for [`ContextManager::auto_compact`].
#[derive(Debug, Clone, Copy)]
pub struct ContextManagerConfig {
    /// Token budget for the target model's context window.
    pub max_context_tokens: usize,
    /// Fraction of the budget that triggers compaction (default 0.7).
    pub compact_threshold: f64,
    /// Number of most-recent messages preserved verbatim (default 5).
    pub preserve_tail: usize,
}

impl Default for ContextManagerConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 128_000,
            compact_threshold: 0.7,
            preserve_tail: 5,
        }
    }
}

/// A point-in-time copy of the message log, restorable via
/// [`ContextManager::restore`].
#[derive(Debug, Clone)]
pub struct ContextSnapshot(Vec<Message>);

/// Presents the model a budget-respecting view of the conversation,
/// compacting the middle of the transcript as it grows while protecting
/// the system prompt and recent activity.
pub struct ContextManager {
    messages: Vec<Message>,
    config: ContextManagerConfig,
    strategy: Arc<dyn CompactionStrategy>,
    memory_sink: Arc<dyn MemorySink>,
}

impl ContextManager {
    /// Build an empty manager with the given policy and collaborators.
    pub fn new(
        config: ContextManagerConfig,
        strategy: Arc<dyn CompactionStrategy>,
        memory_sink: Arc<dyn MemorySink>,
    ) -> Self {
        Self {
            messages: Vec::new(),
            config,
            strategy,
            memory_sink,
        }
    }

    /// Append a message to the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The current prompt view: every retained message, oldest first.
    pub fn get_prompt_messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Estimated token cost of the current log.
    pub fn estimate_tokens(&self) -> usize {
        token_estimate::estimate_messages(&self.messages)
    }

    /// Compact the log if it is at or above the configured threshold of
    /// the token budget. Returns whether compaction ran.
    ///
    /// System messages and the last `preserve_tail` messages are never
    /// touched; everything else is split into contiguous compressible
    /// runs, each collapsed independently by the configured strategy so
    /// protected messages interleaved with compressible ones keep their
    /// relative position.
    pub async fn auto_compact(&mut self) -> bool {
        let budget = (self.config.max_context_tokens as f64 * self.config.compact_threshold) as usize;
        let estimated = self.estimate_tokens();
        if estimated < budget {
            return false;
        }

        let before = self.messages.len();
        async {
            let tail_start = self.messages.len().saturating_sub(self.config.preserve_tail);
            let drained: Vec<Message> = self.messages.drain(..tail_start).collect();
            let mut rebuilt = Vec::with_capacity(drained.len());
            let mut buffer = Vec::new();

            for message in drained {
                if message.is_compressible() {
                    buffer.push(message);
                } else {
                    self.flush_buffer(&mut buffer, &mut rebuilt).await;
                    rebuilt.push(message);
                }
            }
            self.flush_buffer(&mut buffer, &mut rebuilt).await;
            rebuilt.extend(self.messages.drain(..));
            debug!(before, after = rebuilt.len(), "compacted message log");
            self.messages = rebuilt;
        }
        .instrument(info_span!("context.compact", estimated, budget))
        .await;
        true
    }

    async fn flush_buffer(&self, buffer: &mut Vec<Message>, rebuilt: &mut Vec<Message>) {
        if buffer.is_empty() {
            return;
        }
        let (replacement, entries) = self.strategy.compact(std::mem::take(buffer)).await;
        for entry in entries {
            self.memory_sink.record(entry).await;
        }
        rebuilt.extend(replacement);
    }

    /// Capture the current log for later restoration.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot(self.messages.clone())
    }

    /// Replace the current log with a previously captured snapshot.
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        self.messages = snapshot.0;
    }
}
