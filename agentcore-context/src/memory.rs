//! The long-lived memory sink compaction hands salient content to before
//! a compressible prefix is discarded.

use async_trait::async_trait;
use std::sync::Mutex;

/// What kind of salient fact a memory entry captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryEntryKind {
    /// A tool call paired with its outcome.
    ToolOutcome,
    /// A user instruction matching a preference cue.
    UserPreference,
    /// A long tool output that looked like a structured finding.
    StructuredFinding,
}

/// One fact extracted from a prefix about to be compacted away.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// What kind of fact this is.
    pub kind: MemoryEntryKind,
    /// The extracted text, already truncated to a reasonable length.
    pub content: String,
}

/// Receives extracted facts before their source messages are discarded.
///
/// Called synchronously within `AutoCompact`, before the compacted prefix
/// replaces the original messages, so no durable information is lost to
/// a sink failure silently — callers that need delivery guarantees should
/// make `record` itself durable (e.g. append to a WAL) rather than relying
/// on this trait to retry.
#[async_trait]
pub trait MemorySink: Send + Sync {
    /// Record one extracted entry.
    async fn record(&self, entry: MemoryEntry);
}

/// Sink that discards every entry. The default for callers that don't
/// want durable extraction.
pub struct NoopMemorySink;

#[async_trait]
impl MemorySink for NoopMemorySink {
    async fn record(&self, _entry: MemoryEntry) {}
}

/// In-process sink that accumulates entries for inspection, chiefly
/// useful in tests.
#[derive(Default)]
pub struct RecordingMemorySink {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl RecordingMemorySink {
    /// An empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.lock().expect("memory sink mutex poisoned").clone()
    }
}

#[async_trait]
impl MemorySink for RecordingMemorySink {
    async fn record(&self, entry: MemoryEntry) {
        self.entries.lock().expect("memory sink mutex poisoned").push(entry);
    }
}
