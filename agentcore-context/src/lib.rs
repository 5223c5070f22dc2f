#![deny(missing_docs)]
//! Context management for long-running agent sessions: an append-only
//! message log, budget-aware auto-compaction, pluggable collapse
//! strategies, and a memory sink for salient content extracted before a
//! compacted prefix is discarded.

pub mod manager;
pub mod memory;
pub mod strategy;
pub mod token_estimate;

pub use manager::{ContextManager, ContextManagerConfig, ContextSnapshot};
pub use memory::{MemoryEntry, MemoryEntryKind, MemorySink, NoopMemorySink, RecordingMemorySink};
pub use strategy::{CompactionStrategy, Composite, SlidingWindow, ToolResultClearing};
