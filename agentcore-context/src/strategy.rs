//! Compaction strategies: pluggable ways to collapse a compressible
//! message prefix while extracting salient content for the memory sink.

use crate::memory::{MemoryEntry, MemoryEntryKind};
use crate::token_estimate;
use agentcore_types::{Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}…", &s[..max_len])
    }
}

/// Collapses (or otherwise shrinks) a compressible message prefix.
///
/// Receives only the contiguous run of compressible messages between the
/// last protected boundary (a system message, or the start of the
/// conversation) and the preserved tail — never the tail itself, never
/// system messages. Returns the replacement messages plus any facts
/// worth handing to the memory sink before the originals are dropped.
#[async_trait]
pub trait CompactionStrategy: Send + Sync {
    /// Compact `prefix`, returning its replacement and extracted facts.
    async fn compact(&self, prefix: Vec<Message>) -> (Vec<Message>, Vec<MemoryEntry>);
}

/// Default strategy: collapses the whole prefix into one synthesized
/// system-role summary message, after extracting tool-call outcomes,
/// user preference cues, and long structured tool outputs.
pub struct SlidingWindow {
    preference_cues: Vec<String>,
    long_output_threshold: usize,
}

impl SlidingWindow {
    /// A sliding window using the default preference cue list and a
    /// 500-character threshold for "long" tool output.
    pub fn new() -> Self {
        Self {
            preference_cues: ["always", "never", "prefer", "from now on", "please remember"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            long_output_threshold: 500,
        }
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompactionStrategy for SlidingWindow {
    async fn compact(&self, prefix: Vec<Message>) -> (Vec<Message>, Vec<MemoryEntry>) {
        if prefix.len() <= 1 {
            return (prefix, Vec::new());
        }

        let mut entries = Vec::new();

        for pair in prefix.windows(2) {
            let [a, b] = pair else { continue };
            if a.role != Role::Assistant || b.role != Role::Tool {
                continue;
            }
            if let Some(call) = a
                .tool_calls
                .iter()
                .find(|c| b.tool_call_id.as_ref() == Some(&c.id))
            {
                entries.push(MemoryEntry {
                    kind: MemoryEntryKind::ToolOutcome,
                    content: format!("called `{}` -> {}", call.name, truncate(&b.content, 200)),
                });
            }
        }

        for m in &prefix {
            if m.role != Role::User {
                continue;
            }
            let lower = m.content.to_lowercase();
            if self.preference_cues.iter().any(|cue| lower.contains(cue)) {
                entries.push(MemoryEntry {
                    kind: MemoryEntryKind::UserPreference,
                    content: m.content.clone(),
                });
            }
        }

        for m in &prefix {
            if m.role == Role::Tool && m.content.len() > self.long_output_threshold {
                entries.push(MemoryEntry {
                    kind: MemoryEntryKind::StructuredFinding,
                    content: truncate(&m.content, self.long_output_threshold),
                });
            }
        }

        let summary = Message::new(
            Role::System,
            format!("[summary of {} earlier messages]", prefix.len()),
        );
        (vec![summary], entries)
    }
}

/// Replaces the content of all but the most recent `keep_recent_n` tool
/// results in the prefix with a placeholder, extracting the cleared
/// content as structured findings. Leaves every other message untouched —
/// useful ahead of [`SlidingWindow`] in a [`Composite`] chain when the
/// bulk of the token cost is tool output rather than conversation.
pub struct ToolResultClearing {
    keep_recent_n: usize,
}

impl ToolResultClearing {
    /// Keep the most recent `keep_recent_n` tool results intact.
    pub fn new(keep_recent_n: usize) -> Self {
        Self { keep_recent_n }
    }
}

#[async_trait]
impl CompactionStrategy for ToolResultClearing {
    async fn compact(&self, prefix: Vec<Message>) -> (Vec<Message>, Vec<MemoryEntry>) {
        let tool_positions: Vec<usize> = prefix
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::Tool)
            .map(|(i, _)| i)
            .collect();
        let to_clear = tool_positions.len().saturating_sub(self.keep_recent_n);

        let mut prefix = prefix;
        let mut entries = Vec::new();
        for &idx in &tool_positions[..to_clear] {
            entries.push(MemoryEntry {
                kind: MemoryEntryKind::StructuredFinding,
                content: truncate(&prefix[idx].content, 500),
            });
            prefix[idx].content = "[tool result cleared]".to_string();
        }
        (prefix, entries)
    }
}

/// Chains strategies in order, stopping as soon as the running estimate
/// drops to or below `target_tokens`.
pub struct Composite {
    strategies: Vec<Arc<dyn CompactionStrategy>>,
    target_tokens: usize,
}

impl Composite {
    /// Run `strategies` in order until the prefix estimate is at or
    /// below `target_tokens`.
    pub fn new(strategies: Vec<Arc<dyn CompactionStrategy>>, target_tokens: usize) -> Self {
        Self {
            strategies,
            target_tokens,
        }
    }
}

#[async_trait]
impl CompactionStrategy for Composite {
    async fn compact(&self, prefix: Vec<Message>) -> (Vec<Message>, Vec<MemoryEntry>) {
        let mut current = prefix;
        let mut all_entries = Vec::new();
        for strategy in &self.strategies {
            if token_estimate::estimate_messages(&current) <= self.target_tokens {
                break;
            }
            let (next, entries) = strategy.compact(current).await;
            current = next;
            all_entries.extend(entries);
        }
        (current, all_entries)
    }
}
