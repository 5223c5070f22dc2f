#![deny(missing_docs)]
//! A capacity-bounded `StateStore`, and a `MemorySink` that persists
//! compaction-extracted memory into one.
//!
//! `agentcore_types::test_utils::InMemoryStore` already covers the
//! "don't care about persistence" test double; this crate exists for the
//! one case that double doesn't handle — a session that runs long enough
//! to trigger many compactions must not grow its extracted-memory scope
//! without bound. [`MemoryStore`] caps entries per [`Scope`] and evicts
//! the least-recently-used one on overflow; [`StateMemorySink`] wires that
//! store into `agentcore_context::MemorySink` so compaction's extracted
//! facts (§4.3: "handed to an external memory sink... so no durable
//! information is silently lost") land somewhere durable instead of the
//! in-process-only `NoopMemorySink`/`RecordingMemorySink`.

use agentcore_context::{MemoryEntry, MemoryEntryKind, MemorySink};
use agentcore_types::error::StateError;
use agentcore_types::scope::Scope;
use agentcore_types::state::{SearchResult, StateStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::warn;

struct Entry {
    value: serde_json::Value,
    last_accessed: Instant,
}

#[derive(Default)]
struct ScopeTable {
    entries: HashMap<String, Entry>,
}

/// In-memory state store, one table per [`Scope`], with an optional
/// per-scope entry cap enforced by least-recently-used eviction.
///
/// Unbounded by default (`new`); `with_capacity_per_scope` caps how many
/// keys a single scope may hold, evicting the entry with the oldest
/// `last_accessed` timestamp (bumped on both read and write) once a write
/// would exceed it.
pub struct MemoryStore {
    scopes: RwLock<HashMap<Scope, ScopeTable>>,
    capacity_per_scope: Option<usize>,
    evictions: AtomicU64,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            capacity_per_scope: None,
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a store that evicts the least-recently-used entry in a
    /// scope whenever a write would push that scope past `capacity`
    /// entries.
    pub fn with_capacity_per_scope(capacity: usize) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            capacity_per_scope: Some(capacity),
            evictions: AtomicU64::new(0),
        }
    }

    /// Total number of entries evicted for capacity across all scopes.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn enforce_capacity(&self, table: &mut ScopeTable) {
        let Some(capacity) = self.capacity_per_scope else {
            return;
        };
        while table.entries.len() > capacity {
            let lru_key = table
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            match lru_key {
                Some(key) => {
                    table.entries.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let mut scopes = self.scopes.write().await;
        let Some(table) = scopes.get_mut(scope) else {
            return Ok(None);
        };
        match table.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                Ok(Some(entry.value.clone()))
            }
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let mut scopes = self.scopes.write().await;
        let table = scopes.entry(scope.clone()).or_default();
        table.entries.insert(
            key.to_string(),
            Entry {
                value,
                last_accessed: Instant::now(),
            },
        );
        self.enforce_capacity(table);
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let mut scopes = self.scopes.write().await;
        if let Some(table) = scopes.get_mut(scope) {
            table.entries.remove(key);
        }
        Ok(())
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let scopes = self.scopes.read().await;
        Ok(scopes
            .get(scope)
            .map(|table| {
                table
                    .entries
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search(
        &self,
        _scope: &Scope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StateError> {
        // No semantic search support in the in-memory backend.
        Ok(vec![])
    }
}

fn kind_tag(kind: MemoryEntryKind) -> &'static str {
    match kind {
        MemoryEntryKind::ToolOutcome => "tool_outcome",
        MemoryEntryKind::UserPreference => "user_preference",
        MemoryEntryKind::StructuredFinding => "structured_finding",
    }
}

/// Adapts any `StateStore` into a `MemorySink`: every extracted entry is
/// written under a fixed `Scope`, keyed by a monotonically increasing
/// index so repeated compactions within one session never collide.
///
/// Write failures are logged and swallowed, matching the cost tracker's
/// own "never propagate, log and ignore" policy for auxiliary writes —
/// `MemorySink::record` has no error channel to surface one through.
pub struct StateMemorySink {
    store: Arc<dyn StateStore>,
    scope: Scope,
    next_index: AtomicU64,
}

impl StateMemorySink {
    /// Persist every recorded entry into `store` under `scope`.
    pub fn new(store: Arc<dyn StateStore>, scope: Scope) -> Self {
        Self {
            store,
            scope,
            next_index: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl MemorySink for StateMemorySink {
    async fn record(&self, entry: MemoryEntry) {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let key = format!("memory-{index}");
        let value = serde_json::json!({
            "kind": kind_tag(entry.kind),
            "content": entry.content,
        });
        if let Err(error) = self.store.write(&self.scope, &key, value).await {
            warn!(%error, scope = ?self.scope, "failed to persist extracted memory entry");
        }
    }
}
