//! A trivial `StateStore` for tests that don't care about persistence.

use crate::error::StateError;
use crate::scope::Scope;
use crate::state::{SearchResult, StateStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory `StateStore`, composite-keyed by `(scope, key)`.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<(Scope, String), serde_json::Value>>,
}

impl InMemoryStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let guard = self.data.read().expect("lock poisoned");
        Ok(guard.get(&(scope.clone(), key.to_string())).cloned())
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let mut guard = self.data.write().expect("lock poisoned");
        guard.insert((scope.clone(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let mut guard = self.data.write().expect("lock poisoned");
        guard.remove(&(scope.clone(), key.to_string()));
        Ok(())
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let guard = self.data.read().expect("lock poisoned");
        Ok(guard
            .keys()
            .filter(|(s, k)| s == scope && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn search(
        &self,
        _scope: &Scope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StateError> {
        Ok(vec![])
    }
}
