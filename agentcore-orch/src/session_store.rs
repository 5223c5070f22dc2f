//! Session persistence port: the coordinator's only external dependency
//! for durable conversation state, distinct from the generic key/value
//! `StateStore` used for the memory sink and other auxiliary state.

use agentcore_types::{Message, Session, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by a `SessionStore` implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// No session exists under the requested id.
    #[error("session not found: {0}")]
    NotFound(SessionId),
    /// The backing store rejected the write.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Durable storage for session message logs.
///
/// `Append` exists as its own operation (distinct from `Save`) so a
/// coordinator can persist one message at a time as a task runs, rather
/// than rewriting the whole log after every iteration.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by id, or `Ok(None)` if it has never been saved.
    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, SessionStoreError>;

    /// Persist the full session, overwriting any prior record.
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Append one message to a session, creating it first if absent.
    async fn append(
        &self,
        session_id: &SessionId,
        message: Message,
    ) -> Result<(), SessionStoreError>;
}

/// In-process `SessionStore` backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for development, testing, and single-process deployments;
/// does not survive a restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| SessionStoreError::WriteFailed(e.to_string()))?
            .get(session_id)
            .cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .map_err(|e| SessionStoreError::WriteFailed(e.to_string()))?
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn append(
        &self,
        session_id: &SessionId,
        message: Message,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| SessionStoreError::WriteFailed(e.to_string()))?;
        sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session::new(session_id.clone()))
            .append(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::Role;

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = InMemorySessionStore::new();
        let found = store.load(&SessionId::new("s1")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn append_creates_session_implicitly() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new("s1");
        store
            .append(&id, Message::new(Role::User, "hello"))
            .await
            .unwrap();

        let session = store.load(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new("s1");
        store
            .append(&id, Message::new(Role::User, "first"))
            .await
            .unwrap();
        store
            .append(&id, Message::new(Role::Assistant, "second"))
            .await
            .unwrap();

        let session = store.load(&id).await.unwrap().unwrap();
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn save_overwrites_prior_record() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new("s1");
        let mut session = Session::new(id.clone());
        session.append(Message::new(Role::User, "a"));
        store.save(&session).await.unwrap();

        session.append(Message::new(Role::User, "b"));
        store.save(&session).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store
            .append(&SessionId::new("s1"), Message::new(Role::User, "one"))
            .await
            .unwrap();
        store
            .append(&SessionId::new("s2"), Message::new(Role::User, "two"))
            .await
            .unwrap();

        let s1 = store.load(&SessionId::new("s1")).await.unwrap().unwrap();
        let s2 = store.load(&SessionId::new("s2")).await.unwrap().unwrap();
        assert_eq!(s1.messages[0].content, "one");
        assert_eq!(s2.messages[0].content, "two");
    }
}
