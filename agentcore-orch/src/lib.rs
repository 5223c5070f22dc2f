#![deny(missing_docs)]
//! The coordinator: the composition root that assembles the engine, tool
//! executor, context manager, cost tracker, and session store into one
//! `run_task` entry point, plus the external-port adapters owned at this
//! layer (session persistence, event delivery) that the lower crates
//! only define as traits.

pub mod coordinator;
pub mod event_sink;
pub mod session_store;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use event_sink::BroadcastEventSink;
pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
