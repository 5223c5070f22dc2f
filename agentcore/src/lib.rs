#![deny(missing_docs)]
//! # agentcore — umbrella crate
//!
//! Single import surface for the agent execution core. Re-exports the
//! protocol crates and key implementations behind feature flags, plus a
//! `prelude` for the common path: a `ReactEngine` over a `Provider`,
//! backed by a tool registry, context manager, and cost tracker, wired
//! up by a `Coordinator`.

#[cfg(feature = "core")]
pub use agentcore_context;
#[cfg(feature = "cost")]
pub use agentcore_cost;
#[cfg(feature = "orch")]
pub use agentcore_orch;
#[cfg(feature = "core")]
pub use agentcore_provider;
#[cfg(feature = "react")]
pub use agentcore_react;
#[cfg(feature = "state-memory")]
pub use agentcore_state_memory;
#[cfg(feature = "core")]
pub use agentcore_tool;
#[cfg(feature = "core")]
pub use agentcore_types;

/// Happy-path imports for composing an agent execution core.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use agentcore_types::{
        EngineEvent, ErrorKind, Message, Role, Scope, Session, SessionId, StateReader, StateStore,
        StopReason, TaskState, ToolCall, ToolResult,
    };

    #[cfg(feature = "core")]
    pub use agentcore_provider::{Provider, ProviderError, ProviderRequest, ProviderResponse};

    #[cfg(feature = "core")]
    pub use agentcore_tool::{Executor, ExecutorConfig, ToolDyn, ToolError, ToolRegistry};

    #[cfg(feature = "core")]
    pub use agentcore_context::{ContextManager, ContextManagerConfig};

    #[cfg(feature = "cost")]
    pub use agentcore_cost::CostTracker;

    #[cfg(feature = "react")]
    pub use agentcore_react::{EngineConfig, EventSink, ReactEngine, SolveOutcome};

    #[cfg(feature = "orch")]
    pub use agentcore_orch::{
        BroadcastEventSink, Coordinator, CoordinatorConfig, InMemorySessionStore, SessionStore,
    };

    #[cfg(feature = "state-memory")]
    pub use agentcore_state_memory::MemoryStore;
}
