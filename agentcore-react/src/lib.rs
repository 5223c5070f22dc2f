#![deny(missing_docs)]
//! The ReAct engine: drives a single task to completion by iterating
//! think -> act -> observe, enforcing termination against a configured
//! iteration cap, and reporting structured progress to an event sink.
//!
//! Generic over [`agentcore_provider::Provider`], which uses
//! return-position `impl Trait` and is therefore not object-safe — see
//! [`engine::ReactEngine`].

pub mod config;
pub mod convert;
pub mod engine;
pub mod event;

pub use config::EngineConfig;
pub use engine::{ReactEngine, SolveOutcome, StepDriver, StepOutcome};
pub use event::{EventSink, NoopEventSink};
