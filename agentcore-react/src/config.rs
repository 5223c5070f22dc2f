//! Tuning knobs for one `ReactEngine`, matching the recognized
//! configuration options for the engine's share of the system.

use serde::{Deserialize, Serialize};

/// Static configuration for a `ReactEngine` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on model calls per `solve_task` invocation.
    pub max_iterations: u32,
    /// Base system prompt, sent as the provider request's `system` field.
    pub system_prompt: String,
    /// Model identifier passed to the provider. `None` lets the provider
    /// pick its own default.
    pub model: Option<String>,
    /// Maximum output tokens requested per model call.
    pub max_tokens: u32,
    /// Name of the provider backing this engine, recorded alongside each
    /// usage entry since the model-call layer's response carries a model
    /// identifier but no provider identifier of its own.
    pub provider_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt: String::new(),
            model: None,
            max_tokens: 4096,
            provider_name: String::new(),
        }
    }
}
