//! The tool catalog: object-safe tool trait plus a name-keyed registry.

use agentcore_types::ToolMetadata;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced directly by registry operations (as opposed to
/// `ErrorKind`-tagged `ToolResult`s, which are the executor's concern).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution raised an error the tool itself could not classify.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Object-safe trait every tool implementation satisfies.
///
/// Tools are stored as `Arc<dyn ToolDyn>` keyed by name in `ToolRegistry`.
/// Implementations receive already-validated JSON arguments — schema
/// validation happens in the executor before `call` is ever invoked, so
/// tool code only ever handles valid inputs.
pub trait ToolDyn: Send + Sync {
    /// Registry-unique name.
    fn name(&self) -> &str;

    /// Full metadata, including the parameter schema and `dangerous` flag.
    fn metadata(&self) -> ToolMetadata;

    /// Execute the tool with validated JSON arguments.
    fn call(
        &self,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>>;
}

/// Name-keyed catalog of tools available to the engine.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, overwriting any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ToolDyn>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// List metadata for every registered tool.
    pub fn list(&self) -> Vec<ToolMetadata> {
        self.tools.values().map(|t| t.metadata()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
