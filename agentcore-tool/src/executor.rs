//! The dispatcher: validates arguments, gates destructive calls through
//! approval and backup, and runs calls concurrently under a semaphore.

use crate::approval::{ApprovalDecision, Approver, BackupManager};
use crate::registry::ToolRegistry;
use crate::schema;
use agentcore_types::{ErrorKind, ToolCall, ToolCallId, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executor tuning knobs. Mirrors §6's `tool_concurrency` and
/// `approval.*` configuration options.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrently in-flight tool calls (`ExecuteMany`).
    pub concurrency: usize,
    /// Per-call deadline. `None` means no deadline beyond cancellation.
    pub call_timeout: Option<Duration>,
    /// Whether dangerous tools require approval. When false, the approver
    /// is bypassed entirely (useful for trusted batch automation).
    pub require_approval_for_dangerous: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            call_timeout: None,
            require_approval_for_dangerous: true,
        }
    }
}

/// Runs tool calls against a registry with bounded concurrency, argument
/// validation, and approval/backup gating for destructive operations.
pub struct Executor {
    registry: Arc<ToolRegistry>,
    approver: Arc<dyn Approver>,
    backup: Arc<dyn BackupManager>,
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
}

impl Executor {
    /// Build an executor over the given registry and collaborators.
    pub fn new(
        registry: Arc<ToolRegistry>,
        approver: Arc<dyn Approver>,
        backup: Arc<dyn BackupManager>,
        config: ExecutorConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            registry,
            approver,
            backup,
            config,
            semaphore,
        }
    }

    /// Execute one tool call, normalizing every failure mode into a
    /// `ToolResult` carrying a closed `ErrorKind`.
    ///
    /// `cancellation` is honored while waiting for the concurrency permit
    /// and for the call itself; on cancellation this returns a
    /// `ToolResult` tagged `ErrorKind::Cancelled` rather than the tool's
    /// own outcome.
    pub async fn execute(
        &self,
        call: &ToolCall,
        session_id: &str,
        cancellation: &CancellationToken,
    ) -> ToolResult {
        if cancellation.is_cancelled() {
            return cancelled_result(&call.id, &call.name);
        }
        let permit = tokio::select! {
            permit = self.semaphore.clone().acquire_owned() => permit.expect("semaphore never closed"),
            _ = cancellation.cancelled() => return cancelled_result(&call.id, &call.name),
        };
        let _permit = permit;
        tokio::select! {
            result = self.execute_inner(call, session_id) => result,
            _ = cancellation.cancelled() => cancelled_result(&call.id, &call.name),
        }
    }

    async fn execute_inner(&self, call: &ToolCall, session_id: &str) -> ToolResult {
        let tool = match self.registry.get(&call.name) {
            Ok(tool) => tool,
            Err(_) => {
                return ToolResult::err(
                    call.id.clone(),
                    ErrorKind::UnknownTool,
                    format!("no tool registered under name '{}'", call.name),
                );
            }
        };

        let metadata = tool.metadata();
        if let Err(message) = schema::validate(&call.arguments, &metadata.parameter_schema) {
            return ToolResult::err(call.id.clone(), ErrorKind::InvalidArguments, message);
        }

        let mut arguments = call.arguments.clone();

        if metadata.dangerous && self.config.require_approval_for_dangerous {
            let preview = format!("{}({})", call.name, arguments);
            let decision = self
                .approver
                .request_approval(&call.name, session_id, &preview)
                .await;
            match decision {
                ApprovalDecision::Approve => {}
                ApprovalDecision::Edited(edited) => arguments = edited,
                ApprovalDecision::Reject => {
                    return ToolResult::err(
                        call.id.clone(),
                        ErrorKind::UserRejected,
                        format!("user rejected call to '{}'", call.name),
                    );
                }
            }

            if let Some(path) = arguments.get("path").and_then(|v| v.as_str()) {
                if let Err(e) = self
                    .backup
                    .create_backup(session_id, path, &format!("before {}", call.name))
                    .await
                {
                    warn!(tool = %call.name, error = %e, "backup failed, aborting mutation");
                    return ToolResult::err(
                        call.id.clone(),
                        ErrorKind::BackupFailed,
                        format!("could not back up '{path}': {e}"),
                    );
                }
            }
        }

        let call_future = tool.call(arguments);
        let outcome = match self.config.call_timeout {
            Some(d) => match tokio::time::timeout(d, call_future).await {
                Ok(result) => result,
                Err(_) => {
                    return ToolResult::err(
                        call.id.clone(),
                        ErrorKind::Cancelled,
                        format!("tool '{}' exceeded its deadline", call.name),
                    );
                }
            },
            None => call_future.await,
        };

        match outcome {
            Ok(output) => {
                debug!(tool = %call.name, "tool call succeeded");
                ToolResult::ok(call.id.clone(), output)
            }
            Err(e) => ToolResult::err(call.id.clone(), ErrorKind::Permanent, e.to_string()),
        }
    }

    /// Execute many calls concurrently, preserving input order in the
    /// output regardless of completion order, capped at `concurrency`
    /// in-flight invocations.
    ///
    /// Each dispatched call races against `cancellation` from inside its
    /// own spawned task, so a cancellation doesn't leave detached tasks
    /// running unobserved: every task still finishes (either with the
    /// tool's real outcome or a cancelled one) and this method always
    /// awaits every handle before returning, draining the full set of
    /// results rather than abandoning in-flight ones.
    pub async fn execute_many(
        &self,
        calls: &[ToolCall],
        session_id: &str,
        cancellation: &CancellationToken,
    ) -> Vec<ToolResult> {
        let session_id = session_id.to_string();
        let handles: Vec<_> = calls
            .iter()
            .cloned()
            .map(|call| {
                let registry = Arc::clone(&self.registry);
                let approver = Arc::clone(&self.approver);
                let backup = Arc::clone(&self.backup);
                let config = self.config.clone();
                let semaphore = Arc::clone(&self.semaphore);
                let session_id = session_id.clone();
                let cancellation = cancellation.clone();
                tokio::spawn(async move {
                    if cancellation.is_cancelled() {
                        return cancelled_result(&call.id, &call.name);
                    }
                    let permit = tokio::select! {
                        permit = semaphore.acquire_owned() => permit.expect("semaphore never closed"),
                        _ = cancellation.cancelled() => return cancelled_result(&call.id, &call.name),
                    };
                    let _permit = permit;
                    let exec = Executor {
                        registry,
                        approver,
                        backup,
                        config,
                        semaphore: Arc::new(Semaphore::new(1)),
                    };
                    tokio::select! {
                        result = exec.execute_inner(&call, &session_id) => result,
                        _ = cancellation.cancelled() => cancelled_result(&call.id, &call.name),
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (call, handle) in calls.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => ToolResult::err(
                    call.id.clone(),
                    ErrorKind::Permanent,
                    format!("tool task panicked: {join_err}"),
                ),
            };
            results.push(result);
        }
        results
    }
}

fn cancelled_result(id: &ToolCallId, name: &str) -> ToolResult {
    ToolResult::err(
        id.clone(),
        ErrorKind::Cancelled,
        format!("tool '{name}' cancelled"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{NoopApprover, NoopBackupManager};
    use crate::registry::test_tools::{EchoTool, FailTool};
    use agentcore_types::ToolCallId;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_executor(registry: ToolRegistry) -> Executor {
        Executor::new(
            Arc::new(registry),
            Arc::new(NoopApprover),
            Arc::new(NoopBackupManager),
            ExecutorConfig::default(),
        )
    }

    #[tokio::test]
    async fn unknown_tool_is_normalized() {
        let exec = make_executor(ToolRegistry::new());
        let call = ToolCall {
            id: ToolCallId::new("1"),
            name: "missing".into(),
            arguments: json!({}),
        };
        let result = exec.execute(&call, "s1", &CancellationToken::new()).await;
        assert_eq!(result.error, Some(ErrorKind::UnknownTool));
    }

    #[tokio::test]
    async fn successful_call_has_no_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let exec = make_executor(registry);
        let call = ToolCall {
            id: ToolCallId::new("1"),
            name: "echo".into(),
            arguments: json!({"x": 1}),
        };
        let result = exec.execute(&call, "s1", &CancellationToken::new()).await;
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn failing_tool_is_permanent() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailTool));
        let exec = make_executor(registry);
        let call = ToolCall {
            id: ToolCallId::new("1"),
            name: "fail".into(),
            arguments: json!({}),
        };
        let result = exec.execute(&call, "s1", &CancellationToken::new()).await;
        assert_eq!(result.error, Some(ErrorKind::Permanent));
    }

    #[tokio::test]
    async fn execute_many_preserves_input_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let exec = make_executor(registry);
        let calls: Vec<ToolCall> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, name)| ToolCall {
                id: ToolCallId::new(i.to_string()),
                name: "echo".into(),
                arguments: json!({"name": name}),
            })
            .collect();
        let results = exec.execute_many(&calls, "s1", &CancellationToken::new()).await;
        let ids: Vec<String> = results.iter().map(|r| r.tool_call_id.0.clone()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    struct CountingTool {
        concurrent: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl crate::registry::ToolDyn for CountingTool {
        fn name(&self) -> &str {
            "counting"
        }
        fn metadata(&self) -> agentcore_types::ToolMetadata {
            agentcore_types::ToolMetadata {
                name: "counting".into(),
                description: "tracks concurrent invocations".into(),
                parameter_schema: json!({"type": "object"}),
                dangerous: false,
                group_tags: vec![],
            }
        }
        fn call(
            &self,
            _arguments: serde_json::Value,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<String, crate::registry::ToolError>> + Send + '_>,
        > {
            let concurrent = Arc::clone(&self.concurrent);
            let max_seen = Arc::clone(&self.max_seen);
            Box::pin(async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok("done".to_string())
            })
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_cap() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingTool {
            concurrent: Arc::clone(&concurrent),
            max_seen: Arc::clone(&max_seen),
        }));
        let config = ExecutorConfig {
            concurrency: 2,
            ..Default::default()
        };
        let exec = Executor::new(
            Arc::new(registry),
            Arc::new(NoopApprover),
            Arc::new(NoopBackupManager),
            config,
        );
        let calls: Vec<ToolCall> = (0..6)
            .map(|i| ToolCall {
                id: ToolCallId::new(i.to_string()),
                name: "counting".into(),
                arguments: json!({}),
            })
            .collect();
        exec.execute_many(&calls, "s1", &CancellationToken::new()).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_skips_the_tool_entirely() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let exec = make_executor(registry);
        let call = ToolCall {
            id: ToolCallId::new("1"),
            name: "echo".into(),
            arguments: json!({}),
        };
        let token = CancellationToken::new();
        token.cancel();

        let result = exec.execute(&call, "s1", &token).await;
        assert_eq!(result.error, Some(ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn execute_many_drains_every_call_even_when_cancelled_mid_flight() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingTool {
            concurrent: Arc::clone(&concurrent),
            max_seen: Arc::clone(&max_seen),
        }));
        let exec = make_executor(registry);
        let calls: Vec<ToolCall> = (0..4)
            .map(|i| ToolCall {
                id: ToolCallId::new(i.to_string()),
                name: "counting".into(),
                arguments: json!({}),
            })
            .collect();

        let token = CancellationToken::new();
        token.cancel();
        let results = exec.execute_many(&calls, "s1", &token).await;

        assert_eq!(results.len(), 4);
        for result in &results {
            assert_eq!(result.error, Some(ErrorKind::Cancelled));
        }
    }
}
