//! The coordinator: the composition root that wires a provider, tool
//! registry, context policy, cost tracker, and session store into a
//! single entry point for running one task to completion.

use crate::session_store::{SessionStore, SessionStoreError};
use agentcore_context::{ContextManager, ContextManagerConfig};
use agentcore_cost::CostTracker;
use agentcore_provider::{CircuitBreakerConfig, Provider, RetryConfig};
use agentcore_react::{EngineConfig, EventSink, ReactEngine, SolveOutcome};
use agentcore_tool::{Approver, BackupManager, Executor, ExecutorConfig, ToolRegistry};
use agentcore_context::{CompactionStrategy, MemorySink};
use agentcore_types::{Session, SessionId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Recognized tuning knobs for one coordinator instance, gathering the
/// configuration surface scattered across the engine, executor, context
/// manager, retry schedule, and circuit breaker into one place.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on model calls per task (`EngineConfig::max_iterations`).
    pub max_iterations: u32,
    /// Upper bound on concurrent tool dispatch (`ExecutorConfig::concurrency`).
    pub tool_concurrency: usize,
    /// Context-window budget handed to the context manager.
    pub context_max_tokens: usize,
    /// Fraction of the budget that triggers compaction.
    pub context_compact_threshold: f64,
    /// Messages preserved verbatim at the tail during compaction.
    pub context_preserve_tail: usize,
    /// Model-call retry schedule.
    pub retry: RetryConfig,
    /// Provider circuit breaker thresholds.
    pub breaker: CircuitBreakerConfig,
    /// Whether dangerous tools require approval.
    pub require_approval_for_dangerous: bool,
    /// Base system prompt sent with every model call.
    pub system_prompt: String,
    /// Model identifier, `None` to let the provider choose its default.
    pub model: Option<String>,
    /// Maximum output tokens requested per model call.
    pub max_tokens: u32,
    /// Name of the provider, recorded alongside usage entries.
    pub provider_name: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_concurrency: 5,
            context_max_tokens: 128_000,
            context_compact_threshold: 0.7,
            context_preserve_tail: 5,
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            require_approval_for_dangerous: true,
            system_prompt: String::new(),
            model: None,
            max_tokens: 4096,
            provider_name: String::new(),
        }
    }
}

/// Wires together the engine and its collaborators and exposes one
/// `run_task` entry point, loading and persisting session state around
/// each call.
pub struct Coordinator<P: Provider> {
    engine: ReactEngine<P>,
    sessions: Arc<dyn SessionStore>,
    strategy: Arc<dyn CompactionStrategy>,
    memory_sink: Arc<dyn MemorySink>,
    context_config: ContextManagerConfig,
}

impl<P: Provider> Coordinator<P> {
    /// Assemble a coordinator from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: P,
        registry: Arc<ToolRegistry>,
        approver: Arc<dyn Approver>,
        backup: Arc<dyn BackupManager>,
        cost: Option<Arc<CostTracker>>,
        events: Arc<dyn EventSink>,
        sessions: Arc<dyn SessionStore>,
        strategy: Arc<dyn CompactionStrategy>,
        memory_sink: Arc<dyn MemorySink>,
        config: CoordinatorConfig,
    ) -> Self {
        let executor = Arc::new(Executor::new(
            Arc::clone(&registry),
            approver,
            backup,
            ExecutorConfig {
                concurrency: config.tool_concurrency,
                call_timeout: None,
                require_approval_for_dangerous: config.require_approval_for_dangerous,
            },
        ));
        let engine_config = EngineConfig {
            max_iterations: config.max_iterations,
            system_prompt: config.system_prompt,
            model: config.model,
            max_tokens: config.max_tokens,
            provider_name: config.provider_name,
        };
        let engine = ReactEngine::new(provider, executor, registry, cost, events, engine_config)
            .with_retry_config(config.retry)
            .with_circuit_breaker_config(config.breaker);

        Self {
            engine,
            sessions,
            strategy,
            memory_sink,
            context_config: ContextManagerConfig {
                max_context_tokens: config.context_max_tokens,
                compact_threshold: config.context_compact_threshold,
                preserve_tail: config.context_preserve_tail,
            },
        }
    }

    /// Load the named session (creating it if absent), run the task to
    /// completion, and persist every message the run produced.
    pub async fn run_task(
        &self,
        session_id: &SessionId,
        task: impl Into<String>,
        cancellation: &CancellationToken,
    ) -> Result<SolveOutcome, SessionStoreError> {
        let mut session = self
            .sessions
            .load(session_id)
            .await?
            .unwrap_or_else(|| Session::new(session_id.clone()));

        let mut context = ContextManager::new(
            self.context_config,
            Arc::clone(&self.strategy),
            Arc::clone(&self.memory_sink),
        );
        for message in session.messages.iter().cloned() {
            context.append(message);
        }
        let history_index = context.get_prompt_messages().len();

        let outcome = self
            .engine
            .solve_task(task, session_id, &mut context, cancellation)
            .await;

        let produced = context.get_prompt_messages();
        for message in produced.iter().skip(history_index).cloned() {
            self.sessions.append(session_id, message.clone()).await?;
            session.append(message);
        }
        session.cumulative_tokens.input_tokens += outcome.state.token_totals.input_tokens;
        session.cumulative_tokens.output_tokens += outcome.state.token_totals.output_tokens;
        session.cumulative_tokens.cached_tokens += outcome.state.token_totals.cached_tokens;
        self.sessions.save(&session).await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sink::BroadcastEventSink;
    use crate::session_store::InMemorySessionStore;
    use agentcore_context::{NoopMemorySink, SlidingWindow};
    use agentcore_provider::{
        ContentPart, ProviderError, ProviderRequest, ProviderResponse, StopReason as WireStop,
        TokenUsage,
    };
    use agentcore_tool::{NoopApprover, NoopBackupManager};
    use agentcore_types::StopReason;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl Provider for ScriptedProvider {
        fn complete(
            &self,
            _request: ProviderRequest,
        ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send
        {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no more responses queued");
            async move { next }
        }
    }

    fn text_response(text: &str) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            content: vec![ContentPart::Text { text: text.into() }],
            stop_reason: WireStop::EndTurn,
            usage: TokenUsage {
                input_tokens: 7,
                output_tokens: 3,
                ..Default::default()
            },
            model: "scripted-model".into(),
            cost: None,
            truncated: None,
        })
    }

    fn coordinator(
        provider: ScriptedProvider,
        sessions: Arc<dyn SessionStore>,
    ) -> Coordinator<ScriptedProvider> {
        Coordinator::new(
            provider,
            Arc::new(ToolRegistry::new()),
            Arc::new(NoopApprover),
            Arc::new(NoopBackupManager),
            None,
            Arc::new(BroadcastEventSink::new(16)),
            sessions,
            Arc::new(SlidingWindow::new()),
            Arc::new(NoopMemorySink),
            CoordinatorConfig::default(),
        )
    }

    #[tokio::test]
    async fn run_task_persists_new_messages() {
        let provider = ScriptedProvider::new(vec![text_response("hi there")]);
        let sessions = Arc::new(InMemorySessionStore::new());
        let coord = coordinator(provider, sessions.clone());
        let id = SessionId::new("s1");

        let outcome = coord
            .run_task(&id, "hello", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::FinalAnswer);
        let session = sessions.load(&id).await.unwrap().unwrap();
        // one user turn, one assistant turn
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.cumulative_tokens.input_tokens, 7);
    }

    #[tokio::test]
    async fn run_task_resumes_prior_history() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let id = SessionId::new("s1");

        let provider = ScriptedProvider::new(vec![text_response("first answer")]);
        coordinator(provider, sessions.clone())
            .run_task(&id, "first question", &CancellationToken::new())
            .await
            .unwrap();

        let provider = ScriptedProvider::new(vec![text_response("second answer")]);
        coordinator(provider, sessions.clone())
            .run_task(&id, "second question", &CancellationToken::new())
            .await
            .unwrap();

        let session = sessions.load(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[0].content, "first question");
        assert_eq!(session.messages[2].content, "second question");
    }

    #[tokio::test]
    async fn fatal_model_error_still_persists_the_user_turn() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthFailed("no key".into()))]);
        let sessions = Arc::new(InMemorySessionStore::new());
        let coord = coordinator(provider, sessions.clone());
        let id = SessionId::new("s1");

        let outcome = coord
            .run_task(&id, "will fail", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::FatalError);
        let session = sessions.load(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "will fail");
    }
}
