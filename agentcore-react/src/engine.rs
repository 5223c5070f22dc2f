//! The ReAct engine: drives one task to completion by iterating
//! think -> act -> observe, enforcing termination and reporting progress.

use crate::config::EngineConfig;
use crate::convert::{
    extract_embedded_tool_calls, extract_text, extract_tool_calls, messages_to_provider,
};
use crate::event::EventSink;
use agentcore_context::ContextManager;
use agentcore_cost::CostTracker;
use agentcore_provider::{
    CircuitBreaker, CircuitBreakerConfig, Provider, ProviderError, ProviderRequest, ProviderResponse,
    RetryConfig, ToolSchema, retry_with_backoff,
};
use agentcore_tool::{Executor, ToolRegistry};
use agentcore_types::{EngineEvent, Message, Role, SessionId, StopReason, TaskState};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn, Instrument};

enum IterationOutcome {
    Continue(TaskState),
    Done(SolveOutcome),
}

/// What happened after one call to [`StepDriver::step`].
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The loop has more iterations to run; the driver retains its state.
    Continue(TaskState),
    /// The task reached a terminal stop condition.
    Done(SolveOutcome),
}

enum StepDriverState {
    Running(TaskState),
    Finished(SolveOutcome),
}

/// Drives one task's ReAct loop one iteration at a time.
///
/// Built by [`ReactEngine::step_task`]. Unlike `solve_task`, the caller
/// regains control between iterations and may inspect or mutate `context`
/// (inject a message, adjust tool registration) before calling `step`
/// again. Calling `step` again after it has returned `Done` re-reports the
/// same outcome rather than restarting the task.
pub struct StepDriver<'a, P: Provider> {
    engine: &'a ReactEngine<P>,
    session_id: SessionId,
    state: StepDriverState,
}

impl<'a, P: Provider> StepDriver<'a, P> {
    /// Run exactly one more iteration of the loop. Once a prior call
    /// returned `Done`, further calls keep returning that same outcome
    /// without touching `context` or the provider again.
    pub async fn step(
        &mut self,
        context: &mut ContextManager,
        cancellation: &CancellationToken,
    ) -> StepOutcome {
        let state = match &self.state {
            StepDriverState::Running(state) => state.clone(),
            StepDriverState::Finished(outcome) => return StepOutcome::Done(outcome.clone()),
        };
        match self
            .engine
            .run_iteration(&self.session_id, state, context, cancellation)
            .await
        {
            IterationOutcome::Continue(next_state) => {
                self.state = StepDriverState::Running(next_state.clone());
                StepOutcome::Continue(next_state)
            }
            IterationOutcome::Done(outcome) => {
                self.state = StepDriverState::Finished(outcome.clone());
                StepOutcome::Done(outcome)
            }
        }
    }
}

/// The outcome of one `solve_task` invocation.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// The final answer text, present only when `stop_reason` is
    /// `FinalAnswer`.
    pub result: Option<String>,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Running statistics accumulated over the run.
    pub state: TaskState,
}

/// Drives the think -> act -> observe cycle for one task.
///
/// Generic over `P: Provider` — the provider trait uses RPITIT and is not
/// object-safe, so a distinct provider type means a distinct monomorphized
/// engine, matching the model-call layer's own design.
pub struct ReactEngine<P: Provider> {
    provider: P,
    retry_config: RetryConfig,
    circuit_breaker: CircuitBreaker,
    executor: Arc<Executor>,
    registry: Arc<ToolRegistry>,
    cost: Option<Arc<CostTracker>>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl<P: Provider> ReactEngine<P> {
    /// Build an engine over the given provider and collaborators.
    pub fn new(
        provider: P,
        executor: Arc<Executor>,
        registry: Arc<ToolRegistry>,
        cost: Option<Arc<CostTracker>>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            retry_config: RetryConfig::default(),
            circuit_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            executor,
            registry,
            cost,
            events,
            config,
        }
    }

    /// Override the retry schedule (default per `RetryConfig::default`).
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Override the circuit breaker thresholds (default per
    /// `CircuitBreakerConfig::default`).
    pub fn with_circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = CircuitBreaker::new(config);
        self
    }

    fn build_tool_schemas(&self) -> Vec<ToolSchema> {
        self.registry
            .list()
            .into_iter()
            .map(|metadata| ToolSchema {
                name: metadata.name,
                description: metadata.description,
                input_schema: metadata.parameter_schema,
            })
            .collect()
    }

    async fn finalize(
        &self,
        session_id: &SessionId,
        mut state: TaskState,
        stop_reason: StopReason,
        result: Option<String>,
    ) -> SolveOutcome {
        state.stop_reason = Some(stop_reason);
        self.events
            .emit(EngineEvent::TaskComplete {
                session_id: session_id.clone(),
                stop_reason,
            })
            .await;
        SolveOutcome {
            result,
            stop_reason,
            state,
        }
    }

    /// Run one task to completion (or to a terminal stop condition),
    /// appending every message it produces to `context`.
    ///
    /// Guarantees: at most `config.max_iterations` model calls; a
    /// non-`None` result only when `stop_reason` is `FinalAnswer`; every
    /// tool call issued within an iteration has a recorded result before
    /// the next iteration begins.
    pub async fn solve_task(
        &self,
        task: impl Into<String>,
        session_id: &SessionId,
        context: &mut ContextManager,
        cancellation: &CancellationToken,
    ) -> SolveOutcome {
        let history_index = context.get_prompt_messages().len();
        context.append(Message::new(Role::User, task.into()));
        let mut state = TaskState::starting_at(history_index);

        loop {
            match self.run_iteration(session_id, state, context, cancellation).await {
                IterationOutcome::Continue(next_state) => state = next_state,
                IterationOutcome::Done(outcome) => return outcome,
            }
        }
    }

    /// Begin a step-by-step run of one task: the caller drives iterations
    /// one at a time via [`StepDriver::step`], free to inspect or mutate
    /// `context` (or the tool registry) between calls. Additive sugar over
    /// [`Self::solve_task`] for callers that need to interleave their own
    /// logic with the loop rather than run it to completion in one await.
    pub fn step_task<'a>(
        &'a self,
        task: impl Into<String>,
        session_id: SessionId,
        context: &mut ContextManager,
    ) -> StepDriver<'a, P> {
        let history_index = context.get_prompt_messages().len();
        context.append(Message::new(Role::User, task.into()));
        StepDriver {
            engine: self,
            session_id,
            state: StepDriverState::Running(TaskState::starting_at(history_index)),
        }
    }

    async fn run_iteration(
        &self,
        session_id: &SessionId,
        mut state: TaskState,
        context: &mut ContextManager,
        cancellation: &CancellationToken,
    ) -> IterationOutcome {
        if cancellation.is_cancelled() {
            return IterationOutcome::Done(
                self.finalize(session_id, state, StopReason::Cancelled, None)
                    .await,
            );
        }

        let iteration = state.iteration;
        let span = info_span!("react.iteration", iteration);
        let _enter = span.enter();

        self.events
            .emit(EngineEvent::IterationStart {
                session_id: session_id.clone(),
                iteration,
            })
            .await;

        context.auto_compact().await;

        let prompt_messages = context.get_prompt_messages();
        let wire_messages = messages_to_provider(&prompt_messages);
        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages: wire_messages,
            tools: self.build_tool_schemas(),
            max_tokens: Some(self.config.max_tokens),
            temperature: None,
            system: Some(self.config.system_prompt.clone()),
            extra: serde_json::Value::Null,
        };

        drop(_enter);
        let response = tokio::select! {
            response = self.call_model(request) => response,
            _ = cancellation.cancelled() => {
                return IterationOutcome::Done(
                    self.finalize(session_id, state, StopReason::Cancelled, None).await,
                );
            }
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "model call failed permanently, stopping task");
                return IterationOutcome::Done(
                    self.finalize(session_id, state, StopReason::FatalError, None)
                        .await,
                );
            }
        };

        state.token_totals.input_tokens += response.usage.input_tokens;
        state.token_totals.output_tokens += response.usage.output_tokens;
        state.token_totals.cached_tokens += response.usage.cache_read_tokens.unwrap_or(0);

        if let Some(cost) = &self.cost {
            cost.record_usage(
                session_id.clone(),
                response.model.clone(),
                self.config.provider_name.clone(),
                response.usage.input_tokens,
                response.usage.output_tokens,
                response.usage.cache_read_tokens.unwrap_or(0),
            )
            .await;
        }

        let text = extract_text(&response.content);
        let mut tool_calls = extract_tool_calls(&response.content);
        if tool_calls.is_empty() {
            tool_calls = extract_embedded_tool_calls(&text);
        }

        if tool_calls.is_empty() {
            context.append(Message::new(Role::Assistant, text.clone()));
            return IterationOutcome::Done(
                self.finalize(session_id, state, StopReason::FinalAnswer, Some(text))
                    .await,
            );
        }

        context.append(
            Message::new(Role::Assistant, text).with_tool_calls(tool_calls.clone()),
        );

        for call in &tool_calls {
            self.events
                .emit(EngineEvent::ToolCallStart {
                    session_id: session_id.clone(),
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                })
                .await;
        }

        // `execute_many` races each call against `cancellation` internally
        // and always awaits every spawned task to completion, so this
        // drains the full set of results (real or cancelled) rather than
        // abandoning in-flight tool calls the way racing this await
        // against `cancellation.cancelled()` would.
        let results = self
            .executor
            .execute_many(&tool_calls, session_id.as_str(), cancellation)
            .await;
        if cancellation.is_cancelled() {
            return IterationOutcome::Done(
                self.finalize(session_id, state, StopReason::Cancelled, None).await,
            );
        }

        for result in &results {
            self.events
                .emit(EngineEvent::ToolCallEnd {
                    session_id: session_id.clone(),
                    tool_call_id: result.tool_call_id.clone(),
                    success: !result.is_error(),
                })
                .await;
            let content = match result.error {
                Some(_) => format!("[error] {}", result.output),
                None => result.output.clone(),
            };
            context.append(
                Message::new(Role::Tool, content)
                    .with_tool_call_id(result.tool_call_id.clone()),
            );
        }

        let all_permanently_errored = !results.is_empty()
            && results
                .iter()
                .all(|r| r.error.map(|k| k.is_permanent()).unwrap_or(false));
        if all_permanently_errored {
            return IterationOutcome::Done(
                self.finalize(session_id, state, StopReason::AllToolsErrored, None)
                    .await,
            );
        }

        state.iteration = iteration + 1;
        if state.iteration >= self.config.max_iterations {
            return IterationOutcome::Done(
                self.finalize(session_id, state, StopReason::MaxIterations, None)
                    .await,
            );
        }

        IterationOutcome::Continue(state)
    }

    async fn call_model(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if let Err(open) = self.circuit_breaker.before_call(Instant::now()) {
            return Err(ProviderError::Other(Box::new(open)));
        }
        let mut rng = rand::rng();
        let mut jitter_source = || rng.random_range(-1.0..=1.0);
        let result = retry_with_backoff(
            &self.retry_config,
            &mut jitter_source,
            |delay| tokio::time::sleep(delay),
            || self.provider.complete(request.clone()),
        )
        .instrument(info_span!("react.model_call"))
        .await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(_) => self.circuit_breaker.record_failure(Instant::now()),
        }
        result
    }
}
