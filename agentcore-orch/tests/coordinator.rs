use agentcore_context::{NoopMemorySink, SlidingWindow};
use agentcore_orch::{BroadcastEventSink, Coordinator, CoordinatorConfig, InMemorySessionStore};
use agentcore_provider::{
    ContentPart, Provider, ProviderError, ProviderRequest, ProviderResponse, StopReason as WireStop,
    TokenUsage,
};
use agentcore_tool::{NoopApprover, NoopBackupManager, ToolRegistry};
use agentcore_types::{SessionId, StopReason};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

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
    ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send {
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
            input_tokens: 10,
            output_tokens: 5,
            ..Default::default()
        },
        model: "scripted-model".into(),
        cost: None,
        truncated: None,
    })
}

fn coordinator(provider: ScriptedProvider) -> Coordinator<ScriptedProvider> {
    Coordinator::new(
        provider,
        Arc::new(ToolRegistry::new()),
        Arc::new(NoopApprover),
        Arc::new(NoopBackupManager),
        None,
        Arc::new(BroadcastEventSink::new(16)),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(SlidingWindow::new()),
        Arc::new(NoopMemorySink),
        CoordinatorConfig::default(),
    )
}

#[tokio::test]
async fn run_task_returns_final_answer() {
    let provider = ScriptedProvider::new(vec![text_response("The project is called X.")]);
    let coord = coordinator(provider);

    let outcome = coord
        .run_task(&SessionId::new("s1"), "what's this project?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FinalAnswer);
    assert_eq!(outcome.result.as_deref(), Some("The project is called X."));
}

#[tokio::test]
async fn run_task_reports_fatal_error_as_stop_reason_not_as_err() {
    let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthFailed("bad key".into()))]);
    let coord = coordinator(provider);

    // Per the propagation policy, engine-level fatal conditions are
    // surfaced as a structured stop reason, not a `Result::Err` out of
    // the coordinator.
    let outcome = coord
        .run_task(&SessionId::new("s1"), "hello", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FatalError);
    assert!(outcome.result.is_none());
}

#[tokio::test]
async fn cancelled_before_start_is_reported() {
    let provider = ScriptedProvider::new(vec![text_response("unreachable")]);
    let coord = coordinator(provider);
    let token = CancellationToken::new();
    token.cancel();

    let outcome = coord
        .run_task(&SessionId::new("s1"), "hello", &token)
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
}

#[tokio::test]
async fn usable_as_arc_for_concurrent_sessions() {
    let provider_a = ScriptedProvider::new(vec![text_response("answer a")]);
    let coord_a = Arc::new(coordinator(provider_a));
    let provider_b = ScriptedProvider::new(vec![text_response("answer b")]);
    let coord_b = Arc::new(coordinator(provider_b));

    let session_a = SessionId::new("a");
    let token_a = CancellationToken::new();
    let session_b = SessionId::new("b");
    let token_b = CancellationToken::new();
    let (a, b) = tokio::join!(
        coord_a.run_task(&session_a, "q-a", &token_a),
        coord_b.run_task(&session_b, "q-b", &token_b),
    );

    assert_eq!(a.unwrap().result.as_deref(), Some("answer a"));
    assert_eq!(b.unwrap().result.as_deref(), Some("answer b"));
}
