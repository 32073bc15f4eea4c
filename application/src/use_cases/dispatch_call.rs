//! Request dispatcher.
//!
//! Turns one [`ToolCall`] into exactly one [`Outcome`]. The handler runs in
//! its own task under the dispatch deadline (nested in the session deadline
//! when the transport supplies one); expiry, cancellation or a panic in the
//! handler each end the call with a terminal outcome and abort the task.
//! Every outcome is handed to the observer after it is produced.

use super::expert_analysis::ExpertAnalysisExecutor;
use super::observe_outcome::OutcomeObserver;
use super::registry::{HandlerError, HandlerFailure, ToolRegistry};
use super::run_workflow::RunWorkflowUseCase;
use crate::config::CoreConfig;
use crate::execution::{LayerDeadline, ProviderCallGuard, ToolContext};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::provider::ModelProvider;
use conduit_domain::{
    Diagnostics, DomainError, FailureKind, Outcome, TimeoutLayer, ToolCall,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-call inputs supplied by the transport.
pub struct DispatchContext {
    pub progress: Arc<dyn ProgressNotifier>,
    /// Cancelled when the caller goes away
    pub cancel: CancellationToken,
    /// Session-layer deadline started when the call arrived
    pub session_deadline: Option<LayerDeadline>,
}

impl DispatchContext {
    /// No progress sink, a fresh token, no session deadline.
    pub fn detached() -> Self {
        Self {
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
            session_deadline: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_session_deadline(mut self, deadline: LayerDeadline) -> Self {
        self.session_deadline = Some(deadline);
        self
    }
}

/// How the handler task ended
enum Settled {
    Finished(Result<Value, HandlerFailure>),
    Interrupted(HandlerError),
    Crashed(&'static str),
}

pub struct RequestDispatcher {
    registry: Arc<ToolRegistry>,
    config: Arc<CoreConfig>,
    guard: ProviderCallGuard,
    workflows: Arc<RunWorkflowUseCase>,
    observer: OutcomeObserver,
}

impl RequestDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        config: Arc<CoreConfig>,
        provider: Arc<dyn ModelProvider>,
        observer: OutcomeObserver,
    ) -> Self {
        let guard = ProviderCallGuard::new(provider);
        let workflows = Arc::new(RunWorkflowUseCase::new(ExpertAnalysisExecutor::new(
            guard.clone(),
            config.default_effort(),
        )));
        Self {
            registry,
            config,
            guard,
            workflows,
            observer,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Wait for audit records of finished calls, bounded by `within`.
    pub async fn drain_observations(&self, within: Duration) -> bool {
        self.observer.drain(within).await
    }

    /// Run `call` to its terminal outcome and hand that outcome to the
    /// observer.
    pub async fn dispatch(&self, call: ToolCall, dctx: DispatchContext) -> Outcome {
        let outcome = self.run(&call, dctx).await;
        info!(
            call_id = %outcome.call_id,
            tool = %outcome.tool_name,
            status = outcome.status().as_str(),
            elapsed_ms = outcome.elapsed_ms,
            "Call finished"
        );
        self.settle(call, outcome.clone());
        outcome
    }

    /// Hand an outcome produced outside [`dispatch`](Self::dispatch)
    /// (overload, rejected request) to the observer.
    pub fn settle(&self, call: ToolCall, outcome: Outcome) -> JoinHandle<()> {
        self.observer.observe(call, outcome)
    }

    async fn run(&self, call: &ToolCall, dctx: DispatchContext) -> Outcome {
        let started = Instant::now();

        let Some(handler) = self.registry.get(&call.tool_name).cloned() else {
            warn!(call_id = %call.call_id, tool = %call.tool_name, "Unknown tool");
            return Outcome::failure(
                call.call_id.clone(),
                call.tool_name.clone(),
                FailureKind::UnknownTool,
                DomainError::UnknownTool(call.tool_name.clone()).to_string(),
                started.elapsed(),
            );
        };

        let budget = self.config.budget();
        let deadline = match &dctx.session_deadline {
            Some(session) => session.child(TimeoutLayer::Dispatch, budget.dispatch()),
            None => LayerDeadline::root(TimeoutLayer::Dispatch, budget.dispatch()),
        };

        let call_token = dctx.cancel.child_token();
        let ctx = ToolContext::new(
            call.call_id.clone(),
            budget,
            deadline,
            call_token.clone(),
            dctx.progress,
            self.guard.clone(),
        );
        let recorded = ctx.diagnostics_slot();

        info!(
            call_id = %call.call_id,
            tool = %call.tool_name,
            kind = handler.kind(),
            dispatch_ms = deadline.remaining().as_millis() as u64,
            "Dispatching call"
        );

        let workflows = Arc::clone(&self.workflows);
        let task_call = call.clone();
        let mut task = tokio::spawn(async move { handler.invoke(&task_call, &ctx, &workflows).await });

        let settled = tokio::select! {
            biased;
            _ = dctx.cancel.cancelled() => Settled::Interrupted(HandlerError::Cancelled),
            joined = &mut task => match joined {
                Ok(result) => Settled::Finished(result),
                Err(e) if e.is_panic() => Settled::Crashed("handler panicked"),
                Err(_) => Settled::Crashed("handler task aborted"),
            },
            _ = tokio::time::sleep_until(deadline.at()) => Settled::Interrupted(HandlerError::Timeout {
                layer: deadline.binding_layer(),
                after: deadline.span(),
            }),
        };

        call_token.cancel();
        task.abort();

        let elapsed = started.elapsed();
        let partial = recorded.lock().ok().and_then(|slot| slot.clone());

        match settled {
            Settled::Finished(Ok(payload)) => {
                Outcome::success(call.call_id.clone(), call.tool_name.clone(), payload, elapsed)
            }
            Settled::Finished(Err(failure)) => {
                let diagnostics = failure.diagnostics.or(partial);
                Self::failed(call, failure.error, diagnostics, elapsed)
            }
            Settled::Interrupted(error) => {
                warn!(call_id = %call.call_id, tool = %call.tool_name, "Abandoning handler: {}", error);
                Self::failed(call, error, partial, elapsed)
            }
            Settled::Crashed(reason) => {
                warn!(call_id = %call.call_id, tool = %call.tool_name, "{}", reason);
                Outcome::failure(
                    call.call_id.clone(),
                    call.tool_name.clone(),
                    FailureKind::Internal,
                    reason,
                    elapsed,
                )
            }
        }
    }

    fn failed(
        call: &ToolCall,
        error: HandlerError,
        diagnostics: Option<Diagnostics>,
        elapsed: Duration,
    ) -> Outcome {
        let id = call.call_id.clone();
        let tool = call.tool_name.clone();
        let outcome = match error {
            HandlerError::Timeout { layer, .. } => Outcome::timeout(id, tool, layer, elapsed),
            HandlerError::Cancelled => Outcome::cancelled(id, tool, "cancelled before completion", elapsed),
            HandlerError::InvalidInput(msg) => {
                Outcome::failure(id, tool, FailureKind::InvalidRequest, msg, elapsed)
            }
            HandlerError::ToolFailed(msg) => {
                Outcome::failure(id, tool, FailureKind::ToolError, msg, elapsed)
            }
            HandlerError::Protocol(e) => {
                Outcome::failure(id, tool, FailureKind::InvalidStateTransition, e.to_string(), elapsed)
            }
            HandlerError::Provider(e) => {
                Outcome::failure(id, tool, FailureKind::ProviderError, e.to_string(), elapsed)
            }
        };
        match diagnostics {
            Some(d) => outcome.with_diagnostics(d),
            None => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::audit_sink::AuditSink;
    use crate::ports::provider::GenerateParams;
    use crate::ports::scorer::{OutcomeScorer, ScoreError};
    use crate::ports::tool::{SimpleTool, ToolError};
    use crate::test_support::{
        CollectingProgress, EchoTool, PanickingTool, RecordingAuditSink, Script, ScriptedProvider,
        StepTool, StuckTool,
    };
    use async_trait::async_trait;
    use conduit_domain::{Observation, OutcomeStatus};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    const BASE: Duration = Duration::from_secs(10);

    /// Simple tool that forwards its prompt to the provider.
    struct AskTool;

    #[async_trait]
    impl SimpleTool for AskTool {
        fn name(&self) -> &str {
            "ask"
        }

        fn description(&self) -> &str {
            "Ask the provider"
        }

        async fn run(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
            let prompt = call.get_string("prompt").unwrap_or("hello");
            let text = ctx.generate(prompt, GenerateParams::default(), None).await?;
            Ok(json!({ "text": text }))
        }
    }

    struct PanickingScorer;

    #[async_trait]
    impl OutcomeScorer for PanickingScorer {
        async fn score(&self, _call: &ToolCall, _outcome: &Outcome) -> Result<Observation, ScoreError> {
            panic!("scorer bug")
        }
    }

    fn registry(expert: bool) -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::new()
                .register_simple(Arc::new(EchoTool))
                .register_simple(Arc::new(AskTool))
                .register_simple(Arc::new(StuckTool))
                .register_simple(Arc::new(PanickingTool))
                .register_workflow(Arc::new(StepTool {
                    expert,
                    ..Default::default()
                })),
        )
    }

    fn config() -> Arc<CoreConfig> {
        Arc::new(CoreConfig::builder().with_base_timeout(BASE).build().unwrap())
    }

    fn dispatcher(provider: Arc<ScriptedProvider>, sink: Arc<dyn AuditSink>) -> RequestDispatcher {
        RequestDispatcher::new(registry(true), config(), provider, OutcomeObserver::audit_only(sink))
    }

    /// Let detached observer tasks finish.
    async fn drain() {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_succeeds() {
        let sink = Arc::new(RecordingAuditSink::default());
        let d = dispatcher(ScriptedProvider::new(Script::Reply("x")), sink.clone());
        let call = ToolCall::new("c-1", "echo").with_param("message", "hi");

        let outcome = d.dispatch(call, DispatchContext::detached()).await;

        assert_eq!(outcome.status(), OutcomeStatus::Success);
        assert_eq!(outcome.call_id.as_str(), "c-1");
        assert_eq!(outcome.payload().unwrap()["message"], "hi");
        drain().await;
        assert_eq!(sink.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tool_fails_immediately() {
        let sink = Arc::new(RecordingAuditSink::default());
        let d = dispatcher(ScriptedProvider::new(Script::Reply("x")), sink.clone());

        let outcome = d
            .dispatch(ToolCall::new("c-2", "nope"), DispatchContext::detached())
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::UnknownTool));
        assert_eq!(outcome.elapsed(), Duration::ZERO);
        drain().await;
        assert_eq!(sink.snapshot()[0].outcome, outcome);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_expert_analysis_reports_workflow_step_timeout() {
        let provider = ScriptedProvider::new(Script::Hang);
        let progress = Arc::new(CollectingProgress::default());
        let d = dispatcher(provider.clone(), Arc::new(RecordingAuditSink::default()));
        let call = ToolCall::new("c-3", "steps").with_param("total_steps", 3);

        let outcome = d
            .dispatch(call, DispatchContext::detached().with_progress(progress.clone()))
            .await;

        assert_eq!(outcome.timeout_layer(), Some(TimeoutLayer::WorkflowStep));
        assert_eq!(outcome.elapsed(), BASE);
        let diagnostics = outcome.diagnostics().unwrap();
        assert_eq!(diagnostics.completed_steps, 3);
        assert_eq!(diagnostics.findings.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            progress.snapshot().iter().filter(|u| u.note.starts_with("finding")).count(),
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_handler_hits_dispatch_backstop() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Reply("x")),
            Arc::new(RecordingAuditSink::default()),
        );

        let outcome = d
            .dispatch(ToolCall::new("c-4", "stuck"), DispatchContext::detached())
            .await;

        assert_eq!(outcome.timeout_layer(), Some(TimeoutLayer::Dispatch));
        assert_eq!(outcome.elapsed(), BASE.mul_f64(1.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_deadline_binds_when_tighter() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Reply("x")),
            Arc::new(RecordingAuditSink::default()),
        );
        let session = LayerDeadline::root(TimeoutLayer::Session, Duration::from_secs(2));

        let outcome = d
            .dispatch(
                ToolCall::new("c-5", "stuck"),
                DispatchContext::detached().with_session_deadline(session),
            )
            .await;

        assert_eq!(outcome.timeout_layer(), Some(TimeoutLayer::Session));
        assert_eq!(outcome.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_classified() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Fail("quota exceeded")),
            Arc::new(RecordingAuditSink::default()),
        );

        let outcome = d
            .dispatch(ToolCall::new("c-6", "ask"), DispatchContext::detached())
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::ProviderError));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_in_simple_tool_times_out_at_provider_layer() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Hang),
            Arc::new(RecordingAuditSink::default()),
        );

        let outcome = d
            .dispatch(ToolCall::new("c-7", "ask"), DispatchContext::detached())
            .await;

        assert_eq!(outcome.timeout_layer(), Some(TimeoutLayer::ProviderCall));
        assert_eq!(outcome.elapsed(), BASE.mul_f64(0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_is_internal_failure() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Reply("x")),
            Arc::new(RecordingAuditSink::default()),
        );

        let outcome = d
            .dispatch(ToolCall::new("c-8", "panics"), DispatchContext::detached())
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Internal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_yields_cancelled_outcome() {
        let provider = ScriptedProvider::new(Script::Hang);
        let d = dispatcher(provider, Arc::new(RecordingAuditSink::default()));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let outcome = d
            .dispatch(
                ToolCall::new("c-9", "steps").with_param("total_steps", 2),
                DispatchContext::detached().with_cancellation(token),
            )
            .await;

        assert_eq!(outcome.status(), OutcomeStatus::Cancelled);
        assert_eq!(outcome.elapsed(), Duration::from_secs(1));
        assert_eq!(outcome.diagnostics().unwrap().completed_steps, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_effort_still_succeeds() {
        let d = dispatcher(
            ScriptedProvider::new(Script::Reply("ok")),
            Arc::new(RecordingAuditSink::default()),
        );
        let call = ToolCall::new("c-10", "steps")
            .with_param("total_steps", 1)
            .with_effort("ludicrous");

        let outcome = d.dispatch(call, DispatchContext::detached()).await;

        assert!(outcome.is_success());
        let payload = outcome.payload().unwrap();
        assert_eq!(payload["analysis_effort"]["level"], "minimal");
        assert_eq!(payload["analysis_effort"]["fallback"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_observer_does_not_change_outcome() {
        let sink = Arc::new(RecordingAuditSink::default());
        let observer = OutcomeObserver::new(Arc::new(PanickingScorer), sink.clone(), Duration::from_secs(1));
        let d = RequestDispatcher::new(
            registry(false),
            config(),
            ScriptedProvider::new(Script::Reply("x")),
            observer,
        );
        let call = ToolCall::new("c-11", "echo").with_param("message", "still here");

        let outcome = d.dispatch(call, DispatchContext::detached()).await;

        assert_eq!(outcome.payload().unwrap()["message"], "still here");
        drain().await;
        let records = sink.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, outcome);
        assert!(records[0].observation.is_none());
    }
}
