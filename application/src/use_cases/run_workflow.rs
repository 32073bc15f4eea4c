//! Run a multi-step workflow tool.
//!
//! The runner owns the call's [`WorkflowState`] and drives the tool through
//! it: each step runs under a fresh workflow-step deadline, every completed
//! step is reported as progress, and an optional expert-analysis step runs
//! last under its own workflow-step deadline. Any failure or timeout moves
//! the state to a terminal phase and carries the findings so far.

use super::expert_analysis::ExpertAnalysisExecutor;
use super::registry::{HandlerError, HandlerFailure};
use crate::execution::ToolContext;
use crate::ports::tool::WorkflowTool;
use conduit_domain::{AnalysisContext, AnalysisResult, ToolCall, WorkflowState};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

pub struct RunWorkflowUseCase {
    analysis: ExpertAnalysisExecutor,
}

impl RunWorkflowUseCase {
    pub fn new(analysis: ExpertAnalysisExecutor) -> Self {
        Self { analysis }
    }

    pub async fn execute(
        &self,
        tool: &dyn WorkflowTool,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<Value, HandlerFailure> {
        let plan = tool.plan(call)?;
        let mut state = WorkflowState::new(
            call.call_id.clone(),
            plan.total_steps,
            plan.expert_analysis_required,
        );
        let total = state.total_steps();

        info!(
            call_id = %call.call_id,
            tool = tool.name(),
            total_steps = total,
            expert_analysis = plan.expert_analysis_required,
            "Starting workflow"
        );

        while !state.is_terminal() && !state.awaiting_expert_analysis() {
            let index = state.step_index() + 1;
            let deadline = ctx.step_deadline();

            let output = match ctx.bounded(deadline, tool.step(call, &state, ctx)).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Err(Self::abort(&mut state, ctx, e.into())),
                Err(e) => return Err(Self::abort(&mut state, ctx, e.into())),
            };

            let note = output.note;
            if let Err(e) = state.submit_step(&call.call_id, output.findings) {
                return Err(Self::abort(&mut state, ctx, e.into()));
            }
            ctx.record_diagnostics(state.diagnostics());
            ctx.report_progress(index, total, note);
            debug!(call_id = %call.call_id, step = index, total, "Workflow step complete");
        }

        let mut analysis: Option<AnalysisResult> = None;
        if state.awaiting_expert_analysis() {
            ctx.report_progress(total, total, "running expert analysis");

            let context = AnalysisContext::new(
                call.call_id.clone(),
                call.tool_name.clone(),
                tool.analysis_prompt(call, &state),
            )
            .with_requested_effort(call.requested_effort.clone());

            let result = match self
                .analysis
                .run(&context, ctx.step_deadline(), ctx.cancellation())
                .await
            {
                Ok(result) => result,
                Err(e) => return Err(Self::abort(&mut state, ctx, e.into())),
            };
            if let Err(e) = state.complete_expert_analysis(&call.call_id, result.text.clone()) {
                return Err(Self::abort(&mut state, ctx, e.into()));
            }
            analysis = Some(result);
        }

        let mut payload = tool.finish(call, &state);
        if let (Some(result), Value::Object(map)) = (&analysis, &mut payload) {
            map.insert(
                "analysis_effort".to_string(),
                json!({
                    "level": result.effort,
                    "fallback": result.effort_fallback,
                    "elapsed_ms": result.elapsed_ms,
                }),
            );
        }

        info!(call_id = %call.call_id, tool = tool.name(), "Workflow complete");
        Ok(payload)
    }

    /// Move `state` to its terminal phase for `error` and package the
    /// failure with the diagnostics gathered so far.
    fn abort(state: &mut WorkflowState, ctx: &ToolContext, error: HandlerError) -> HandlerFailure {
        let transition = match &error {
            HandlerError::Timeout { .. } => state.time_out(),
            other => state.fail(other.to_string()),
        };
        if let Err(e) = transition {
            debug!(call_id = %state.call_id(), "Workflow already terminal: {}", e);
        }

        warn!(
            call_id = %state.call_id(),
            phase = %state.phase(),
            completed_steps = state.step_index(),
            "Workflow stopped: {}",
            error
        );

        let diagnostics = state.diagnostics();
        ctx.record_diagnostics(diagnostics.clone());
        HandlerFailure::with_diagnostics(error, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ProviderCallGuard;
    use crate::test_support::{CollectingProgress, Script, ScriptedProvider, StepTool, context};
    use conduit_domain::{EffortLevel, TimeoutLayer};
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: Duration = Duration::from_secs(10);

    fn runner(provider: Arc<ScriptedProvider>) -> RunWorkflowUseCase {
        RunWorkflowUseCase::new(ExpertAnalysisExecutor::new(
            ProviderCallGuard::new(provider),
            None,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_report_progress_in_order() {
        let provider = ScriptedProvider::new(Script::Reply("unused"));
        let progress = Arc::new(CollectingProgress::default());
        let ctx = context("wf-1", BASE, provider.clone(), progress.clone());
        let call = ToolCall::new("wf-1", "steps").with_param("total_steps", 3);

        let payload = runner(provider.clone())
            .execute(&StepTool::default(), &call, &ctx)
            .await
            .unwrap();

        assert_eq!(payload["findings"], json!(["finding 1", "finding 2", "finding 3"]));
        assert!(payload.get("analysis_effort").is_none());
        let updates = progress.snapshot();
        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates.iter().map(|u| u.step_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(updates.iter().all(|u| u.step_total == 3 && u.call_id.as_str() == "wf-1"));
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expert_analysis_appended() {
        let provider = ScriptedProvider::new(Script::Reply("verdict"));
        let progress = Arc::new(CollectingProgress::default());
        let ctx = context("wf-2", BASE, provider.clone(), progress.clone());
        let call = ToolCall::new("wf-2", "steps")
            .with_param("total_steps", 2)
            .with_effort("medium");
        let tool = StepTool {
            expert: true,
            ..Default::default()
        };

        let payload = runner(provider).execute(&tool, &call, &ctx).await.unwrap();

        assert_eq!(payload["expert_analysis"], "verdict: finding 1; finding 2");
        assert_eq!(payload["analysis_effort"]["level"], json!(EffortLevel::Medium));
        assert_eq!(payload["analysis_effort"]["fallback"], false);
        assert_eq!(progress.snapshot().last().unwrap().note, "running expert analysis");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_analysis_times_out_at_step_layer() {
        let provider = ScriptedProvider::new(Script::Hang);
        let ctx = context("wf-3", BASE, provider.clone(), Arc::new(CollectingProgress::default()));
        let call = ToolCall::new("wf-3", "steps").with_param("total_steps", 3);
        let tool = StepTool {
            expert: true,
            ..Default::default()
        };
        let started = tokio::time::Instant::now();

        let failure = runner(provider).execute(&tool, &call, &ctx).await.unwrap_err();

        assert!(matches!(
            failure.error,
            HandlerError::Timeout { layer: TimeoutLayer::WorkflowStep, .. }
        ));
        assert_eq!(started.elapsed(), BASE);
        let diagnostics = failure.diagnostics.unwrap();
        assert_eq!(diagnostics.completed_steps, 3);
        assert_eq!(diagnostics.phase.as_deref(), Some("timed_out"));
        assert_eq!(diagnostics.findings.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_step_keeps_earlier_findings() {
        let provider = ScriptedProvider::new(Script::Reply("unused"));
        let ctx = context("wf-4", BASE, provider.clone(), Arc::new(CollectingProgress::default()));
        let call = ToolCall::new("wf-4", "steps").with_param("total_steps", 3);
        let tool = StepTool {
            fail_at: Some(2),
            ..Default::default()
        };

        let failure = runner(provider).execute(&tool, &call, &ctx).await.unwrap_err();

        assert_eq!(failure.error, HandlerError::ToolFailed("step 2 broke".into()));
        let diagnostics = failure.diagnostics.unwrap();
        assert_eq!(diagnostics.phase.as_deref(), Some("failed"));
        assert_eq!(diagnostics.findings, vec!["finding 1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_step_times_out_with_fresh_step_deadline() {
        let provider = ScriptedProvider::new(Script::Reply("unused"));
        let ctx = context("wf-5", BASE, provider.clone(), Arc::new(CollectingProgress::default()));
        let call = ToolCall::new("wf-5", "steps").with_param("total_steps", 3);
        let tool = StepTool {
            hang_at: Some(3),
            ..Default::default()
        };

        let failure = runner(provider).execute(&tool, &call, &ctx).await.unwrap_err();

        assert!(matches!(
            failure.error,
            HandlerError::Timeout { layer: TimeoutLayer::WorkflowStep, .. }
        ));
        assert_eq!(failure.diagnostics.unwrap().completed_steps, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_workflow() {
        let provider = ScriptedProvider::new(Script::Hang);
        let ctx = context("wf-6", BASE, provider.clone(), Arc::new(CollectingProgress::default()));
        let call = ToolCall::new("wf-6", "steps").with_param("total_steps", 1);
        let tool = StepTool {
            expert: true,
            ..Default::default()
        };
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let failure = runner(provider).execute(&tool, &call, &ctx).await.unwrap_err();

        assert_eq!(failure.error, HandlerError::Cancelled);
        assert_eq!(failure.diagnostics.unwrap().completed_steps, 1);
    }
}
