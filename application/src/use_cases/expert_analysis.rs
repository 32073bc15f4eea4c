//! Expert analysis executor.
//!
//! Runs the closing analysis of a workflow against the provider at a
//! resolved [`EffortLevel`]. Effort selects how much reasoning the provider
//! spends; it never changes the deadline, which always comes from the
//! workflow-step layer.

use crate::execution::{GuardError, LayerDeadline, ProviderCallGuard};
use crate::ports::provider::{GenerateParams, ProviderRequest};
use conduit_domain::{AnalysisContext, AnalysisResult, EffortLevel};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ExpertAnalysisExecutor {
    guard: ProviderCallGuard,
    default_effort: Option<EffortLevel>,
}

impl ExpertAnalysisExecutor {
    pub fn new(guard: ProviderCallGuard, default_effort: Option<EffortLevel>) -> Self {
        Self {
            guard,
            default_effort,
        }
    }

    /// Run one expert analysis.
    ///
    /// An unrecognised per-call effort does not fail the call: it resolves to
    /// [`EffortLevel::Minimal`], logs a warning and marks the result.
    pub async fn run(
        &self,
        context: &AnalysisContext,
        deadline: LayerDeadline,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, GuardError> {
        let resolution = EffortLevel::resolve(context.requested_effort.as_deref(), self.default_effort);
        if let Some(warning) = &resolution.warning {
            warn!(call_id = %context.call_id, tool = %context.tool_name, "{}", warning);
        }

        info!(
            call_id = %context.call_id,
            effort = resolution.level.as_str(),
            source = ?resolution.source,
            remaining_ms = deadline.remaining().as_millis() as u64,
            "Running expert analysis"
        );

        let started = Instant::now();
        let request = ProviderRequest::new(context.prompt.clone())
            .with_params(GenerateParams::for_effort(resolution.level));
        let text = self.guard.generate(request, deadline, cancel).await?;

        Ok(AnalysisResult {
            text,
            effort: resolution.level,
            effort_fallback: resolution.fell_back(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
