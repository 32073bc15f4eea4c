//! Per-call execution context handed to tool handlers.

use super::deadline::LayerDeadline;
use super::guard::{self, GuardError, ProviderCallGuard};
use crate::ports::progress::{ProgressNotifier, ProgressUpdate};
use crate::ports::provider::{GenerateParams, ProviderRequest};
use conduit_domain::{CallId, Diagnostics, TimeoutBudget, TimeoutLayer};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Everything a handler needs to run one call: its budget, the dispatch
/// deadline, the cancellation token, a progress sink and the provider guard.
///
/// A context belongs to exactly one call and is never shared across calls.
pub struct ToolContext {
    call_id: CallId,
    budget: TimeoutBudget,
    dispatch_deadline: LayerDeadline,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressNotifier>,
    guard: ProviderCallGuard,
    diagnostics: Arc<Mutex<Option<Diagnostics>>>,
}

impl ToolContext {
    pub fn new(
        call_id: CallId,
        budget: TimeoutBudget,
        dispatch_deadline: LayerDeadline,
        cancel: CancellationToken,
        progress: Arc<dyn ProgressNotifier>,
        guard: ProviderCallGuard,
    ) -> Self {
        Self {
            call_id,
            budget,
            dispatch_deadline,
            cancel,
            progress,
            guard,
            diagnostics: Arc::new(Mutex::new(None)),
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn budget(&self) -> &TimeoutBudget {
        &self.budget
    }

    pub fn dispatch_deadline(&self) -> LayerDeadline {
        self.dispatch_deadline
    }

    /// Fresh deadline for one workflow step, starting now.
    pub fn step_deadline(&self) -> LayerDeadline {
        self.dispatch_deadline
            .child(TimeoutLayer::WorkflowStep, self.budget.workflow_step())
    }

    /// Fresh provider-call deadline nested in `parent`, or in the dispatch
    /// deadline when the caller is not inside a workflow step.
    pub fn provider_deadline(&self, parent: Option<&LayerDeadline>) -> LayerDeadline {
        parent
            .unwrap_or(&self.dispatch_deadline)
            .child(TimeoutLayer::ProviderCall, self.budget.provider_call())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn guard(&self) -> &ProviderCallGuard {
        &self.guard
    }

    /// Send a prompt to the provider under a fresh provider-call deadline.
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        params: GenerateParams,
        parent: Option<&LayerDeadline>,
    ) -> Result<String, GuardError> {
        let deadline = self.provider_deadline(parent);
        let request = ProviderRequest::new(prompt).with_params(params);
        self.guard.generate(request, deadline, &self.cancel).await
    }

    /// Run arbitrary handler work under `deadline` and this call's token.
    pub async fn bounded<T, Fut>(&self, deadline: LayerDeadline, work: Fut) -> Result<T, GuardError>
    where
        Fut: Future<Output = T>,
    {
        guard::bounded(deadline, &self.cancel, |_| async move { Ok(work.await) }).await
    }

    pub fn report_progress(&self, step_index: usize, step_total: usize, note: impl Into<String>) {
        self.progress.on_progress(ProgressUpdate {
            call_id: self.call_id.clone(),
            step_index,
            step_total,
            note: note.into(),
        });
    }

    /// Publish the latest partial results of the call.
    ///
    /// The dispatcher reads this back when it has to abandon the handler, so
    /// an outer-layer timeout still carries the findings gathered so far.
    pub fn record_diagnostics(&self, diagnostics: Diagnostics) {
        if let Ok(mut slot) = self.diagnostics.lock() {
            *slot = Some(diagnostics);
        }
    }

    pub(crate) fn diagnostics_slot(&self) -> Arc<Mutex<Option<Diagnostics>>> {
        Arc::clone(&self.diagnostics)
    }
}
