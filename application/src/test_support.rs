//! Fakes shared by the unit tests of this crate.

use crate::execution::{LayerDeadline, ProviderCallGuard, ToolContext};
use crate::ports::audit_sink::AuditSink;
use crate::ports::progress::{ProgressNotifier, ProgressUpdate};
use crate::ports::provider::{ModelProvider, ProviderError, ProviderRequest};
use crate::ports::tool::{SimpleTool, StepOutput, ToolError, WorkflowPlan, WorkflowTool};
use async_trait::async_trait;
use conduit_domain::{AuditRecord, CallId, TimeoutBudget, TimeoutLayer, TimeoutRatios, ToolCall, WorkflowState};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the scripted provider answers.
#[derive(Clone)]
pub enum Script {
    Reply(&'static str),
    Hang,
    Fail(&'static str),
}

pub struct ScriptedProvider {
    script: Script,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(text) => Ok(format!("{text}: {}", request.prompt)),
            Script::Hang => std::future::pending().await,
            Script::Fail(msg) => Err(ProviderError::RequestFailed(msg.to_string())),
        }
    }
}

#[derive(Default)]
pub struct CollectingProgress {
    pub updates: Mutex<Vec<ProgressUpdate>>,
}

impl CollectingProgress {
    pub fn snapshot(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressNotifier for CollectingProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

#[derive(Default)]
pub struct RecordingAuditSink {
    pub records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Simple tool that returns its `message` parameter.
pub struct EchoTool;

#[async_trait]
impl SimpleTool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the message parameter"
    }

    async fn run(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(json!({ "message": call.get_string("message").unwrap_or_default() }))
    }
}

/// Simple tool whose handler never finishes.
pub struct StuckTool;

#[async_trait]
impl SimpleTool for StuckTool {
    fn name(&self) -> &str {
        "stuck"
    }

    fn description(&self) -> &str {
        "Never returns"
    }

    async fn run(&self, _call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        std::future::pending().await
    }
}

/// Simple tool that panics.
pub struct PanickingTool;

#[async_trait]
impl SimpleTool for PanickingTool {
    fn name(&self) -> &str {
        "panics"
    }

    fn description(&self) -> &str {
        "Panics when run"
    }

    async fn run(&self, _call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        panic!("handler bug")
    }
}

/// Workflow whose steps succeed instantly, except `fail_at` / `hang_at`
/// (1-based) when set.
#[derive(Default)]
pub struct StepTool {
    pub expert: bool,
    pub fail_at: Option<usize>,
    pub hang_at: Option<usize>,
}

#[async_trait]
impl WorkflowTool for StepTool {
    fn name(&self) -> &str {
        "steps"
    }

    fn description(&self) -> &str {
        "Counts through its steps"
    }

    fn plan(&self, call: &ToolCall) -> Result<WorkflowPlan, ToolError> {
        Ok(WorkflowPlan {
            total_steps: call.get_u64("total_steps").unwrap_or(3) as usize,
            expert_analysis_required: self.expert,
        })
    }

    async fn step(
        &self,
        _call: &ToolCall,
        state: &WorkflowState,
        _ctx: &ToolContext,
    ) -> Result<StepOutput, ToolError> {
        let index = state.step_index() + 1;
        if self.hang_at == Some(index) {
            std::future::pending::<()>().await;
        }
        if self.fail_at == Some(index) {
            return Err(ToolError::Failed(format!("step {index} broke")));
        }
        Ok(StepOutput::new(format!("finding {index}")))
    }

    fn analysis_prompt(&self, _call: &ToolCall, state: &WorkflowState) -> String {
        state.findings().join("; ")
    }

    fn finish(&self, _call: &ToolCall, state: &WorkflowState) -> Value {
        json!({
            "findings": state.findings(),
            "expert_analysis": state.expert_analysis(),
        })
    }
}

pub fn budget(base: Duration) -> TimeoutBudget {
    TimeoutBudget::derive(base, &TimeoutRatios::default()).unwrap()
}

pub fn context(
    call_id: &str,
    base: Duration,
    provider: Arc<dyn ModelProvider>,
    progress: Arc<dyn ProgressNotifier>,
) -> ToolContext {
    let budget = budget(base);
    ToolContext::new(
        CallId::new(call_id),
        budget,
        LayerDeadline::root(TimeoutLayer::Dispatch, budget.dispatch()),
        CancellationToken::new(),
        progress,
        ProviderCallGuard::new(provider),
    )
}
