//! Tool handler ports
//!
//! Two kinds of handler can be registered: a [`SimpleTool`] answers in one
//! shot, a [`WorkflowTool`] is driven step by step by the workflow runner and
//! may end with an expert-analysis step.

use crate::execution::{context::ToolContext, guard::GuardError};
use async_trait::async_trait;
use conduit_domain::{ToolCall, WorkflowState};
use serde_json::Value;
use thiserror::Error;

/// Errors a tool handler can return
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),

    /// A provider call made through the guard did not complete.
    #[error(transparent)]
    Guard(#[from] GuardError),
}

/// A tool that produces its payload in a single invocation
#[async_trait]
pub trait SimpleTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Shape of a workflow, decided from the call's parameters before any step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPlan {
    pub total_steps: usize,
    pub expert_analysis_required: bool,
}

/// Result of one workflow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub findings: String,
    /// Short text forwarded as the step's progress note
    pub note: String,
}

impl StepOutput {
    pub fn new(findings: impl Into<String>) -> Self {
        let findings = findings.into();
        Self {
            note: conduit_domain::util::preview(&findings, 80),
            findings,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// A multi-step tool
///
/// The runner owns the [`WorkflowState`]; the tool only sees it read-only and
/// reports what each step found.
#[async_trait]
pub trait WorkflowTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn plan(&self, call: &ToolCall) -> Result<WorkflowPlan, ToolError>;

    /// Run the next step. `state.step_index()` is the number of steps
    /// already completed.
    async fn step(
        &self,
        call: &ToolCall,
        state: &WorkflowState,
        ctx: &ToolContext,
    ) -> Result<StepOutput, ToolError>;

    /// Prompt for the expert-analysis step, built from accumulated findings.
    fn analysis_prompt(&self, call: &ToolCall, state: &WorkflowState) -> String;

    /// Build the success payload from the completed state.
    fn finish(&self, call: &ToolCall, state: &WorkflowState) -> Value;
}
