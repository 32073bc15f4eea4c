//! Workflow state machine.
//!
//! Tracks a workflow tool through its declared steps and the optional
//! expert-analysis step that follows them.
//!
//! # State Transitions
//!
//! ```text
//! Pending ──> Stepping ──┬──> AwaitingExpertAnalysis ──┬──> Complete
//!               │  ▲     │                             ├──> Failed
//!               └──┘     └──> Complete                 └──> TimedOut
//! ```
//!
//! `Failed` and `TimedOut` are also reachable from `Pending` and `Stepping`
//! when a step itself fails or overruns. Terminal phases reject every further
//! transition; a workflow is never resumed.

use crate::call::value_objects::CallId;
use crate::core::error::DomainError;
use crate::outcome::Diagnostics;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Pending,
    Stepping,
    AwaitingExpertAnalysis,
    Complete,
    Failed,
    TimedOut,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Pending => "pending",
            WorkflowPhase::Stepping => "stepping",
            WorkflowPhase::AwaitingExpertAnalysis => "awaiting_expert_analysis",
            WorkflowPhase::Complete => "complete",
            WorkflowPhase::Failed => "failed",
            WorkflowPhase::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowPhase::Complete | WorkflowPhase::Failed | WorkflowPhase::TimedOut
        )
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step number
    pub step_index: usize,
    pub findings: String,
    pub recorded_at: u64,
}

/// Mutable state of one workflow execution.
///
/// Owned by the single task running the call; never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    call_id: CallId,
    phase: WorkflowPhase,
    steps: Vec<StepRecord>,
    total_steps: usize,
    findings: Vec<String>,
    expert_analysis_required: bool,
    expert_analysis: Option<String>,
    failure: Option<String>,
}

impl WorkflowState {
    /// Start a workflow for `call_id` with `total_steps` declared steps.
    ///
    /// A workflow always has at least one step.
    pub fn new(call_id: CallId, total_steps: usize, expert_analysis_required: bool) -> Self {
        Self {
            call_id,
            phase: WorkflowPhase::Pending,
            steps: Vec::new(),
            total_steps: total_steps.max(1),
            findings: Vec::new(),
            expert_analysis_required,
            expert_analysis: None,
            failure: None,
        }
    }

    fn reject(&self, attempted: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.phase,
            attempted,
        }
    }

    fn check_identity(&self, call_id: &CallId) -> Result<(), DomainError> {
        if call_id != &self.call_id {
            return Err(DomainError::CallIdentityMismatch {
                expected: self.call_id.to_string(),
                actual: call_id.to_string(),
            });
        }
        Ok(())
    }

    /// Record the next step's findings and advance.
    ///
    /// Returns the phase after the transition.
    pub fn submit_step(&mut self, call_id: &CallId, findings: impl Into<String>) -> Result<WorkflowPhase, DomainError> {
        match self.phase {
            WorkflowPhase::Pending | WorkflowPhase::Stepping => {}
            _ => return Err(self.reject("submit step")),
        }
        self.check_identity(call_id)?;
        if self.steps.len() >= self.total_steps {
            return Err(DomainError::StepOutOfRange {
                submitted: self.steps.len() + 1,
                total: self.total_steps,
            });
        }

        let findings = findings.into();
        let step_index = self.steps.len() + 1;
        if !findings.trim().is_empty() {
            self.findings.push(findings.trim().to_string());
        }
        self.steps.push(StepRecord {
            step_index,
            findings,
            recorded_at: now_millis(),
        });

        self.phase = if step_index < self.total_steps {
            WorkflowPhase::Stepping
        } else if self.expert_analysis_required && self.expert_analysis.is_none() {
            WorkflowPhase::AwaitingExpertAnalysis
        } else {
            WorkflowPhase::Complete
        };
        Ok(self.phase)
    }

    /// Record a successful expert analysis and complete the workflow.
    pub fn complete_expert_analysis(&mut self, call_id: &CallId, analysis: impl Into<String>) -> Result<WorkflowPhase, DomainError> {
        if self.phase != WorkflowPhase::AwaitingExpertAnalysis {
            return Err(self.reject("complete expert analysis"));
        }
        self.check_identity(call_id)?;
        self.expert_analysis = Some(analysis.into());
        self.phase = WorkflowPhase::Complete;
        Ok(self.phase)
    }

    /// Move to `Failed` after a non-timeout error.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<WorkflowPhase, DomainError> {
        if self.phase.is_terminal() {
            return Err(self.reject("fail"));
        }
        self.failure = Some(reason.into());
        self.phase = WorkflowPhase::Failed;
        Ok(self.phase)
    }

    /// Move to `TimedOut` after a deadline expired.
    pub fn time_out(&mut self) -> Result<WorkflowPhase, DomainError> {
        if self.phase.is_terminal() {
            return Err(self.reject("time out"));
        }
        self.phase = WorkflowPhase::TimedOut;
        Ok(self.phase)
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn awaiting_expert_analysis(&self) -> bool {
        self.phase == WorkflowPhase::AwaitingExpertAnalysis
    }

    /// Number of completed steps, which is also the index of the next step.
    pub fn step_index(&self) -> usize {
        self.steps.len()
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    pub fn expert_analysis_required(&self) -> bool {
        self.expert_analysis_required
    }

    pub fn expert_analysis(&self) -> Option<&str> {
        self.expert_analysis.as_deref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Evidence of the work done so far, for failure and timeout outcomes.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            phase: Some(self.phase.to_string()),
            completed_steps: self.steps.len(),
            total_steps: self.total_steps,
            findings: self.findings.clone(),
        }
    }
}
