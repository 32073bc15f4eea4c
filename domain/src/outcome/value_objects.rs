//! Outcome value objects
//!
//! An [`Outcome`] is produced exactly once per call. Timeouts are a distinct
//! variant rather than a failure kind, so a caller can tell "the system said
//! no" apart from "the system never answered".

use crate::call::value_objects::CallId;
use crate::timeout::TimeoutLayer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a failed call.
///
/// Every error that crosses a layer boundary is mapped onto one of these;
/// raw dependency errors never reach the caller unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No handler registered under the requested name
    UnknownTool,
    /// Workflow protocol violation by the caller
    InvalidStateTransition,
    /// The external provider reported an error
    ProviderError,
    /// Concurrency cap reached and the queueing deadline passed
    Overloaded,
    /// Malformed or duplicate call
    InvalidRequest,
    /// The tool rejected its input
    ToolError,
    /// The handler crashed
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::InvalidStateTransition => "invalid_state_transition",
            FailureKind::ProviderError => "provider_error",
            FailureKind::Overloaded => "overloaded",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::ToolError => "tool_error",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort evidence of work completed before a call stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Workflow phase at the time the call stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub completed_steps: usize,
    pub total_steps: usize,
    /// Findings accumulated so far, in step order
    #[serde(default)]
    pub findings: Vec<String>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.completed_steps == 0 && self.findings.is_empty()
    }
}

/// The variant-specific part of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeKind {
    Success {
        payload: serde_json::Value,
    },
    Failure {
        kind: FailureKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<Diagnostics>,
    },
    Timeout {
        layer: TimeoutLayer,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<Diagnostics>,
    },
    /// The call's consumer went away before it finished.
    Cancelled {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<Diagnostics>,
    },
}

/// Coarse status of an outcome, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Timeout,
    Cancelled,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
            OutcomeStatus::Timeout => "timeout",
            OutcomeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub call_id: CallId,
    pub tool_name: String,
    #[serde(flatten)]
    pub kind: OutcomeKind,
    /// Total time from dispatch to the outcome
    pub elapsed_ms: u64,
}

impl Outcome {
    pub fn success(call_id: CallId, tool_name: impl Into<String>, payload: serde_json::Value, elapsed: Duration) -> Self {
        Self::with_kind(call_id, tool_name, OutcomeKind::Success { payload }, elapsed)
    }

    pub fn failure(
        call_id: CallId,
        tool_name: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self::with_kind(
            call_id,
            tool_name,
            OutcomeKind::Failure {
                kind,
                message: message.into(),
                diagnostics: None,
            },
            elapsed,
        )
    }

    pub fn timeout(call_id: CallId, tool_name: impl Into<String>, layer: TimeoutLayer, elapsed: Duration) -> Self {
        Self::with_kind(
            call_id,
            tool_name,
            OutcomeKind::Timeout {
                layer,
                diagnostics: None,
            },
            elapsed,
        )
    }

    pub fn cancelled(call_id: CallId, tool_name: impl Into<String>, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self::with_kind(
            call_id,
            tool_name,
            OutcomeKind::Cancelled {
                reason: reason.into(),
                diagnostics: None,
            },
            elapsed,
        )
    }

    fn with_kind(call_id: CallId, tool_name: impl Into<String>, kind: OutcomeKind, elapsed: Duration) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            kind,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Attach diagnostics to a non-success outcome.
    ///
    /// Empty diagnostics are dropped; success outcomes are left untouched.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        if diagnostics.is_empty() && diagnostics.phase.is_none() {
            return self;
        }
        match &mut self.kind {
            OutcomeKind::Success { .. } => {}
            OutcomeKind::Failure { diagnostics: d, .. }
            | OutcomeKind::Timeout { diagnostics: d, .. }
            | OutcomeKind::Cancelled { diagnostics: d, .. } => *d = Some(diagnostics),
        }
        self
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.kind {
            OutcomeKind::Success { .. } => OutcomeStatus::Success,
            OutcomeKind::Failure { .. } => OutcomeStatus::Failure,
            OutcomeKind::Timeout { .. } => OutcomeStatus::Timeout,
            OutcomeKind::Cancelled { .. } => OutcomeStatus::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Success { .. })
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            OutcomeKind::Success { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.kind {
            OutcomeKind::Failure { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn timeout_layer(&self) -> Option<TimeoutLayer> {
        match self.kind {
            OutcomeKind::Timeout { layer, .. } => Some(layer),
            _ => None,
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match &self.kind {
            OutcomeKind::Success { .. } => None,
            OutcomeKind::Failure { diagnostics, .. }
            | OutcomeKind::Timeout { diagnostics, .. }
            | OutcomeKind::Cancelled { diagnostics, .. } => diagnostics.as_ref(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}
