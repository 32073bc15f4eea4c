//! Domain error types

use crate::workflow::state::WorkflowPhase;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid state transition: cannot {attempted} from {from}")]
    InvalidStateTransition {
        from: WorkflowPhase,
        attempted: &'static str,
    },

    #[error("Call identity mismatch: workflow belongs to {expected}, step submitted for {actual}")]
    CallIdentityMismatch { expected: String, actual: String },

    #[error("Step {submitted} exceeds declared total of {total} steps")]
    StepOutOfRange { submitted: usize, total: usize },
}
