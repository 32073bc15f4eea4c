//! Workflow subdomain: state of a multi-step tool call.

pub mod state;

pub use state::{StepRecord, WorkflowPhase, WorkflowState};
