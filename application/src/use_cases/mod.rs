//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch_call;
pub mod expert_analysis;
pub mod observe_outcome;
pub mod registry;
pub mod run_workflow;
