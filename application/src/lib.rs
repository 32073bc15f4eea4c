//! Application layer for conduit
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod execution;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{CoreConfig, CoreConfigBuilder, CoreConfigError};
pub use execution::{GuardError, LayerDeadline, ProviderCallGuard, ToolContext};
pub use ports::{
    audit_sink::{AuditSink, NoAuditSink},
    progress::{NoProgress, ProgressNotifier, ProgressUpdate},
    provider::{GenerateParams, ModelProvider, ProviderError, ProviderRequest},
    scorer::{OutcomeScorer, ScoreError},
    tool::{SimpleTool, StepOutput, ToolError, WorkflowPlan, WorkflowTool},
};
pub use use_cases::dispatch_call::{DispatchContext, RequestDispatcher};
pub use use_cases::expert_analysis::ExpertAnalysisExecutor;
pub use use_cases::observe_outcome::OutcomeObserver;
pub use use_cases::registry::{HandlerError, HandlerFailure, ToolHandler, ToolRegistry, ToolSummary};
pub use use_cases::run_workflow::RunWorkflowUseCase;
