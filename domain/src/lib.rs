//! Domain layer for conduit
//!
//! This crate contains the core entities and value objects of the dispatch
//! engine. It has no dependencies on the async runtime, transports or
//! configuration files.
//!
//! # Core Concepts
//!
//! ## Calls and Outcomes
//!
//! - **ToolCall**: one request to run a named tool, immutable once received
//! - **Outcome**: the single terminal result of a call (success, failure,
//!   timeout or cancelled)
//!
//! ## Timeout Budget
//!
//! Four nested layers (session ⊇ dispatch ⊇ workflow-step ⊇ provider-call)
//! derived from one base duration, so the innermost stalled layer is always
//! the one reported.
//!
//! ## Workflows
//!
//! Multi-step tools tracked by [`WorkflowState`], optionally finished by an
//! expert-analysis step run at a selectable [`EffortLevel`].

pub mod analysis;
pub mod call;
pub mod core;
pub mod observation;
pub mod outcome;
pub mod timeout;
pub mod util;
pub mod workflow;

// Re-export commonly used types
pub use analysis::{AnalysisContext, AnalysisResult, EffortLevel, EffortResolution, EffortSource};
pub use call::{entities::ToolCall, value_objects::CallId};
pub use core::error::DomainError;
pub use observation::{Anomaly, AuditRecord, Correctness, Observation};
pub use outcome::{Diagnostics, FailureKind, Outcome, OutcomeKind, OutcomeStatus};
pub use timeout::{BudgetError, TimeoutBudget, TimeoutLayer, TimeoutRatios};
pub use workflow::{StepRecord, WorkflowPhase, WorkflowState};
