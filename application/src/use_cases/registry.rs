//! Tool registry.
//!
//! Maps tool names to handlers. Built once at start-up and shared read-only
//! by every session.

use super::run_workflow::RunWorkflowUseCase;
use crate::execution::{GuardError, ToolContext};
use crate::ports::provider::ProviderError;
use crate::ports::tool::{SimpleTool, ToolError, WorkflowTool};
use conduit_domain::{Diagnostics, DomainError, ToolCall, TimeoutLayer};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A registered tool handler.
#[derive(Clone)]
pub enum ToolHandler {
    Simple(Arc<dyn SimpleTool>),
    Workflow(Arc<dyn WorkflowTool>),
}

impl ToolHandler {
    pub fn name(&self) -> &str {
        match self {
            ToolHandler::Simple(tool) => tool.name(),
            ToolHandler::Workflow(tool) => tool.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ToolHandler::Simple(tool) => tool.description(),
            ToolHandler::Workflow(tool) => tool.description(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolHandler::Simple(_) => "simple",
            ToolHandler::Workflow(_) => "workflow",
        }
    }

    /// Run the handler to completion under `ctx`.
    ///
    /// Deadlines below the dispatch layer are enforced here (workflow steps,
    /// provider calls); the dispatch layer itself is enforced by the caller.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        workflows: &RunWorkflowUseCase,
    ) -> Result<Value, HandlerFailure> {
        match self {
            ToolHandler::Simple(tool) => tool.run(call, ctx).await.map_err(HandlerFailure::from),
            ToolHandler::Workflow(tool) => workflows.execute(tool.as_ref(), call, ctx).await,
        }
    }
}

/// Why a handler did not produce a payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    ToolFailed(String),

    #[error(transparent)]
    Protocol(DomainError),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("{layer} timeout after {after:?}")]
    Timeout { layer: TimeoutLayer, after: Duration },

    #[error("Cancelled")]
    Cancelled,
}

impl From<GuardError> for HandlerError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Timeout { layer, after } => HandlerError::Timeout { layer, after },
            GuardError::Provider(p) => HandlerError::Provider(p),
            GuardError::Cancelled => HandlerError::Cancelled,
        }
    }
}

impl From<ToolError> for HandlerError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::InvalidInput(msg) => HandlerError::InvalidInput(msg),
            ToolError::Failed(msg) => HandlerError::ToolFailed(msg),
            ToolError::Guard(g) => g.into(),
        }
    }
}

impl From<DomainError> for HandlerError {
    fn from(e: DomainError) -> Self {
        HandlerError::Protocol(e)
    }
}

/// A handler error together with whatever partial results exist.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFailure {
    pub error: HandlerError,
    pub diagnostics: Option<Diagnostics>,
}

impl HandlerFailure {
    pub fn with_diagnostics(error: impl Into<HandlerError>, diagnostics: Diagnostics) -> Self {
        Self {
            error: error.into(),
            diagnostics: Some(diagnostics),
        }
    }
}

impl From<HandlerError> for HandlerFailure {
    fn from(error: HandlerError) -> Self {
        Self {
            error,
            diagnostics: None,
        }
    }
}

impl From<ToolError> for HandlerFailure {
    fn from(e: ToolError) -> Self {
        HandlerError::from(e).into()
    }
}

impl From<GuardError> for HandlerFailure {
    fn from(e: GuardError) -> Self {
        HandlerError::from(e).into()
    }
}

impl From<DomainError> for HandlerFailure {
    fn from(e: DomainError) -> Self {
        HandlerError::from(e).into()
    }
}

/// Listing entry for a registered tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub kind: &'static str,
    pub description: String,
}

/// Name → handler table
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(mut self, handler: ToolHandler) -> Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn register_simple(self, tool: Arc<dyn SimpleTool>) -> Self {
        self.register(ToolHandler::Simple(tool))
    }

    pub fn register_workflow(self, tool: Arc<dyn WorkflowTool>) -> Self {
        self.register(ToolHandler::Workflow(tool))
    }

    pub fn get(&self, name: &str) -> Option<&ToolHandler> {
        self.handlers.get(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All registered tools, sorted by name.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        let mut list: Vec<ToolSummary> = self
            .handlers
            .values()
            .map(|h| ToolSummary {
                name: h.name().to_string(),
                kind: h.kind(),
                description: h.description().to_string(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}
