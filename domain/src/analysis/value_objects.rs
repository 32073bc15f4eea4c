//! Expert analysis inputs and outputs

use super::effort::EffortLevel;
use crate::call::value_objects::CallId;
use serde::{Deserialize, Serialize};

/// Everything the expert-analysis step needs to know about a workflow.
///
/// Built by the workflow tool from its accumulated state; the executor does
/// not interpret it beyond handing `prompt` to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub call_id: CallId,
    pub tool_name: String,
    /// Prompt to send to the provider
    pub prompt: String,
    /// Effort as requested by the caller, unresolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_effort: Option<String>,
}

impl AnalysisContext {
    pub fn new(call_id: CallId, tool_name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            prompt: prompt.into(),
            requested_effort: None,
        }
    }

    pub fn with_requested_effort(mut self, effort: Option<String>) -> Self {
        self.requested_effort = effort;
        self
    }
}

/// Output of a successful expert-analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub effort: EffortLevel,
    /// Whether the effort came from a fallback after an unrecognised value
    #[serde(default)]
    pub effort_fallback: bool,
    pub elapsed_ms: u64,
}
