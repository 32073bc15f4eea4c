//! Tool call entity

use super::value_objects::CallId;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One client-initiated request to execute a named tool.
///
/// `requested_effort` is kept exactly as the caller sent it. It is resolved
/// against the configured default only when an expert-analysis step runs, so
/// that an unrecognised value degrades to a warning instead of rejecting the
/// whole call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identity of this invocation
    pub call_id: CallId,
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Input parameters, opaque to the dispatch core
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    /// Effort level as requested by the caller, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_effort: Option<String>,
    /// Arrival time in milliseconds since the Unix epoch
    pub arrived_at: u64,
}

impl ToolCall {
    pub fn new(call_id: impl Into<CallId>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            parameters: HashMap::new(),
            requested_effort: None,
            arrived_at: now_millis(),
        }
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_effort(mut self, effort: impl Into<String>) -> Self {
        self.requested_effort = Some(effort.into());
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// Get an unsigned integer parameter
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(|v| v.as_u64())
    }

    /// Get a boolean parameter
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.parameters.get(key).and_then(|v| v.as_bool())
    }

    /// Parameters as a JSON object, for handlers that echo or forward them.
    pub fn parameters_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
