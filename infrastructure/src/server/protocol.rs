//! Wire messages exchanged with clients.
//!
//! Inbound frames carry one call each. Outbound frames are tagged with a
//! `type` field: `progress`, `outcome` or `error`.

use conduit_application::ProgressUpdate;
use conduit_domain::{CallId, Diagnostics, Outcome, OutcomeKind, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An inbound call as sent by the client
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub call_id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default)]
    pub effort: Option<String>,
}

impl CallRequest {
    /// Build the domain call, using `assigned` when the client sent no ID.
    pub fn into_call(self, assigned: impl FnOnce() -> String) -> ToolCall {
        let call_id = self
            .call_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(assigned);
        let mut call = ToolCall::new(call_id, self.tool_name).with_parameters(self.parameters);
        call.requested_effort = self.effort;
        call
    }
}

/// Outcome as delivered on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMessage {
    pub call_id: CallId,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_layer: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl From<&Outcome> for OutcomeMessage {
    fn from(outcome: &Outcome) -> Self {
        let mut msg = OutcomeMessage {
            call_id: outcome.call_id.clone(),
            status: outcome.status().as_str().to_string(),
            payload: None,
            error_kind: None,
            message: None,
            timeout_layer: None,
            elapsed_ms: outcome.elapsed_ms,
            diagnostics: outcome.diagnostics().cloned(),
        };
        match &outcome.kind {
            OutcomeKind::Success { payload } => msg.payload = Some(payload.clone()),
            OutcomeKind::Failure { kind, message, .. } => {
                msg.error_kind = Some(kind.as_str().to_string());
                msg.message = Some(message.clone());
            }
            OutcomeKind::Timeout { layer, .. } => {
                msg.timeout_layer = Some(layer.as_str().to_string());
            }
            OutcomeKind::Cancelled { reason, .. } => msg.message = Some(reason.clone()),
        }
        msg
    }
}

/// Any frame the server sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Progress {
        call_id: CallId,
        step_index: usize,
        step_total: usize,
        note: String,
    },
    Outcome(OutcomeMessage),
    /// The frame could not be read as a call at all.
    Error { message: String },
}

impl OutboundMessage {
    pub fn outcome(outcome: &Outcome) -> Self {
        OutboundMessage::Outcome(outcome.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutboundMessage::Error {
            message: message.into(),
        }
    }

    /// Call the message belongs to, if any.
    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            OutboundMessage::Progress { call_id, .. } => Some(call_id),
            OutboundMessage::Outcome(msg) => Some(&msg.call_id),
            OutboundMessage::Error { .. } => None,
        }
    }
}

impl From<ProgressUpdate> for OutboundMessage {
    fn from(update: ProgressUpdate) -> Self {
        OutboundMessage::Progress {
            call_id: update.call_id,
            step_index: update.step_index,
            step_total: update.step_total,
            note: update.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_domain::{FailureKind, TimeoutLayer};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_minimal_call() {
        let req: CallRequest = serde_json::from_value(json!({"tool_name": "echo"})).unwrap();
        let call = req.into_call(|| "assigned-1".to_string());

        assert_eq!(call.call_id.as_str(), "assigned-1");
        assert_eq!(call.tool_name, "echo");
        assert!(call.parameters.is_empty());
        assert!(call.requested_effort.is_none());
    }

    #[test]
    fn test_parse_full_call() {
        let req: CallRequest = serde_json::from_value(json!({
            "call_id": "c-7",
            "tool_name": "review",
            "parameters": {"total_steps": 2},
            "effort": "high"
        }))
        .unwrap();
        let call = req.into_call(|| unreachable!());

        assert_eq!(call.call_id.as_str(), "c-7");
        assert_eq!(call.get_u64("total_steps"), Some(2));
        assert_eq!(call.requested_effort.as_deref(), Some("high"));
    }

    #[test]
    fn test_blank_call_id_replaced() {
        let req: CallRequest =
            serde_json::from_value(json!({"call_id": "  ", "tool_name": "echo"})).unwrap();
        assert_eq!(req.into_call(|| "fresh".into()).call_id.as_str(), "fresh");
    }

    #[test]
    fn test_success_outcome_wire_shape() {
        let outcome = Outcome::success(CallId::new("c-1"), "echo", json!({"m": 1}), Duration::from_millis(12));
        let wire = serde_json::to_value(OutboundMessage::outcome(&outcome)).unwrap();

        assert_eq!(
            wire,
            json!({
                "type": "outcome",
                "call_id": "c-1",
                "status": "success",
                "payload": {"m": 1},
                "elapsed_ms": 12
            })
        );
    }

    #[test]
    fn test_failure_and_timeout_wire_shape() {
        let failure = Outcome::failure(CallId::new("c-2"), "x", FailureKind::Overloaded, "busy", Duration::ZERO);
        let wire = serde_json::to_value(OutboundMessage::outcome(&failure)).unwrap();
        assert_eq!(wire["status"], "failure");
        assert_eq!(wire["error_kind"], "overloaded");
        assert_eq!(wire["message"], "busy");

        let timeout = Outcome::timeout(CallId::new("c-3"), "review", TimeoutLayer::WorkflowStep, Duration::from_secs(10))
            .with_diagnostics(Diagnostics {
                phase: Some("timed_out".into()),
                completed_steps: 3,
                total_steps: 3,
                findings: vec!["a".into(), "b".into(), "c".into()],
            });
        let wire = serde_json::to_value(OutboundMessage::outcome(&timeout)).unwrap();
        assert_eq!(wire["status"], "timeout");
        assert_eq!(wire["timeout_layer"], "workflow-step");
        assert_eq!(wire["diagnostics"]["completed_steps"], 3);
        assert!(wire.get("payload").is_none());
    }

    #[test]
    fn test_progress_wire_shape() {
        let msg: OutboundMessage = ProgressUpdate {
            call_id: CallId::new("c-4"),
            step_index: 1,
            step_total: 3,
            note: "step 1".into(),
        }
        .into();

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "progress", "call_id": "c-4", "step_index": 1, "step_total": 3, "note": "step 1"})
        );
        assert_eq!(msg.call_id().unwrap().as_str(), "c-4");
    }
}
