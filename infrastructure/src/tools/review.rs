//! `review`: multi-step workflow with an optional expert-analysis finish.
//!
//! Parameters:
//! - `total_steps` (default 3)
//! - `findings`: one entry per step, recorded as that step's findings
//! - `use_expert_analysis` (default true)
//! - `focus`: optional subject line passed to the analysis prompt

use async_trait::async_trait;
use conduit_application::{StepOutput, ToolContext, ToolError, WorkflowPlan, WorkflowTool};
use conduit_domain::{ToolCall, WorkflowState};
use serde_json::{Value, json};

pub const REVIEW: &str = "review";

const DEFAULT_STEPS: u64 = 3;
const MAX_STEPS: u64 = 64;

pub struct ReviewTool;

impl ReviewTool {
    fn supplied_finding(call: &ToolCall, index: usize) -> Option<String> {
        let entry = call.parameters.get("findings")?.as_array()?.get(index)?;
        match entry {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[async_trait]
impl WorkflowTool for ReviewTool {
    fn name(&self) -> &str {
        REVIEW
    }

    fn description(&self) -> &str {
        "Record findings step by step, then ask the model for a final assessment"
    }

    fn plan(&self, call: &ToolCall) -> Result<WorkflowPlan, ToolError> {
        let total_steps = match call.parameters.get("total_steps") {
            None => DEFAULT_STEPS,
            Some(v) => v.as_u64().ok_or_else(|| {
                ToolError::InvalidInput("total_steps must be a positive integer".into())
            })?,
        };
        if total_steps == 0 || total_steps > MAX_STEPS {
            return Err(ToolError::InvalidInput(format!(
                "total_steps must be between 1 and {}",
                MAX_STEPS
            )));
        }

        Ok(WorkflowPlan {
            total_steps: total_steps as usize,
            expert_analysis_required: call.get_bool("use_expert_analysis").unwrap_or(true),
        })
    }

    async fn step(
        &self,
        call: &ToolCall,
        state: &WorkflowState,
        _ctx: &ToolContext,
    ) -> Result<StepOutput, ToolError> {
        let index = state.step_index();
        let findings = Self::supplied_finding(call, index)
            .unwrap_or_else(|| format!("step {}: no findings recorded", index + 1));
        Ok(StepOutput::new(findings))
    }

    fn analysis_prompt(&self, call: &ToolCall, state: &WorkflowState) -> String {
        let mut prompt = String::from("Review the findings below and give a final assessment.\n");
        if let Some(focus) = call.get_string("focus") {
            prompt.push_str(&format!("Focus: {}\n", focus));
        }
        prompt.push('\n');
        for (i, finding) in state.findings().iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, finding));
        }
        prompt
    }

    fn finish(&self, _call: &ToolCall, state: &WorkflowState) -> Value {
        json!({
            "findings": state.findings(),
            "expert_analysis": state.expert_analysis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_domain::CallId;

    fn call() -> ToolCall {
        ToolCall::new("r-1", REVIEW)
    }

    #[test]
    fn test_plan_defaults() {
        let plan = ReviewTool.plan(&call()).unwrap();
        assert_eq!(plan.total_steps, 3);
        assert!(plan.expert_analysis_required);
    }

    #[test]
    fn test_plan_rejects_bad_step_counts() {
        for bad in [json!(0), json!(-1), json!("three"), json!(MAX_STEPS + 1)] {
            let call = call().with_param("total_steps", bad);
            assert!(matches!(ReviewTool.plan(&call), Err(ToolError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_plan_without_expert_analysis() {
        let call = call().with_param("use_expert_analysis", false).with_param("total_steps", 2);
        let plan = ReviewTool.plan(&call).unwrap();
        assert_eq!(plan.total_steps, 2);
        assert!(!plan.expert_analysis_required);
    }

    #[test]
    fn test_analysis_prompt_lists_findings() {
        let call = call()
            .with_param("focus", "error handling")
            .with_param("findings", json!(["unwrap in parser", "missing timeout"]));
        let mut state = WorkflowState::new(CallId::new("r-1"), 2, true);
        state.submit_step(&call.call_id, "unwrap in parser").unwrap();
        state.submit_step(&call.call_id, "missing timeout").unwrap();

        let prompt = ReviewTool.analysis_prompt(&call, &state);
        assert!(prompt.contains("Focus: error handling"));
        assert!(prompt.contains("1. unwrap in parser"));
        assert!(prompt.contains("2. missing timeout"));
    }

    #[test]
    fn test_supplied_findings_by_index() {
        let call = call().with_param("findings", json!(["a", {"k": 1}]));
        assert_eq!(ReviewTool::supplied_finding(&call, 0).as_deref(), Some("a"));
        assert_eq!(ReviewTool::supplied_finding(&call, 1).as_deref(), Some(r#"{"k":1}"#));
        assert_eq!(ReviewTool::supplied_finding(&call, 2), None);
    }
}
