//! `chat`: one prompt, one model reply.

use async_trait::async_trait;
use conduit_application::{GenerateParams, SimpleTool, ToolContext, ToolError};
use conduit_domain::{EffortLevel, ToolCall};
use serde_json::{Value, json};
use tracing::warn;

pub const CHAT: &str = "chat";

pub struct ChatTool;

impl ChatTool {
    fn params(call: &ToolCall) -> GenerateParams {
        let mut params = match call.requested_effort.as_deref() {
            Some(raw) => match raw.parse::<EffortLevel>() {
                Ok(effort) => GenerateParams::for_effort(effort),
                Err(_) => {
                    warn!(call_id = %call.call_id, effort = raw, "Ignoring unknown effort for chat");
                    GenerateParams::default()
                }
            },
            None => GenerateParams::default(),
        };
        if let Some(temperature) = call.parameters.get("temperature").and_then(Value::as_f64) {
            params = params.with_temperature(temperature);
        }
        params
    }
}

#[async_trait]
impl SimpleTool for ChatTool {
    fn name(&self) -> &str {
        CHAT
    }

    fn description(&self) -> &str {
        "Send parameters.prompt to the model provider and return its reply"
    }

    async fn run(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        let prompt = call
            .get_string("prompt")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidInput("missing required parameter 'prompt'".into()))?;

        let reply = ctx.generate(prompt, Self::params(call), None).await?;
        Ok(json!({
            "reply": reply,
            "provider": ctx.guard().provider_name(),
        }))
    }
}
