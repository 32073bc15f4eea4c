//! `echo`: returns what it was given.

use async_trait::async_trait;
use conduit_application::{SimpleTool, ToolContext, ToolError};
use conduit_domain::ToolCall;
use serde_json::{Value, json};

pub const ECHO: &str = "echo";

pub struct EchoTool;

#[async_trait]
impl SimpleTool for EchoTool {
    fn name(&self) -> &str {
        ECHO
    }

    fn description(&self) -> &str {
        "Return parameters.message, or the whole parameter map when no message is given"
    }

    async fn run(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        match call.parameters.get("message") {
            Some(message) => Ok(json!({ "message": message })),
            None => Ok(call.parameters_json()),
        }
    }
}
