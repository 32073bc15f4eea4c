//! Fakes shared by the unit tests of this crate.

use crate::tools::builtin_registry;
use async_trait::async_trait;
use conduit_application::{
    AuditSink, CoreConfig, LayerDeadline, ModelProvider, NoProgress, OutcomeObserver,
    ProviderCallGuard, ProviderError, ProviderRequest, RequestDispatcher, SimpleTool, ToolContext,
    ToolError,
};
use conduit_domain::{AuditRecord, CallId, TimeoutBudget, TimeoutLayer, TimeoutRatios, ToolCall};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Provider that always answers with the same text.
pub struct FixedProvider {
    reply: String,
}

impl FixedProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl ModelProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(
        &self,
        _request: ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<String, ProviderError> {
        Ok(self.reply.clone())
    }
}

/// Simple tool that sleeps for `parameters.ms` milliseconds.
pub struct SleepTool;

#[async_trait]
impl SimpleTool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Sleep for parameters.ms milliseconds"
    }

    async fn run(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let ms = call.get_u64("ms").unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

/// Simple tool that reports progress every millisecond and never finishes.
pub struct TickerTool;

#[async_trait]
impl SimpleTool for TickerTool {
    fn name(&self) -> &str {
        "ticker"
    }

    fn description(&self) -> &str {
        "Report progress until cut off"
    }

    async fn run(&self, _call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        for tick in 1.. {
            ctx.report_progress(tick, 0, "tick");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(Value::Null)
    }
}

pub fn context_with(call_id: &str, provider: Arc<dyn ModelProvider>) -> ToolContext {
    let budget = TimeoutBudget::derive(Duration::from_secs(10), &TimeoutRatios::default()).unwrap();
    ToolContext::new(
        CallId::new(call_id),
        budget,
        LayerDeadline::root(TimeoutLayer::Dispatch, budget.dispatch()),
        CancellationToken::new(),
        Arc::new(NoProgress),
        ProviderCallGuard::new(provider),
    )
}

pub fn context(call_id: &str) -> ToolContext {
    context_with(call_id, Arc::new(FixedProvider::new("reply")))
}

/// Dispatcher over the built-in tools plus `sleep` and `ticker`, auditing into `sink`.
pub fn dispatcher_with(config: CoreConfig, sink: Arc<RecordingAuditSink>) -> RequestDispatcher {
    let registry = builtin_registry()
        .register_simple(Arc::new(SleepTool))
        .register_simple(Arc::new(TickerTool));
    RequestDispatcher::new(
        Arc::new(registry),
        Arc::new(config),
        Arc::new(FixedProvider::new("looks fine")),
        OutcomeObserver::audit_only(sink),
    )
}
