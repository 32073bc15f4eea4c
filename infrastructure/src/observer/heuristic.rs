//! Rule-based outcome scorer.
//!
//! Scores from the outcome alone, without asking a model. Runs in well under
//! a millisecond, so it is the default scorer for the observer.

use async_trait::async_trait;
use conduit_application::{OutcomeScorer, ScoreError};
use conduit_domain::{
    Anomaly, Correctness, EffortLevel, FailureKind, Observation, Outcome, OutcomeKind, ToolCall,
};
use serde_json::Value;
use std::time::Duration;

/// Share of the dispatch budget above which a call counts as near its deadline.
const NEAR_DEADLINE_FRACTION: f64 = 0.8;

pub const EMPTY_PAYLOAD: &str = "empty_payload";
pub const NEAR_DEADLINE: &str = "near_deadline";
pub const EFFORT_FALLBACK: &str = "effort_fallback";

pub struct HeuristicScorer {
    dispatch_budget: Duration,
}

impl HeuristicScorer {
    pub fn new(dispatch_budget: Duration) -> Self {
        Self { dispatch_budget }
    }

    fn is_empty(payload: &Value) -> bool {
        match payload {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        }
    }

    fn effort_fell_back(call: &ToolCall, outcome: &Outcome) -> bool {
        let flagged = outcome
            .payload()
            .and_then(|p| p.pointer("/analysis_effort/fallback"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let unparseable = call
            .requested_effort
            .as_deref()
            .is_some_and(|raw| raw.parse::<EffortLevel>().is_err());
        flagged || unparseable
    }

    fn anomalies(&self, call: &ToolCall, outcome: &Outcome) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        if outcome.payload().is_some_and(Self::is_empty) {
            anomalies.push(Anomaly::new(EMPTY_PAYLOAD, "success with an empty payload"));
        }

        let limit = self.dispatch_budget.mul_f64(NEAR_DEADLINE_FRACTION);
        if outcome.is_success() && outcome.elapsed() > limit {
            anomalies.push(Anomaly::new(
                NEAR_DEADLINE,
                format!(
                    "took {}ms of a {}ms dispatch budget",
                    outcome.elapsed_ms,
                    self.dispatch_budget.as_millis()
                ),
            ));
        }

        if Self::effort_fell_back(call, outcome) {
            let requested = call.requested_effort.as_deref().unwrap_or("<none>");
            anomalies.push(Anomaly::new(
                EFFORT_FALLBACK,
                format!("requested effort '{}' was not recognised", requested),
            ));
        }

        anomalies
    }

    fn verdict(outcome: &Outcome) -> (f64, Correctness, String) {
        match &outcome.kind {
            OutcomeKind::Success { payload } if Self::is_empty(payload) => {
                (0.5, Correctness::Uncertain, "succeeded without content".into())
            }
            OutcomeKind::Success { .. } => (1.0, Correctness::Correct, "succeeded".into()),
            OutcomeKind::Failure { kind, message, .. } => {
                // Caller or tool mistakes are wrong answers; infrastructure trouble says
                // nothing about the tool
                let correctness = match kind {
                    FailureKind::UnknownTool
                    | FailureKind::InvalidRequest
                    | FailureKind::InvalidStateTransition
                    | FailureKind::ToolError => Correctness::Incorrect,
                    FailureKind::ProviderError | FailureKind::Overloaded | FailureKind::Internal => {
                        Correctness::Uncertain
                    }
                };
                (0.0, correctness, format!("failed ({}): {}", kind, message))
            }
            OutcomeKind::Timeout { layer, diagnostics } => {
                let partial = diagnostics
                    .as_ref()
                    .filter(|d| d.total_steps > 0)
                    .map(|d| d.completed_steps as f64 / d.total_steps as f64 * 0.5)
                    .unwrap_or(0.0);
                (partial, Correctness::Uncertain, format!("timed out at the {} layer", layer))
            }
            OutcomeKind::Cancelled { reason, .. } => {
                (0.0, Correctness::Uncertain, format!("cancelled: {}", reason))
            }
        }
    }
}

#[async_trait]
impl OutcomeScorer for HeuristicScorer {
    async fn score(&self, call: &ToolCall, outcome: &Outcome) -> Result<Observation, ScoreError> {
        let (mut score, correctness, rationale) = Self::verdict(outcome);
        let anomalies = self.anomalies(call, outcome);
        for anomaly in &anomalies {
            match anomaly.code.as_str() {
                NEAR_DEADLINE => score -= 0.2,
                EFFORT_FALLBACK => score -= 0.1,
                _ => {}
            }
        }

        let observation = anomalies.into_iter().fold(
            Observation::new(outcome.call_id.clone(), score, correctness, rationale),
            Observation::with_anomaly,
        );
        Ok(observation)
    }
}
