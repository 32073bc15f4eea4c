//! Observation value objects

use crate::call::value_objects::CallId;
use crate::outcome::Outcome;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correctness verdict for an observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correctness {
    Correct,
    Incorrect,
    Uncertain,
}

impl fmt::Display for Correctness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Correctness::Correct => "correct",
            Correctness::Incorrect => "incorrect",
            Correctness::Uncertain => "uncertain",
        };
        f.write_str(s)
    }
}

/// Something unusual noticed about an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Stable identifier, e.g. `near_deadline`
    pub code: String,
    pub detail: String,
}

impl Anomaly {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// Quality assessment of one outcome.
///
/// Append-only: produced after the outcome exists and never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub call_id: CallId,
    /// Quality score in `[0.0, 1.0]`
    pub score: f64,
    pub correctness: Correctness,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    pub rationale: String,
    pub observed_at: u64,
}

impl Observation {
    /// Create an observation. The score is clamped into `[0.0, 1.0]`;
    /// a NaN score becomes `0.0`.
    pub fn new(call_id: CallId, score: f64, correctness: Correctness, rationale: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            call_id,
            score,
            correctness,
            anomalies: Vec::new(),
            rationale: rationale.into(),
            observed_at: now_millis(),
        }
    }

    pub fn with_anomaly(mut self, anomaly: Anomaly) -> Self {
        self.anomalies.push(anomaly);
        self
    }

    pub fn has_anomaly(&self, code: &str) -> bool {
        self.anomalies.iter().any(|a| a.code == code)
    }
}

/// The persisted record of one finished call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub call_id: CallId,
    pub tool_name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
}

impl AuditRecord {
    pub fn new(outcome: Outcome, observation: Option<Observation>) -> Self {
        Self {
            call_id: outcome.call_id.clone(),
            tool_name: outcome.tool_name.clone(),
            outcome,
            observation,
        }
    }
}
