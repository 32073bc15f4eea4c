//! Outcome scoring port
//!
//! A scorer looks at a finished call and its outcome and produces an
//! [`Observation`]. Scorers run detached from the call; they may be slow,
//! fail or panic without any effect on the delivered outcome.

use async_trait::async_trait;
use conduit_domain::{Observation, Outcome, ToolCall};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait OutcomeScorer: Send + Sync {
    async fn score(&self, call: &ToolCall, outcome: &Outcome) -> Result<Observation, ScoreError>;
}
