//! Outcome observer.
//!
//! Scores finished calls off the response path and writes the audit trail.
//! The scorer runs in its own task under a timeout, so a panicking or hung
//! scorer costs only its observation: the audit record is still written,
//! with `observation: None`.

use crate::ports::audit_sink::AuditSink;
use crate::ports::scorer::OutcomeScorer;
use conduit_domain::{AuditRecord, Observation, Outcome, ToolCall};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct OutcomeObserver {
    scorer: Option<Arc<dyn OutcomeScorer>>,
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
    tasks: TaskTracker,
}

impl OutcomeObserver {
    pub fn new(scorer: Arc<dyn OutcomeScorer>, sink: Arc<dyn AuditSink>, timeout: Duration) -> Self {
        Self {
            scorer: Some(scorer),
            sink,
            timeout,
            tasks: TaskTracker::new(),
        }
    }

    /// Audit without scoring.
    pub fn audit_only(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            scorer: None,
            sink,
            timeout: Duration::ZERO,
            tasks: TaskTracker::new(),
        }
    }

    /// Observe `outcome` in the background.
    ///
    /// Returns immediately; the handle is only for callers that want to wait
    /// for the audit record (tests, shutdown).
    pub fn observe(&self, call: ToolCall, outcome: Outcome) -> JoinHandle<()> {
        let this = self.clone();
        self.tasks.spawn(async move {
            let observation = this.score(call, &outcome).await;
            this.sink.record(AuditRecord::new(outcome, observation));
        })
    }

    /// Wait up to `within` for pending observations to be recorded.
    ///
    /// Returns `false` if some were still running when the wait ended.
    pub async fn drain(&self, within: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            info!(pending, "Waiting for pending audit records");
        }
        let drained = tokio::time::timeout(within, self.tasks.wait()).await.is_ok();
        self.tasks.reopen();
        drained
    }

    async fn score(&self, call: ToolCall, outcome: &Outcome) -> Option<Observation> {
        let scorer = Arc::clone(self.scorer.as_ref()?);
        let call_id = call.call_id.clone();
        let scored = outcome.clone();

        let mut task = tokio::spawn(async move { scorer.score(&call, &scored).await });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(observation))) => {
                debug!(call_id = %call_id, score = observation.score, "Outcome scored");
                Some(observation)
            }
            Ok(Ok(Err(e))) => {
                warn!(call_id = %call_id, "Scorer failed: {}", e);
                None
            }
            Ok(Err(e)) => {
                warn!(call_id = %call_id, "Scorer task aborted: {}", e);
                None
            }
            Err(_) => {
                task.abort();
                warn!(call_id = %call_id, timeout_ms = self.timeout.as_millis() as u64, "Scorer timed out");
                None
            }
        }
    }
}
