//! Progress notification port
//!
//! Workflow tools report one update per completed step. The session layer
//! forwards them to the client on the call's channel, ahead of the outcome.

use conduit_domain::CallId;

/// A single progress update for an in-flight call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub call_id: CallId,
    /// 1-based index of the step just completed
    pub step_index: usize,
    pub step_total: usize,
    pub note: String,
}

/// Callback for progress updates during a call
///
/// Must not block: implementations hand the update off (typically to a
/// channel) and return.
pub trait ProgressNotifier: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_progress(&self, _update: ProgressUpdate) {}
}
