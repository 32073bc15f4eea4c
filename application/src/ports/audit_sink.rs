//! Port for the audit trail.
//!
//! Every terminal outcome produces exactly one [`AuditRecord`], with or without
//! an attached observation. The sink is separate from `tracing`: tracing is
//! for operators, the audit trail is a machine-readable record per call.

use conduit_domain::AuditRecord;

/// Port for persisting audit records.
///
/// `record` is synchronous and non-fallible; sinks swallow their own I/O
/// errors so that auditing can never affect a call's result.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditSink;

impl AuditSink for NoAuditSink {
    fn record(&self, _record: AuditRecord) {}
}
