//! Logging infrastructure: the audit trail.
//!
//! Provides [`JsonlAuditSink`], a JSONL file writer that implements
//! the [`AuditSink`](conduit_application::AuditSink) port.

mod jsonl_audit;

pub use jsonl_audit::JsonlAuditSink;
