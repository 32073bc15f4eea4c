//! Observation subdomain: post-hoc quality assessment and the audit record.

pub mod value_objects;

pub use value_objects::{Anomaly, AuditRecord, Correctness, Observation};
