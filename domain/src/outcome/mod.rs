//! Outcome subdomain: the single terminal result of a tool call.

pub mod value_objects;

pub use value_objects::{Diagnostics, FailureKind, Outcome, OutcomeKind, OutcomeStatus};
