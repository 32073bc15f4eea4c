//! Timeout budget subdomain.
//!
//! Every call runs under four nested deadlines derived from one configured
//! base duration:
//!
//! ```text
//! session ─┬─ dispatch ─┬─ workflow-step ─┬─ provider-call
//!   2.0×B  │    1.5×B   │      1.0×B      │      0.9×B
//! ```
//!
//! An inner layer always fires before its parent, so the reported timeout
//! names the layer that actually stalled rather than the outermost backstop.

pub mod budget;

pub use budget::{BudgetError, TimeoutBudget, TimeoutLayer, TimeoutRatios};
