//! Execution primitives shared by every call: absolute layer deadlines, the
//! provider call guard and the per-call tool context.

pub mod context;
pub mod deadline;
pub mod guard;

pub use context::ToolContext;
pub use deadline::LayerDeadline;
pub use guard::{GuardError, ProviderCallGuard};
