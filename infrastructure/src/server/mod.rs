//! Client-facing transport: framing, wire messages, admission control and
//! per-connection sessions.

pub mod error;
pub mod framing;
pub mod limits;
pub mod listener;
pub mod protocol;
pub mod session;

pub use error::SessionError;
pub use limits::{AdmissionError, ConcurrencyLimits};
pub use listener::{bind_and_serve, serve_stdio, serve_tcp};
pub use protocol::{CallRequest, OutboundMessage, OutcomeMessage};
pub use session::SessionManager;
