//! Infrastructure layer for conduit
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer, the client-facing transport, and configuration file
//! loading.

pub mod config;
pub mod logging;
pub mod observer;
pub mod providers;
pub mod server;
pub mod tools;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::JsonlAuditSink;
pub use observer::HeuristicScorer;
pub use providers::{CommandProvider, UnconfiguredProvider, provider_from_config};
pub use server::{SessionError, SessionManager, bind_and_serve, serve_stdio, serve_tcp};
pub use tools::builtin_registry;
