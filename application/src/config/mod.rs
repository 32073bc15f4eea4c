//! Application-level configuration.
//!
//! - [`CoreConfigBuilder`]: raw values as loaded
//! - [`CoreConfig`]: validated timeouts, effort default and limits

pub mod core_config;

pub use core_config::{CoreConfig, CoreConfigBuilder, CoreConfigError};
