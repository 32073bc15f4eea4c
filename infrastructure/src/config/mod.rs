//! Configuration file loading for conduit
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CONDUIT_` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./conduit.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/conduit/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAnalysisConfig, FileAuditConfig, FileConfig, FileLimitsConfig,
    FileProviderConfig, FileServerConfig, FileTimeoutsConfig,
};
pub use loader::ConfigLoader;
