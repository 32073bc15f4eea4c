//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the validated
//! [`CoreConfig`] once at start-up.

mod analysis;
mod audit;
mod limits;
mod provider;
mod server;
mod timeouts;

pub use analysis::FileAnalysisConfig;
pub use audit::FileAuditConfig;
pub use limits::FileLimitsConfig;
pub use provider::FileProviderConfig;
pub use server::FileServerConfig;
pub use timeouts::FileTimeoutsConfig;

use conduit_application::{CoreConfig, CoreConfigError};
use conduit_domain::{EffortLevel, TimeoutLayer};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("analysis.default_effort: unknown effort level '{0}'")]
    UnknownEffort(String),

    #[error("timeouts.overrides: unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("timeouts.overrides.{layer}: {value} is not a positive number of seconds")]
    InvalidOverride { layer: String, value: f64 },

    #[error("provider.command: program name cannot be empty")]
    EmptyProviderCommand,

    #[error(transparent)]
    Core(#[from] CoreConfigError),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub timeouts: FileTimeoutsConfig,
    pub limits: FileLimitsConfig,
    pub analysis: FileAnalysisConfig,
    pub audit: FileAuditConfig,
    pub provider: FileProviderConfig,
    pub server: FileServerConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.to_core_config().map(|_| ())
    }

    /// Convert into the immutable core configuration, validating every field.
    pub fn to_core_config(&self) -> Result<CoreConfig, ConfigValidationError> {
        if self.timeouts.base_secs == 0 {
            return Err(ConfigValidationError::ZeroValue("timeouts.base_secs"));
        }
        if self.limits.queue_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroValue("limits.queue_timeout_ms"));
        }
        if self.audit.observer_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroValue("audit.observer_timeout_ms"));
        }
        if let Some(program) = self.provider.command.first() {
            if program.trim().is_empty() {
                return Err(ConfigValidationError::EmptyProviderCommand);
            }
        }

        let default_effort = match self.analysis.default_effort.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<EffortLevel>()
                    .map_err(|_| ConfigValidationError::UnknownEffort(value.to_string()))?,
            ),
        };

        let mut builder = CoreConfig::builder()
            .with_base_timeout(Duration::from_secs(self.timeouts.base_secs))
            .with_ratios(self.timeouts.ratios)
            .with_default_effort(default_effort)
            .with_max_concurrent_per_channel(self.limits.max_concurrent_per_channel)
            .with_max_concurrent_total(self.limits.max_concurrent_total)
            .with_queue_timeout(Duration::from_millis(self.limits.queue_timeout_ms))
            .with_observer_timeout(Duration::from_millis(self.audit.observer_timeout_ms));

        for (name, secs) in &self.timeouts.overrides {
            let layer: TimeoutLayer = name
                .parse()
                .map_err(|_| ConfigValidationError::UnknownLayer(name.clone()))?;
            let value = Duration::try_from_secs_f64(*secs)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| ConfigValidationError::InvalidOverride {
                    layer: name.clone(),
                    value: *secs,
                })?;
            builder = builder.with_override(layer, value);
        }

        Ok(builder.build()?)
    }
}
