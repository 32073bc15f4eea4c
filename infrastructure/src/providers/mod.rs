//! Model provider adapters

mod command;
mod unconfigured;

pub use command::CommandProvider;
pub use unconfigured::UnconfiguredProvider;

use crate::config::FileProviderConfig;
use conduit_application::ModelProvider;
use std::sync::Arc;
use tracing::info;

/// Provider selected by configuration.
pub fn provider_from_config(config: &FileProviderConfig) -> Arc<dyn ModelProvider> {
    match CommandProvider::from_config(config) {
        Some(provider) => {
            info!(provider = %provider.name(), "Using command provider");
            Arc::new(provider)
        }
        None => {
            info!("No model provider configured");
            Arc::new(UnconfiguredProvider)
        }
    }
}
