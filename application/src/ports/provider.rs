//! Model provider port
//!
//! Defines the interface for the external model backends that tools and the
//! expert-analysis step call out to.

use async_trait::async_trait;
use conduit_domain::EffortLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors reported by a provider adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The provider gave up on its own before the caller's deadline.
    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider call cancelled")]
    Cancelled,
}

/// Generation parameters passed through to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<EffortLevel>,
    /// Fraction of the backend's maximum reasoning budget, in `(0, 1]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl GenerateParams {
    pub fn for_effort(effort: EffortLevel) -> Self {
        Self {
            effort: Some(effort),
            reasoning_fraction: Some(effort.reasoning_fraction()),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// One request to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub params: GenerateParams,
    /// Time left before the caller abandons the request.
    ///
    /// Set by the guard immediately before the call; adapters may pass it on
    /// to the backend but must not rely on it for enforcement.
    pub deadline: Duration,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: GenerateParams::default(),
            deadline: Duration::ZERO,
        }
    }

    pub fn with_params(mut self, params: GenerateParams) -> Self {
        self.params = params;
        self
    }
}

/// Gateway to a model backend
///
/// Implementations live in the infrastructure layer. `generate` is always
/// driven through [`ProviderCallGuard`](crate::execution::guard::ProviderCallGuard),
/// which enforces the deadline and drops the future once it is no longer
/// wanted. Adapters that hold external resources (child processes, sockets)
/// should release them on drop and may additionally watch `cancel`.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_for_effort() {
        let params = GenerateParams::for_effort(EffortLevel::High);
        assert_eq!(params.effort, Some(EffortLevel::High));
        assert_eq!(params.reasoning_fraction, Some(0.67));
        assert!(params.temperature.is_none());
    }

    #[test]
    fn test_params_skip_empty_fields() {
        let json = serde_json::to_value(GenerateParams::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
