//! Core configuration: timeouts, effort default and concurrency limits.
//!
//! [`CoreConfigBuilder`] collects raw values (from files, env or tests) and
//! [`CoreConfigBuilder::build`] validates them once, at start-up. The
//! resulting [`CoreConfig`] is immutable and shared by every call.

use conduit_domain::{BudgetError, EffortLevel, TimeoutBudget, TimeoutLayer, TimeoutRatios};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreConfigError {
    #[error("Invalid timeout budget: {0}")]
    Budget(#[from] BudgetError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("limits.max_concurrent_per_channel ({per_channel}) exceeds limits.max_concurrent_total ({total})")]
    ChannelAboveTotal { per_channel: usize, total: usize },
}

/// Raw core settings before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfigBuilder {
    /// Base timeout for workflow tools; every layer is derived from it.
    pub base_timeout: Duration,
    pub ratios: TimeoutRatios,
    /// Absolute per-layer durations that replace the derived ones.
    pub overrides: BTreeMap<TimeoutLayer, Duration>,
    /// Effort used when a call does not request one.
    pub default_effort: Option<EffortLevel>,
    pub max_concurrent_per_channel: usize,
    pub max_concurrent_total: usize,
    /// How long a call may wait for an execution slot before `Overloaded`.
    pub queue_timeout: Duration,
    /// Ceiling on one observer run.
    pub observer_timeout: Duration,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self {
            base_timeout: Duration::from_secs(300),
            ratios: TimeoutRatios::default(),
            overrides: BTreeMap::new(),
            default_effort: None,
            max_concurrent_per_channel: 8,
            max_concurrent_total: 64,
            queue_timeout: Duration::from_secs(5),
            observer_timeout: Duration::from_secs(10),
        }
    }
}

impl CoreConfigBuilder {
    // ==================== Builder Methods ====================

    pub fn with_base_timeout(mut self, base: Duration) -> Self {
        self.base_timeout = base;
        self
    }

    pub fn with_ratios(mut self, ratios: TimeoutRatios) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_override(mut self, layer: TimeoutLayer, value: Duration) -> Self {
        self.overrides.insert(layer, value);
        self
    }

    pub fn with_default_effort(mut self, effort: Option<EffortLevel>) -> Self {
        self.default_effort = effort;
        self
    }

    pub fn with_max_concurrent_per_channel(mut self, max: usize) -> Self {
        self.max_concurrent_per_channel = max;
        self
    }

    pub fn with_max_concurrent_total(mut self, max: usize) -> Self {
        self.max_concurrent_total = max;
        self
    }

    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn with_observer_timeout(mut self, timeout: Duration) -> Self {
        self.observer_timeout = timeout;
        self
    }

    /// Validate and freeze.
    ///
    /// Layers are resolved outermost first. An overridden layer takes the
    /// given value; a derived layer is clamped to its already-resolved parent.
    /// The final budget is then checked for ordering, so only an explicit
    /// override can be rejected as inverted.
    pub fn build(self) -> Result<CoreConfig, CoreConfigError> {
        let derived = TimeoutBudget::derive(self.base_timeout, &self.ratios)?;
        let mut resolved: BTreeMap<TimeoutLayer, Duration> = BTreeMap::new();
        for layer in TimeoutLayer::ALL {
            let value = match self.overrides.get(&layer) {
                Some(value) => *value,
                None => {
                    let parent = layer.parent().and_then(|p| resolved.get(&p).copied());
                    parent.map_or(derived.get(layer), |p| derived.get(layer).min(p))
                }
            };
            resolved.insert(layer, value);
        }
        let layer = |l: TimeoutLayer| resolved.get(&l).copied().unwrap_or(derived.get(l));
        let budget = TimeoutBudget::from_layers(
            layer(TimeoutLayer::Session),
            layer(TimeoutLayer::Dispatch),
            layer(TimeoutLayer::WorkflowStep),
            layer(TimeoutLayer::ProviderCall),
        )?;

        if self.max_concurrent_per_channel == 0 {
            return Err(CoreConfigError::Zero("limits.max_concurrent_per_channel"));
        }
        if self.max_concurrent_total == 0 {
            return Err(CoreConfigError::Zero("limits.max_concurrent_total"));
        }
        if self.max_concurrent_per_channel > self.max_concurrent_total {
            return Err(CoreConfigError::ChannelAboveTotal {
                per_channel: self.max_concurrent_per_channel,
                total: self.max_concurrent_total,
            });
        }
        if self.queue_timeout.is_zero() {
            return Err(CoreConfigError::Zero("limits.queue_timeout"));
        }
        if self.observer_timeout.is_zero() {
            return Err(CoreConfigError::Zero("audit.observer_timeout"));
        }

        Ok(CoreConfig {
            budget,
            default_effort: self.default_effort,
            max_concurrent_per_channel: self.max_concurrent_per_channel,
            max_concurrent_total: self.max_concurrent_total,
            queue_timeout: self.queue_timeout,
            observer_timeout: self.observer_timeout,
        })
    }
}

/// Validated, immutable core configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    budget: TimeoutBudget,
    default_effort: Option<EffortLevel>,
    max_concurrent_per_channel: usize,
    max_concurrent_total: usize,
    queue_timeout: Duration,
    observer_timeout: Duration,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Budget applied to each call. `TimeoutBudget` is `Copy`, so every call
    /// gets its own value.
    pub fn budget(&self) -> TimeoutBudget {
        self.budget
    }

    pub fn default_effort(&self) -> Option<EffortLevel> {
        self.default_effort
    }

    pub fn max_concurrent_per_channel(&self) -> usize {
        self.max_concurrent_per_channel
    }

    pub fn max_concurrent_total(&self) -> usize {
        self.max_concurrent_total
    }

    pub fn queue_timeout(&self) -> Duration {
        self.queue_timeout
    }

    pub fn observer_timeout(&self) -> Duration {
        self.observer_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builds() {
        let config = CoreConfig::builder().build().unwrap();
        let budget = config.budget();

        assert_eq!(budget.workflow_step(), Duration::from_secs(300));
        assert_eq!(budget.dispatch(), Duration::from_secs(450));
        assert_eq!(budget.session(), Duration::from_secs(600));
        assert_eq!(budget.provider_call(), Duration::from_secs(270));
        assert!(config.default_effort().is_none());
    }

    #[test]
    fn test_override_applied() {
        let config = CoreConfig::builder()
            .with_base_timeout(Duration::from_secs(10))
            .with_override(TimeoutLayer::ProviderCall, Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.budget().provider_call(), Duration::from_secs(5));
        assert_eq!(config.budget().workflow_step(), Duration::from_secs(10));
    }

    #[test]
    fn test_overrides_checked_together() {
        let config = CoreConfig::builder()
            .with_base_timeout(Duration::from_secs(10))
            .with_override(TimeoutLayer::Session, Duration::from_secs(8))
            .with_override(TimeoutLayer::Dispatch, Duration::from_secs(6))
            .with_override(TimeoutLayer::WorkflowStep, Duration::from_secs(4))
            .build()
            .unwrap();

        assert_eq!(config.budget().session(), Duration::from_secs(8));
        assert_eq!(config.budget().provider_call(), Duration::from_secs(4));
    }

    #[test]
    fn test_inverted_override_rejected() {
        let err = CoreConfig::builder()
            .with_base_timeout(Duration::from_secs(10))
            .with_override(TimeoutLayer::ProviderCall, Duration::from_secs(60))
            .build()
            .unwrap_err();

        assert!(matches!(err, CoreConfigError::Budget(BudgetError::Inverted { .. })));
    }

    #[test]
    fn test_zero_base_rejected() {
        let err = CoreConfig::builder()
            .with_base_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, CoreConfigError::Budget(BudgetError::ZeroBase));
    }

    #[test]
    fn test_limits_validated() {
        let err = CoreConfig::builder()
            .with_max_concurrent_per_channel(0)
            .build()
            .unwrap_err();
        assert_eq!(err, CoreConfigError::Zero("limits.max_concurrent_per_channel"));

        let err = CoreConfig::builder()
            .with_max_concurrent_per_channel(10)
            .with_max_concurrent_total(4)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreConfigError::ChannelAboveTotal { .. }));
    }

    #[test]
    fn test_builder() {
        let config = CoreConfig::builder()
            .with_default_effort(Some(EffortLevel::High))
            .with_queue_timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.default_effort(), Some(EffortLevel::High));
        assert_eq!(config.queue_timeout(), Duration::from_millis(250));
    }
}
