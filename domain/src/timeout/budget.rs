//! Timeout Budget Calculator: pure derivation of the nested timeout hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Upper bound accepted for the base duration.
pub const MAX_BASE: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound accepted for any ratio.
const MAX_RATIO: f64 = 100.0;

/// One of the four nested timeout layers, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutLayer {
    /// Transport ceiling for a call on a connection.
    Session,
    /// Backstop around the whole handler invocation.
    Dispatch,
    /// One workflow step, including the expert-analysis step.
    WorkflowStep,
    /// A single outbound provider call.
    ProviderCall,
}

impl TimeoutLayer {
    pub const ALL: [TimeoutLayer; 4] = [
        TimeoutLayer::Session,
        TimeoutLayer::Dispatch,
        TimeoutLayer::WorkflowStep,
        TimeoutLayer::ProviderCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutLayer::Session => "session",
            TimeoutLayer::Dispatch => "dispatch",
            TimeoutLayer::WorkflowStep => "workflow-step",
            TimeoutLayer::ProviderCall => "provider-call",
        }
    }

    /// The enclosing layer, `None` for the session layer.
    pub fn parent(&self) -> Option<TimeoutLayer> {
        match self {
            TimeoutLayer::Session => None,
            TimeoutLayer::Dispatch => Some(TimeoutLayer::Session),
            TimeoutLayer::WorkflowStep => Some(TimeoutLayer::Dispatch),
            TimeoutLayer::ProviderCall => Some(TimeoutLayer::WorkflowStep),
        }
    }
}

impl fmt::Display for TimeoutLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeoutLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "session" => Ok(TimeoutLayer::Session),
            "dispatch" => Ok(TimeoutLayer::Dispatch),
            "workflow-step" | "step" => Ok(TimeoutLayer::WorkflowStep),
            "provider-call" | "provider" => Ok(TimeoutLayer::ProviderCall),
            _ => Err(format!("Invalid TimeoutLayer: {}", s)),
        }
    }
}

/// Errors raised while building a [`TimeoutBudget`].
///
/// These surface at start-up; a budget that exists is always well ordered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetError {
    #[error("base timeout must be greater than zero")]
    ZeroBase,

    #[error("base timeout {0:?} exceeds the maximum of 24h")]
    BaseTooLarge(Duration),

    #[error("ratio for {layer} must be a finite value in (0, 100], got {value}")]
    InvalidRatio { layer: TimeoutLayer, value: f64 },

    #[error("{layer} timeout must be greater than zero")]
    ZeroLayer { layer: TimeoutLayer },

    #[error("{inner} timeout ({inner_value:?}) exceeds enclosing {outer} timeout ({outer_value:?})")]
    Inverted {
        inner: TimeoutLayer,
        inner_value: Duration,
        outer: TimeoutLayer,
        outer_value: Duration,
    },
}

/// Multipliers applied to the base duration for each layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutRatios {
    pub session: f64,
    pub dispatch: f64,
    pub workflow_step: f64,
    pub provider_call: f64,
}

impl Default for TimeoutRatios {
    fn default() -> Self {
        Self {
            session: 2.0,
            dispatch: 1.5,
            workflow_step: 1.0,
            provider_call: 0.9,
        }
    }
}

impl TimeoutRatios {
    pub fn get(&self, layer: TimeoutLayer) -> f64 {
        match layer {
            TimeoutLayer::Session => self.session,
            TimeoutLayer::Dispatch => self.dispatch,
            TimeoutLayer::WorkflowStep => self.workflow_step,
            TimeoutLayer::ProviderCall => self.provider_call,
        }
    }

    /// Check every ratio is usable as a `Duration` multiplier.
    pub fn validate(&self) -> Result<(), BudgetError> {
        for layer in TimeoutLayer::ALL {
            let value = self.get(layer);
            if !value.is_finite() || value <= 0.0 || value > MAX_RATIO {
                return Err(BudgetError::InvalidRatio { layer, value });
            }
        }
        Ok(())
    }
}

/// Nested deadlines for one call: `provider-call ≤ workflow-step ≤ dispatch ≤ session`.
///
/// Immutable once built. Every constructor validates the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutBudget {
    session: Duration,
    dispatch: Duration,
    workflow_step: Duration,
    provider_call: Duration,
}

impl TimeoutBudget {
    /// Derive a budget from the workflow-tool base timeout.
    pub fn derive(base: Duration, ratios: &TimeoutRatios) -> Result<Self, BudgetError> {
        if base.is_zero() {
            return Err(BudgetError::ZeroBase);
        }
        if base > MAX_BASE {
            return Err(BudgetError::BaseTooLarge(base));
        }
        ratios.validate()?;

        Self::from_layers(
            base.mul_f64(ratios.session),
            base.mul_f64(ratios.dispatch),
            base.mul_f64(ratios.workflow_step),
            base.mul_f64(ratios.provider_call),
        )
    }

    /// Build a budget from explicit per-layer durations.
    pub fn from_layers(
        session: Duration,
        dispatch: Duration,
        workflow_step: Duration,
        provider_call: Duration,
    ) -> Result<Self, BudgetError> {
        let budget = Self {
            session,
            dispatch,
            workflow_step,
            provider_call,
        };
        budget.validate()?;
        Ok(budget)
    }

    fn validate(&self) -> Result<(), BudgetError> {
        for layer in TimeoutLayer::ALL {
            if self.get(layer).is_zero() {
                return Err(BudgetError::ZeroLayer { layer });
            }
        }
        for inner in TimeoutLayer::ALL {
            let Some(outer) = inner.parent() else {
                continue;
            };
            let inner_value = self.get(inner);
            let outer_value = self.get(outer);
            if inner_value > outer_value {
                return Err(BudgetError::Inverted {
                    inner,
                    inner_value,
                    outer,
                    outer_value,
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, layer: TimeoutLayer) -> Duration {
        match layer {
            TimeoutLayer::Session => self.session,
            TimeoutLayer::Dispatch => self.dispatch,
            TimeoutLayer::WorkflowStep => self.workflow_step,
            TimeoutLayer::ProviderCall => self.provider_call,
        }
    }

    pub fn session(&self) -> Duration {
        self.session
    }

    pub fn dispatch(&self) -> Duration {
        self.dispatch
    }

    pub fn workflow_step(&self) -> Duration {
        self.workflow_step
    }

    pub fn provider_call(&self) -> Duration {
        self.provider_call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_ordered(b: &TimeoutBudget) -> bool {
        b.provider_call() <= b.workflow_step()
            && b.workflow_step() <= b.dispatch()
            && b.dispatch() <= b.session()
    }

    #[test]
    fn test_default_ratios() {
        let budget = TimeoutBudget::derive(Duration::from_secs(120), &TimeoutRatios::default()).unwrap();
        assert_eq!(budget.workflow_step(), Duration::from_secs(120));
        assert_eq!(budget.dispatch(), Duration::from_secs(180));
        assert_eq!(budget.session(), Duration::from_secs(240));
        assert_eq!(budget.provider_call(), Duration::from_secs(108));
    }

    #[test]
    fn test_ordering_holds_across_bases() {
        let ratios = TimeoutRatios::default();
        for millis in [1u64, 7, 250, 1_000, 59_999, 3_600_000, 86_400_000] {
            let budget = TimeoutBudget::derive(Duration::from_millis(millis), &ratios).unwrap();
            assert!(is_ordered(&budget), "unordered budget for base {}ms: {:?}", millis, budget);
        }
    }

    #[test]
    fn test_zero_base_rejected() {
        let err = TimeoutBudget::derive(Duration::ZERO, &TimeoutRatios::default()).unwrap_err();
        assert_eq!(err, BudgetError::ZeroBase);
    }

    #[test]
    fn test_huge_base_rejected() {
        let err = TimeoutBudget::derive(MAX_BASE * 2, &TimeoutRatios::default()).unwrap_err();
        assert!(matches!(err, BudgetError::BaseTooLarge(_)));
    }

    #[test]
    fn test_inverted_ratios_rejected() {
        let ratios = TimeoutRatios {
            workflow_step: 2.0,
            ..TimeoutRatios::default()
        };
        let err = TimeoutBudget::derive(Duration::from_secs(10), &ratios).unwrap_err();
        assert!(matches!(
            err,
            BudgetError::Inverted {
                inner: TimeoutLayer::WorkflowStep,
                outer: TimeoutLayer::Dispatch,
                ..
            }
        ));
    }

    #[test]
    fn test_non_finite_ratio_rejected() {
        let ratios = TimeoutRatios {
            provider_call: f64::NAN,
            ..TimeoutRatios::default()
        };
        let err = TimeoutBudget::derive(Duration::from_secs(10), &ratios).unwrap_err();
        assert!(matches!(
            err,
            BudgetError::InvalidRatio {
                layer: TimeoutLayer::ProviderCall,
                ..
            }
        ));

        let negative = TimeoutRatios {
            session: -1.0,
            ..TimeoutRatios::default()
        };
        assert!(TimeoutBudget::derive(Duration::from_secs(10), &negative).is_err());
    }

    #[test]
    fn test_zero_layer_rejected() {
        let err = TimeoutBudget::from_layers(
            Duration::from_secs(4),
            Duration::from_secs(3),
            Duration::from_secs(2),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(
            err,
            BudgetError::ZeroLayer {
                layer: TimeoutLayer::ProviderCall
            }
        );
    }

    #[test]
    fn test_layer_names_and_parents() {
        assert_eq!(TimeoutLayer::WorkflowStep.to_string(), "workflow-step");
        assert_eq!(TimeoutLayer::ProviderCall.parent(), Some(TimeoutLayer::WorkflowStep));
        assert_eq!(TimeoutLayer::Session.parent(), None);
        assert_eq!("workflow_step".parse::<TimeoutLayer>(), Ok(TimeoutLayer::WorkflowStep));
        assert!("nope".parse::<TimeoutLayer>().is_err());
        assert_eq!(
            serde_json::to_string(&TimeoutLayer::ProviderCall).unwrap(),
            "\"provider-call\""
        );
    }
}
