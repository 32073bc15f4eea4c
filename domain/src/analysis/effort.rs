//! Effort levels for the expert-analysis step.
//!
//! Effort selects how much of the model's internal reasoning budget is
//! requested. Higher effort trades latency for depth; `minimal` is expected
//! to finish roughly an order of magnitude faster than `max`.
//!
//! | Level | Reasoning budget |
//! |-------|------------------|
//! | `minimal` | 0.5% |
//! | `low` | 8% |
//! | `medium` | 33% |
//! | `high` | 67% |
//! | `max` | 100% |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Depth of work requested for an expert-analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    #[default]
    Minimal,
    Low,
    Medium,
    High,
    Max,
}

impl EffortLevel {
    pub const ALL: [EffortLevel; 5] = [
        EffortLevel::Minimal,
        EffortLevel::Low,
        EffortLevel::Medium,
        EffortLevel::High,
        EffortLevel::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffortLevel::Minimal => "minimal",
            EffortLevel::Low => "low",
            EffortLevel::Medium => "medium",
            EffortLevel::High => "high",
            EffortLevel::Max => "max",
        }
    }

    /// Fraction of the provider's maximum reasoning budget to request.
    pub fn reasoning_fraction(&self) -> f64 {
        match self {
            EffortLevel::Minimal => 0.005,
            EffortLevel::Low => 0.08,
            EffortLevel::Medium => 0.33,
            EffortLevel::High => 0.67,
            EffortLevel::Max => 1.0,
        }
    }

    /// Resolve the effort for one call.
    ///
    /// Precedence: explicit per-call value, then the configured default, then
    /// `minimal`. An unrecognised per-call value resolves to `minimal` with a
    /// warning attached; it is never an error.
    pub fn resolve(requested: Option<&str>, configured_default: Option<EffortLevel>) -> EffortResolution {
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());

        if let Some(raw) = requested {
            return match raw.parse::<EffortLevel>() {
                Ok(level) => EffortResolution {
                    level,
                    source: EffortSource::PerCall,
                    warning: None,
                },
                Err(_) => EffortResolution {
                    level: EffortLevel::Minimal,
                    source: EffortSource::Fallback,
                    warning: Some(format!(
                        "Unrecognised effort '{}', falling back to '{}'",
                        raw,
                        EffortLevel::Minimal
                    )),
                },
            };
        }

        match configured_default {
            Some(level) => EffortResolution {
                level,
                source: EffortSource::ConfiguredDefault,
                warning: None,
            },
            None => EffortResolution {
                level: EffortLevel::Minimal,
                source: EffortSource::Fallback,
                warning: None,
            },
        }
    }
}

impl fmt::Display for EffortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffortLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimal" | "min" => Ok(EffortLevel::Minimal),
            "low" => Ok(EffortLevel::Low),
            "medium" | "med" => Ok(EffortLevel::Medium),
            "high" => Ok(EffortLevel::High),
            "max" | "maximum" => Ok(EffortLevel::Max),
            _ => Err(format!("Invalid EffortLevel: {}", s)),
        }
    }
}

/// Where a resolved effort level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortSource {
    PerCall,
    ConfiguredDefault,
    Fallback,
}

/// Result of [`EffortLevel::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortResolution {
    pub level: EffortLevel,
    pub source: EffortSource,
    /// Set when the caller's value was unrecognised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl EffortResolution {
    pub fn fell_back(&self) -> bool {
        self.warning.is_some()
    }
}
