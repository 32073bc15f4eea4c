//! Timeout configuration from TOML (`[timeouts]` section)

use conduit_domain::TimeoutRatios;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Base timeout, layer ratios and per-layer overrides.
///
/// ```toml
/// [timeouts]
/// base_secs = 300
///
/// [timeouts.ratios]
/// dispatch = 1.5
///
/// [timeouts.overrides]
/// provider-call = 120.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    /// Workflow-tool base timeout in seconds
    pub base_secs: u64,
    pub ratios: TimeoutRatios,
    /// Absolute seconds per layer name (`session`, `dispatch`,
    /// `workflow-step`, `provider-call`)
    pub overrides: BTreeMap<String, f64>,
}

impl Default for FileTimeoutsConfig {
    fn default() -> Self {
        Self {
            base_secs: 300,
            ratios: TimeoutRatios::default(),
            overrides: BTreeMap::new(),
        }
    }
}
