//! Concurrency limits from TOML (`[limits]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    /// Calls executing at once on one connection
    pub max_concurrent_per_channel: usize,
    /// Calls executing at once across the process
    pub max_concurrent_total: usize,
    /// Wait for a free slot before failing with `overloaded`
    pub queue_timeout_ms: u64,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_channel: 8,
            max_concurrent_total: 64,
            queue_timeout_ms: 5_000,
        }
    }
}
