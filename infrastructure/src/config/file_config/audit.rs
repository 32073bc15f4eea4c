//! Audit trail configuration from TOML (`[audit]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    pub enabled: bool,
    /// JSONL file to append records to. Defaults to the data directory.
    pub path: Option<PathBuf>,
    /// Attach a heuristic observation to each record
    pub scoring: bool,
    /// Ceiling on one scorer run
    pub observer_timeout_ms: u64,
}

impl Default for FileAuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            scoring: true,
            observer_timeout_ms: 10_000,
        }
    }
}
