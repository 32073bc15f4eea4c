//! Expert-analysis configuration from TOML (`[analysis]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalysisConfig {
    /// Effort used when a call does not request one
    /// (`minimal`, `low`, `medium`, `high`, `max`)
    pub default_effort: Option<String>,
}
