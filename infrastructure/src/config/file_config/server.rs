//! Listener configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Address for `conduit serve` when `--listen` is not given
    pub listen: String,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7340".to_string(),
        }
    }
}
