//! Model provider configuration from TOML (`[provider]` section)

use serde::{Deserialize, Serialize};

/// External command run once per provider call.
///
/// ```toml
/// [provider]
/// command = ["ollama", "run", "llama3"]
/// ```
///
/// The prompt is written to the command's stdin; its stdout is the reply.
/// Effort and deadline are passed as `CONDUIT_EFFORT`, `CONDUIT_REASONING_FRACTION`
/// and `CONDUIT_DEADLINE_MS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Program and arguments. No provider is configured when empty.
    pub command: Vec<String>,
    /// Name used in logs (defaults to the program name)
    pub name: Option<String>,
}

impl FileProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}
