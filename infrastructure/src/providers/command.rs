//! Provider backed by an external command.
//!
//! Every `generate` call spawns the configured program, writes the prompt to
//! its stdin and reads the reply from stdout. Generation settings travel as
//! environment variables:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `CONDUIT_EFFORT` | effort level name, when set |
//! | `CONDUIT_REASONING_FRACTION` | share of the budget for reasoning, when set |
//! | `CONDUIT_TEMPERATURE` | sampling temperature, when set |
//! | `CONDUIT_DEADLINE_MS` | time left before the call is abandoned |
//!
//! The child is killed when the call is cancelled or its deadline passes,
//! since the guard drops the future that owns it.

use async_trait::async_trait;
use conduit_application::{ModelProvider, ProviderError, ProviderRequest};
use conduit_domain::util::preview;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FileProviderConfig;

pub struct CommandProvider {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    /// `None` when `command` has no program.
    pub fn new(command: Vec<String>, name: Option<String>) -> Option<Self> {
        let mut parts = command.into_iter();
        let program = parts.next().filter(|p| !p.trim().is_empty())?;
        let args = parts.collect();
        let name = name.unwrap_or_else(|| {
            std::path::Path::new(&program)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| program.clone())
        });
        Some(Self { name, program, args })
    }

    pub fn from_config(config: &FileProviderConfig) -> Option<Self> {
        Self::new(config.command.clone(), config.name.clone())
    }

    fn command(&self, request: &ProviderRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("CONDUIT_DEADLINE_MS", request.deadline.as_millis().to_string());

        let params = &request.params;
        if let Some(effort) = params.effort {
            cmd.env("CONDUIT_EFFORT", effort.as_str());
        }
        if let Some(fraction) = params.reasoning_fraction {
            cmd.env("CONDUIT_REASONING_FRACTION", fraction.to_string());
        }
        if let Some(temperature) = params.temperature {
            cmd.env("CONDUIT_TEMPERATURE", temperature.to_string());
        }

        // Linux: have the kernel terminate the child if this process dies
        // before it can kill it itself.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        cmd
    }
}

#[async_trait]
impl ModelProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<String, ProviderError> {
        let mut child = self.command(&request).spawn().map_err(|e| {
            ProviderError::Unavailable(format!("failed to start '{}': {}", self.program, e))
        })?;
        debug!(provider = %self.name, pid = ?child.id(), "Provider command started");

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = request.prompt;
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    debug!(error = %e, "Provider command closed stdin early");
                }
            });
        }

        // Dropping `wait_with_output` drops the child, which kills it
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            output = child.wait_with_output() => output,
        };
        let output = waited.map_err(|e| {
            ProviderError::RequestFailed(format!("failed to read provider output: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                provider = %self.name,
                status = %output.status,
                "Provider command failed"
            );
            return Err(ProviderError::RequestFailed(format!(
                "'{}' exited with {}: {}",
                self.name,
                output.status,
                preview(stderr.trim(), 500)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}
