//! Admission control for concurrent calls.
//!
//! Each call needs one slot from its channel and one from the process-wide
//! pool. A call that cannot get both within the queue timeout is rejected
//! as overloaded instead of waiting forever.

use conduit_application::CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("server overloaded: no execution slot within {0:?}")]
    Overloaded(Duration),

    #[error("channel closed while waiting for an execution slot")]
    Cancelled,
}

/// Both slots held by a running call; released on drop.
#[derive(Debug)]
pub struct CallPermit {
    _channel: OwnedSemaphorePermit,
    _process: OwnedSemaphorePermit,
}

/// Process-wide limits, shared by every channel.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimits {
    process: Arc<Semaphore>,
    per_channel: usize,
    queue_timeout: Duration,
}

impl ConcurrencyLimits {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            process: Arc::new(Semaphore::new(config.max_concurrent_total())),
            per_channel: config.max_concurrent_per_channel(),
            queue_timeout: config.queue_timeout(),
        }
    }

    /// Fresh slot pool for one channel.
    pub fn channel_slots(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.per_channel))
    }

    /// Wait for a channel slot and then a process slot.
    ///
    /// The queue timeout covers both waits together.
    pub async fn acquire(
        &self,
        channel: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Result<CallPermit, AdmissionError> {
        let wait = async {
            let channel_permit = Arc::clone(channel).acquire_owned().await;
            let process_permit = Arc::clone(&self.process).acquire_owned().await;
            (channel_permit, process_permit)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AdmissionError::Cancelled),
            result = tokio::time::timeout(self.queue_timeout, wait) => match result {
                Ok((Ok(channel), Ok(process))) => Ok(CallPermit {
                    _channel: channel,
                    _process: process,
                }),
                // Semaphores are never closed while the server runs
                Ok(_) => Err(AdmissionError::Cancelled),
                Err(_) => {
                    debug!(
                        queue_timeout_ms = self.queue_timeout.as_millis() as u64,
                        "No execution slot available"
                    );
                    Err(AdmissionError::Overloaded(self.queue_timeout))
                }
            },
        }
    }
}
