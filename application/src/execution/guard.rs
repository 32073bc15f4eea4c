//! Provider call guard.
//!
//! Every outbound provider call runs under a [`LayerDeadline`] and the call's
//! cancellation token. Whichever of completion, expiry or cancellation comes
//! first wins; in the two losing cases the provider future is dropped and its
//! child token cancelled, so the dependency work is released rather than left
//! running in the background.

use super::deadline::LayerDeadline;
use crate::ports::provider::{ModelProvider, ProviderError, ProviderRequest};
use conduit_domain::TimeoutLayer;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Why a guarded call did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("{layer} timeout after {after:?}")]
    Timeout { layer: TimeoutLayer, after: Duration },

    #[error(transparent)]
    Provider(ProviderError),

    #[error("Cancelled")]
    Cancelled,
}

impl GuardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GuardError::Timeout { .. })
    }

    fn expired(deadline: &LayerDeadline) -> Self {
        GuardError::Timeout {
            layer: deadline.binding_layer(),
            after: deadline.span(),
        }
    }
}

/// Run `make` under `deadline` and `cancel`.
///
/// `make` receives a child token that is cancelled as soon as the guarded
/// future loses, so the callee can observe abandonment even if it spawned
/// work of its own. A provider that reports its own timeout or cancellation
/// is folded into the matching [`GuardError`] variant.
pub async fn bounded<T, F, Fut>(
    deadline: LayerDeadline,
    cancel: &CancellationToken,
    make: F,
) -> Result<T, GuardError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    if cancel.is_cancelled() {
        return Err(GuardError::Cancelled);
    }
    if deadline.is_expired() {
        return Err(GuardError::expired(&deadline));
    }

    let child = cancel.child_token();
    let work = make(child.clone());

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GuardError::Cancelled),
        result = work => result.map_err(|e| match e {
            ProviderError::Timeout(_) => GuardError::expired(&deadline),
            ProviderError::Cancelled => GuardError::Cancelled,
            other => GuardError::Provider(other),
        }),
        _ = tokio::time::sleep_until(deadline.at()) => Err(GuardError::expired(&deadline)),
    };

    // Losing branches have already dropped `work`; this reaches anything it
    // handed the token to.
    child.cancel();
    result
}

/// Guard around the configured [`ModelProvider`].
#[derive(Clone)]
pub struct ProviderCallGuard {
    provider: Arc<dyn ModelProvider>,
}

impl ProviderCallGuard {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Call the provider, bounded by `deadline` and `cancel`.
    pub async fn generate(
        &self,
        mut request: ProviderRequest,
        deadline: LayerDeadline,
        cancel: &CancellationToken,
    ) -> Result<String, GuardError> {
        request.deadline = deadline.remaining();
        let provider = Arc::clone(&self.provider);
        debug!(
            provider = provider.name(),
            layer = %deadline.binding_layer(),
            remaining_ms = request.deadline.as_millis() as u64,
            "Calling provider"
        );

        let result = bounded(deadline, cancel, move |token| async move {
            provider.generate(request, token).await
        })
        .await;

        if let Err(e) = &result {
            warn!(provider = self.provider.name(), "Provider call abandoned: {}", e);
        }
        result
    }
}
