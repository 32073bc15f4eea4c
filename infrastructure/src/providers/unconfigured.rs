use async_trait::async_trait;
use conduit_application::{ModelProvider, ProviderError, ProviderRequest};
use tokio_util::sync::CancellationToken;

/// Stand-in used when no provider command is configured.
///
/// Tools that never call a model keep working; the rest fail with
/// [`ProviderError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredProvider;

#[async_trait]
impl ModelProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn generate(
        &self,
        _request: ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable(
            "no model provider configured (set provider.command)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_unavailable() {
        let err = UnconfiguredProvider
            .generate(ProviderRequest::new("hi"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
