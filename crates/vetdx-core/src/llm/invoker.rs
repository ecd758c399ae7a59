//! Multi-provider model invocation with ordered fallback
//!
//! A request walks a linear chain: the explicitly requested provider first
//! (when the caller named one), then the ordered free-tier pool, then the
//! paid backups. The first success wins; exhaustion is a value, never a
//! panic or an exception.

use crate::config::Settings;
use crate::error::Result;
use crate::llm::{ChatProvider, ChatRequest, HttpChatProvider, ProviderSpec};
use std::sync::Arc;

/// Text returned by [`ModelInvoker::invoke_text`] when the whole chain failed
pub const FAILURE_PLACEHOLDER: &str =
    "Não foi possível gerar uma resposta. Verifique as chaves de API dos fornecedores configurados.";

/// Provider tag reported alongside the failure placeholder
pub const NO_PROVIDER: &str = "none";

/// Outcome of walking the provider chain
#[derive(Debug, Clone)]
pub enum InvokeOutcome {
    /// A provider answered; `provider` records which one, for audit
    Success { text: String, provider: String },
    /// Every attempt failed
    Exhausted,
}

impl InvokeOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Ordered fallback chain over interchangeable chat providers
pub struct ModelInvoker {
    providers: Vec<Arc<dyn ChatProvider>>,
}

impl ModelInvoker {
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self { providers }
    }

    /// Text chain from settings: free pool first, paid backups last
    pub fn text_chain(settings: &Settings) -> Result<Self> {
        let mut providers: Vec<Arc<dyn ChatProvider>> = Vec::new();
        for model_ref in settings.llm_free_pool.iter().chain(settings.llm_backups.iter()) {
            let spec = ProviderSpec::from_model_ref(model_ref, settings);
            providers.push(Arc::new(HttpChatProvider::new(spec)?));
        }
        Ok(Self::new(providers))
    }

    /// Vision chain from settings, primary model first
    pub fn vision_chain(settings: &Settings) -> Result<Self> {
        let mut providers: Vec<Arc<dyn ChatProvider>> = Vec::new();
        for model_ref in &settings.vision_chain {
            let spec = ProviderSpec::from_model_ref(model_ref, settings);
            providers.push(Arc::new(HttpChatProvider::new(spec)?));
        }
        Ok(Self::new(providers))
    }

    /// Build a provider for a caller-selected model identifier
    pub fn provider_for(settings: &Settings, model: &str) -> Result<Arc<dyn ChatProvider>> {
        let model_ref = settings.resolve_model(model);
        let spec = ProviderSpec::from_model_ref(&model_ref, settings);
        Ok(Arc::new(HttpChatProvider::new(spec)?))
    }

    /// Walk the chain: preferred provider first, then the configured order.
    ///
    /// Every failure is logged and discarded; it drives fallback, it is
    /// never fatal.
    pub async fn invoke(
        &self,
        request: &ChatRequest,
        preferred: Option<Arc<dyn ChatProvider>>,
    ) -> InvokeOutcome {
        let chain = preferred.iter().chain(self.providers.iter());

        for provider in chain {
            tracing::debug!("Trying provider {}", provider.id());
            match provider.invoke(request).await {
                Ok(text) => {
                    tracing::info!("Provider {} answered", provider.id());
                    return InvokeOutcome::Success {
                        text,
                        provider: provider.id().to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Provider {} failed: {}", provider.id(), e);
                }
            }
        }

        tracing::warn!("All providers exhausted");
        InvokeOutcome::Exhausted
    }

    /// External-contract wrapper: exhaustion becomes the failure placeholder
    /// and the `"none"` provider tag
    pub async fn invoke_text(
        &self,
        request: &ChatRequest,
        preferred: Option<Arc<dyn ChatProvider>>,
    ) -> (String, String) {
        match self.invoke(request, preferred).await {
            InvokeOutcome::Success { text, provider } => (text, provider),
            InvokeOutcome::Exhausted => {
                (FAILURE_PLACEHOLDER.to_string(), NO_PROVIDER.to_string())
            }
        }
    }

    /// Number of providers in the configured chain (excluding any preferred)
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VetDxError;
    use async_trait::async_trait;

    struct StaticProvider {
        id: String,
        reply: std::result::Result<String, String>,
    }

    impl StaticProvider {
        fn ok(id: &str, reply: &str) -> Arc<dyn ChatProvider> {
            Arc::new(Self {
                id: id.to_string(),
                reply: Ok(reply.to_string()),
            })
        }

        fn failing(id: &str) -> Arc<dyn ChatProvider> {
            Arc::new(Self {
                id: id.to_string(),
                reply: Err("connection refused".to_string()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for StaticProvider {
        async fn invoke(&self, _request: &ChatRequest) -> Result<String> {
            self.reply
                .clone()
                .map_err(VetDxError::Provider)
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    #[tokio::test]
    async fn test_fallback_to_second_provider() {
        let invoker = ModelInvoker::new(vec![
            StaticProvider::failing("a/primary"),
            StaticProvider::ok("b/secondary", "differential diagnosis"),
        ]);

        let outcome = invoker.invoke(&ChatRequest::text("case"), None).await;
        match outcome {
            InvokeOutcome::Success { text, provider } => {
                assert_eq!(text, "differential diagnosis");
                assert_eq!(provider, "b/secondary");
            }
            InvokeOutcome::Exhausted => panic!("chain should have succeeded"),
        }
    }

    #[tokio::test]
    async fn test_preferred_provider_goes_first() {
        let invoker = ModelInvoker::new(vec![StaticProvider::ok("pool/a", "pool answer")]);
        let preferred = StaticProvider::ok("explicit/x", "explicit answer");

        let outcome = invoker
            .invoke(&ChatRequest::text("case"), Some(preferred))
            .await;
        match outcome {
            InvokeOutcome::Success { text, provider } => {
                assert_eq!(text, "explicit answer");
                assert_eq!(provider, "explicit/x");
            }
            InvokeOutcome::Exhausted => panic!("chain should have succeeded"),
        }
    }

    #[tokio::test]
    async fn test_failed_preferred_falls_through() {
        let invoker = ModelInvoker::new(vec![StaticProvider::ok("pool/a", "pool answer")]);
        let preferred = StaticProvider::failing("explicit/broken");

        let outcome = invoker
            .invoke(&ChatRequest::text("case"), Some(preferred))
            .await;
        assert!(matches!(
            outcome,
            InvokeOutcome::Success { ref provider, .. } if provider == "pool/a"
        ));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_placeholder() {
        let invoker = ModelInvoker::new(vec![
            StaticProvider::failing("a"),
            StaticProvider::failing("b"),
        ]);

        let (text, provider) = invoker.invoke_text(&ChatRequest::text("case"), None).await;
        assert_eq!(text, FAILURE_PLACEHOLDER);
        assert_eq!(provider, NO_PROVIDER);
    }
}
