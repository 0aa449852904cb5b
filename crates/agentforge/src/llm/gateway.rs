//! Provider gateway: one entry point for every chat backend.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{ChatError, LLMError};
use super::huggingface::HuggingFaceAdapter;
use super::ollama::OllamaAdapter;
use super::openrouter::OpenRouterAdapter;
use super::provider::{ChatAdapter, ChatCall, Relay};
use super::types::{ChatMessage, Provider, ProviderConfig};
use crate::config::ProvidersConfig;

/// Registry of chat adapters, keyed by provider.
///
/// Holds no per-call state; clones share the same adapters and connection pool.
#[derive(Clone, Default)]
pub struct ProviderGateway {
    adapters: HashMap<Provider, Arc<dyn ChatAdapter>>,
}

impl ProviderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in adapters from provider configuration.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let client = Client::new();
        let relay = config.relay.as_ref().map(|r| Relay::new(r.url.clone()));
        let mut gateway = Self::new();

        let openrouter = OpenRouterAdapter::new(client.clone(), config.openrouter.url.clone())
            .with_identity(
                config.openrouter.referer.clone(),
                config.openrouter.title.clone(),
            )
            .with_relay(relay.clone());
        gateway.register(Provider::OpenRouter, Arc::new(openrouter));

        let huggingface =
            HuggingFaceAdapter::new(client.clone(), config.huggingface.base_url.clone())
                .with_relay(relay.clone());
        gateway.register(Provider::HuggingFace, Arc::new(huggingface));

        let ollama = OllamaAdapter::with_default_endpoint(client, config.ollama.endpoint.clone());
        gateway.register(Provider::Ollama, Arc::new(ollama));

        match &relay {
            Some(relay) => info!(?relay, "Registered chat providers with relay fallback"),
            None => info!("Registered chat providers"),
        }

        gateway
    }

    /// Register an adapter, replacing any previous one for `provider`.
    pub fn register(&mut self, provider: Provider, adapter: Arc<dyn ChatAdapter>) {
        self.adapters.insert(provider, adapter);
    }

    /// Get an adapter by provider.
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ChatAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    /// Send a chat turn to the provider named by `provider`.
    ///
    /// Unknown provider ids fail with [`LLMError::UnsupportedProvider`] before
    /// any network activity. Passing a `cancel` token lets the caller abandon
    /// the call; `None` waits for the provider however long it takes.
    pub async fn send_chat(
        &self,
        provider: &str,
        model: &str,
        messages: &[ChatMessage],
        api_key: Option<&str>,
        local_endpoint: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ChatError> {
        let parsed = provider
            .parse::<Provider>()
            .map_err(|e| ChatError::new(provider, e))?;

        let config = ProviderConfig {
            provider: parsed,
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            endpoint: local_endpoint.map(str::to_string),
        };

        self.send(&config, messages, cancel).await
    }

    /// Send a chat turn described by a [`ProviderConfig`].
    pub async fn send(
        &self,
        config: &ProviderConfig,
        messages: &[ChatMessage],
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ChatError> {
        self.dispatch(config, messages, cancel).await.map_err(|e| {
            warn!(
                provider = %config.provider,
                model = %config.model,
                error = %e,
                "chat request failed"
            );
            ChatError::new(config.provider.as_str(), e)
        })
    }

    async fn dispatch(
        &self,
        config: &ProviderConfig,
        messages: &[ChatMessage],
        cancel: Option<&CancellationToken>,
    ) -> Result<String, LLMError> {
        let adapter = self
            .get(config.provider)
            .ok_or_else(|| LLMError::UnsupportedProvider(config.provider.to_string()))?;
        let call = ChatCall::new(config, messages);

        debug!(
            provider = %config.provider,
            model = %config.model,
            messages = messages.len(),
            "dispatching chat request"
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(LLMError::Cancelled),
                    result = adapter.chat(&call) => result,
                }
            }
            None => adapter.chat(&call).await,
        }
    }
}
