//! Chat adapter trait and the plumbing shared by its implementations.

use async_trait::async_trait;
use reqwest::{Client, Request, Response, Url};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::error::LLMError;
use super::types::{ChatMessage, ProviderConfig};

/// Sampling temperature sent to every provider.
pub const TEMPERATURE: f64 = 0.7;

/// Upper bound on generated tokens sent to every provider.
pub const MAX_TOKENS: u32 = 500;

/// Per-call inputs handed to an adapter.
#[derive(Debug, Clone, Copy)]
pub struct ChatCall<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    /// Non-empty API key, if one was supplied.
    pub api_key: Option<&'a str>,
    /// Caller-supplied endpoint override.
    pub endpoint: Option<&'a str>,
}

impl<'a> ChatCall<'a> {
    pub fn new(config: &'a ProviderConfig, messages: &'a [ChatMessage]) -> Self {
        Self {
            model: &config.model,
            messages,
            api_key: config.api_key(),
            endpoint: config.endpoint.as_deref().filter(|e| !e.is_empty()),
        }
    }
}

/// One chat API backend.
///
/// Implementations translate the uniform [`ChatCall`] into their provider's
/// wire format and extract the assistant reply from its response.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Build the HTTP request for a call without sending it.
    ///
    /// Precondition failures (such as a missing API key) surface here, before
    /// any network activity.
    fn build_request(&self, call: &ChatCall<'_>) -> Result<Request, LLMError>;

    /// Send a call and return the trimmed assistant reply.
    async fn chat(&self, call: &ChatCall<'_>) -> Result<String, LLMError>;
}

/// Same-request relay used when a provider cannot be reached directly.
///
/// The relay receives the original method, headers and body at
/// `<relay url>?url=<encoded target>` and is expected to forward them.
#[derive(Debug, Clone)]
pub struct Relay {
    url: String,
}

impl Relay {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Relay URL addressing `target`.
    pub fn target_url(&self, target: &Url) -> Result<Url, LLMError> {
        Url::parse_with_params(&self.url, &[("url", target.as_str())])
            .map_err(|e| LLMError::RelayFallback(format!("invalid relay url '{}': {e}", self.url)))
    }

    async fn forward(&self, client: &Client, mut request: Request) -> Result<Response, LLMError> {
        *request.url_mut() = self.target_url(request.url())?;
        client
            .execute(request)
            .await
            .map_err(|e| LLMError::RelayFallback(e.to_string()))
    }
}

/// A provider response and whether it came back through the relay.
pub(crate) struct Delivered {
    pub response: Response,
    pub relayed: bool,
}

/// Mark error text from a relayed response, whose status may be the relay's
/// own rather than the provider's.
pub(crate) fn relay_note(message: String, relayed: bool) -> String {
    if relayed {
        format!("{message} (via relay)")
    } else {
        message
    }
}

/// Execute `request`, retrying once through `relay` when the connection fails.
///
/// Only connection-level failures are retried; every other transport error
/// propagates untouched.
pub(crate) async fn send_with_relay(
    client: &Client,
    request: Request,
    relay: Option<&Relay>,
) -> Result<Delivered, LLMError> {
    let retry = relay.and_then(|relay| request.try_clone().map(|copy| (relay, copy)));

    match client.execute(request).await {
        Ok(response) => Ok(Delivered {
            response,
            relayed: false,
        }),
        Err(e) if e.is_connect() => match retry {
            Some((relay, request)) => {
                warn!(
                    url = %request.url(),
                    error = %e,
                    "direct request failed, retrying through relay"
                );
                let response = relay.forward(client, request).await?;
                if !response.status().is_success() {
                    warn!(status = %response.status(), "relay answered with an error status");
                }
                Ok(Delivered {
                    response,
                    relayed: true,
                })
            }
            None => Err(LLMError::Request(e)),
        },
        Err(e) => Err(LLMError::Request(e)),
    }
}

/// Parse an endpoint string as an absolute URL.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, LLMError> {
    Url::parse(endpoint).map_err(|e| LLMError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Parse a successful response body, reporting shape mismatches as
/// [`LLMError::InvalidResponse`].
pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, LLMError> {
    serde_json::from_str(body).map_err(|e| LLMError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Provider;

    #[test]
    fn relay_encodes_target() {
        let relay = Relay::new("https://relay.example.com/raw");
        let target = Url::parse("https://openrouter.ai/api/v1/chat/completions").unwrap();

        let url = relay.target_url(&target).unwrap();
        assert_eq!(
            url.as_str(),
            "https://relay.example.com/raw?url=https%3A%2F%2Fopenrouter.ai%2Fapi%2Fv1%2Fchat%2Fcompletions"
        );
    }

    #[test]
    fn relay_rejects_invalid_base() {
        let relay = Relay::new("not a url");
        let target = Url::parse("https://example.com").unwrap();
        let err = relay.target_url(&target).unwrap_err();
        assert!(matches!(err, LLMError::RelayFallback(_)));
    }

    #[test]
    fn chat_call_filters_empty_fields() {
        let config = ProviderConfig::new(Provider::HuggingFace, "gpt2")
            .with_api_key("")
            .with_endpoint("");
        let messages = [ChatMessage::user("hi")];

        let call = ChatCall::new(&config, &messages);
        assert_eq!(call.model, "gpt2");
        assert_eq!(call.api_key, None);
        assert_eq!(call.endpoint, None);
    }

    #[test]
    fn parse_endpoint_rejects_malformed_urls() {
        for endpoint in ["not a url", "http://[::1", ""] {
            let err = parse_endpoint(endpoint).unwrap_err();
            assert!(
                matches!(err, LLMError::InvalidEndpoint { endpoint: ref e, .. } if e == endpoint),
                "{endpoint} should be rejected"
            );
        }
        assert!(parse_endpoint("http://127.0.0.1:11434/api/chat").is_ok());
    }

    #[test]
    fn parse_body_reports_invalid_response() {
        let err = parse_body::<serde_json::Map<String, serde_json::Value>>("[1, 2]").unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }
}
