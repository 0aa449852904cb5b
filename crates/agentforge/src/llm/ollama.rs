//! Ollama provider (locally-hosted chat server).

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::{Deserialize, Serialize};

use super::error::{LLMError, api_error_message};
use super::provider::{
    ChatAdapter, ChatCall, MAX_TOKENS, TEMPERATURE, parse_body, parse_endpoint,
};
use super::types::{ChatMessage, DEFAULT_LOCAL_ENDPOINT};

/// Ollama provider.
///
/// No relay retry: a relay cannot reach the caller's loopback address.
pub struct OllamaAdapter {
    client: Client,
    default_endpoint: String,
}

impl OllamaAdapter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_default_endpoint(client, DEFAULT_LOCAL_ENDPOINT.to_string())
    }

    /// Use `endpoint` when a call does not name one.
    #[must_use]
    pub fn with_default_endpoint(client: Client, endpoint: String) -> Self {
        Self {
            client,
            default_endpoint: endpoint,
        }
    }

    fn endpoint<'a>(&'a self, call: &ChatCall<'a>) -> &'a str {
        call.endpoint.unwrap_or(&self.default_endpoint)
    }
}

#[async_trait]
impl ChatAdapter for OllamaAdapter {
    fn build_request(&self, call: &ChatCall<'_>) -> Result<Request, LLMError> {
        let body = LocalChatRequest {
            model: call.model,
            messages: call.messages,
            stream: false,
            options: LocalChatOptions {
                temperature: TEMPERATURE,
                num_predict: MAX_TOKENS,
            },
        };

        let request = self
            .client
            .post(parse_endpoint(self.endpoint(call))?)
            .header("Content-Type", "application/json")
            .json(&body)
            .build()?;

        Ok(request)
    }

    async fn chat(&self, call: &ChatCall<'_>) -> Result<String, LLMError> {
        let endpoint = self.endpoint(call);
        let unreachable = |e: reqwest::Error| LLMError::LocalServerUnreachable {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        };

        let request = self.build_request(call)?;
        let response = self.client.execute(request).await.map_err(unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(unreachable)?;
        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &body);
            return Err(LLMError::Api {
                status: status.as_u16(),
                message: format!(
                    "{message} for model '{model}'; make sure the server is running and the \
                     model is installed (ollama pull {model})",
                    model = call.model
                ),
            });
        }

        let chat: LocalChatResponse = parse_body(&body)?;
        chat.message
            .and_then(|m| m.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                LLMError::InvalidResponse("expected message.content in response".to_string())
            })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct LocalChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: LocalChatOptions,
}

#[derive(Serialize)]
struct LocalChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct LocalChatResponse {
    message: Option<LocalChatMessage>,
}

#[derive(Deserialize)]
struct LocalChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Provider, ProviderConfig};

    #[test]
    fn build_request_defaults_to_loopback() {
        let config = ProviderConfig::new(Provider::Ollama, "llama3.2").with_api_key("ignored");
        let messages = [ChatMessage::system("Be kind."), ChatMessage::user("hi")];

        let request = OllamaAdapter::new(Client::new())
            .build_request(&ChatCall::new(&config, &messages))
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:11434/api/chat");
        assert!(request.headers().get("authorization").is_none());

        let body: serde_json::Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama3.2",
                "messages": [
                    {"role": "system", "content": "Be kind."},
                    {"role": "user", "content": "hi"}
                ],
                "stream": false,
                "options": {"temperature": 0.7, "num_predict": 500}
            })
        );
    }

    #[test]
    fn build_request_uses_call_endpoint() {
        let config = ProviderConfig::new(Provider::Ollama, "llama3.2")
            .with_endpoint("http://192.168.1.20:11434/api/chat");
        let messages = [ChatMessage::user("hi")];

        let request = OllamaAdapter::new(Client::new())
            .build_request(&ChatCall::new(&config, &messages))
            .unwrap();
        assert_eq!(request.url().as_str(), "http://192.168.1.20:11434/api/chat");
    }

    #[test]
    fn build_request_rejects_malformed_endpoint() {
        let config =
            ProviderConfig::new(Provider::Ollama, "llama3.2").with_endpoint("http://[::1");
        let messages = [ChatMessage::user("hi")];

        let err = OllamaAdapter::new(Client::new())
            .build_request(&ChatCall::new(&config, &messages))
            .unwrap_err();
        assert!(matches!(
            err,
            LLMError::InvalidEndpoint { ref endpoint, .. } if endpoint == "http://[::1"
        ));
    }
}
