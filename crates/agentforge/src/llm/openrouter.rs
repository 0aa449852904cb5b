//! OpenRouter provider (key-authenticated chat-completions API).

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::{Deserialize, Serialize};

use super::error::{LLMError, api_error_message};
use super::provider::{
    ChatAdapter, ChatCall, Delivered, MAX_TOKENS, Relay, TEMPERATURE, parse_body, relay_note,
    send_with_relay,
};
use super::types::{ChatMessage, Provider};

/// OpenRouter provider.
pub struct OpenRouterAdapter {
    client: Client,
    url: String,
    referer: String,
    title: String,
    relay: Option<Relay>,
}

impl OpenRouterAdapter {
    pub const DEFAULT_URL: &'static str = "https://openrouter.ai/api/v1/chat/completions";
    pub const DEFAULT_REFERER: &'static str = "http://localhost:8080";
    pub const DEFAULT_TITLE: &'static str = "Agentforge";

    #[must_use]
    pub fn new(client: Client, url: String) -> Self {
        Self {
            client,
            url,
            referer: Self::DEFAULT_REFERER.to_string(),
            title: Self::DEFAULT_TITLE.to_string(),
            relay: None,
        }
    }

    /// Set the origin and client title OpenRouter uses to attribute traffic.
    #[must_use]
    pub fn with_identity(mut self, referer: String, title: String) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    #[must_use]
    pub fn with_relay(mut self, relay: Option<Relay>) -> Self {
        self.relay = relay;
        self
    }
}

#[async_trait]
impl ChatAdapter for OpenRouterAdapter {
    fn build_request(&self, call: &ChatCall<'_>) -> Result<Request, LLMError> {
        let api_key = call.api_key.ok_or(LLMError::MissingCredentials {
            provider: Provider::OpenRouter,
        })?;

        let body = CompletionRequest {
            model: call.model,
            messages: call.messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .build()?;

        Ok(request)
    }

    async fn chat(&self, call: &ChatCall<'_>) -> Result<String, LLMError> {
        let request = self.build_request(call)?;
        let Delivered { response, relayed } =
            send_with_relay(&self.client, request, self.relay.as_ref()).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &body);
            return Err(LLMError::Api {
                status: status.as_u16(),
                message: relay_note(message, relayed),
            });
        }

        let completion: CompletionResponse = parse_body(&body)?;
        extract_reply(completion)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn extract_reply(response: CompletionResponse) -> Result<String, LLMError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LLMError::InvalidResponse(
            "response contained no choices".to_string(),
        ));
    };

    choice
        .message
        .and_then(|m| m.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            LLMError::InvalidResponse("first choice has no message content".to_string())
        })
}
