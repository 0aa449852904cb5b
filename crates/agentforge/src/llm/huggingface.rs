//! Hugging Face inference provider (prompt-completion API, one model per path).
//!
//! The inference API takes a single text prompt rather than a message list,
//! so the conversation is flattened into labelled lines ending with an
//! assistant cue.

use async_trait::async_trait;
use reqwest::{Client, Request, Url};
use serde::{Deserialize, Serialize};

use super::error::{LLMError, api_error_message};
use super::provider::{
    ChatAdapter, ChatCall, Delivered, MAX_TOKENS, Relay, TEMPERATURE, parse_body,
    parse_endpoint, relay_note, send_with_relay,
};
use super::types::ChatMessage;

/// Hugging Face inference provider.
pub struct HuggingFaceAdapter {
    client: Client,
    base_url: String,
    relay: Option<Relay>,
}

impl HuggingFaceAdapter {
    pub const DEFAULT_BASE_URL: &'static str = "https://api-inference.huggingface.co/models";

    #[must_use]
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            relay: None,
        }
    }

    #[must_use]
    pub fn with_relay(mut self, relay: Option<Relay>) -> Self {
        self.relay = relay;
        self
    }

    /// Base URL with the model id appended as path segments.
    ///
    /// `/` inside the id separates segments; any other reserved character is
    /// percent-encoded so it cannot change the query or fragment.
    fn model_url(&self, model: &str) -> Result<Url, LLMError> {
        let mut url = parse_endpoint(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| LLMError::InvalidEndpoint {
                endpoint: self.base_url.clone(),
                message: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(model.split('/'));
        Ok(url)
    }
}

/// Flatten a conversation into a single completion prompt.
///
/// Known roles become `"<Label>: <content>"` lines; other roles contribute
/// their raw content. The prompt always ends with an `Assistant:` cue.
pub fn flatten_prompt(messages: &[ChatMessage]) -> String {
    let mut prompt = messages
        .iter()
        .map(|message| match message.role.label() {
            Some(label) => format!("{}: {}", label, message.content),
            None => message.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str("\nAssistant:");
    prompt
}

#[async_trait]
impl ChatAdapter for HuggingFaceAdapter {
    fn build_request(&self, call: &ChatCall<'_>) -> Result<Request, LLMError> {
        let body = GenerationRequest {
            inputs: flatten_prompt(call.messages),
            parameters: GenerationParameters {
                max_new_tokens: MAX_TOKENS,
                temperature: TEMPERATURE,
                return_full_text: false,
            },
        };

        let mut builder = self
            .client
            .post(self.model_url(call.model)?)
            .header("Content-Type", "application/json");

        if let Some(key) = call.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        Ok(builder.json(&body).build()?)
    }

    async fn chat(&self, call: &ChatCall<'_>) -> Result<String, LLMError> {
        let request = self.build_request(call)?;
        let Delivered { response, relayed } =
            send_with_relay(&self.client, request, self.relay.as_ref()).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // A relay status says nothing about the model's cold start.
            let hint = if relayed {
                ""
            } else {
                " (the model may still be loading; try again shortly)"
            };
            let message = relay_note(api_error_message(status.as_u16(), &body), relayed);
            return Err(LLMError::Api {
                status: status.as_u16(),
                message: format!("{message}{hint}"),
            });
        }

        let generation: GenerationResponse = parse_body(&body)?;
        extract_reply(generation)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f64,
    return_full_text: bool,
}

/// The API answers with either a batch of generations or a single one.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<Generation>),
    Single(Generation),
}

#[derive(Deserialize)]
struct Generation {
    generated_text: Option<String>,
}

fn extract_reply(response: GenerationResponse) -> Result<String, LLMError> {
    let text = match response {
        GenerationResponse::Batch(generations) => generations
            .into_iter()
            .next()
            .and_then(|g| g.generated_text)
            .filter(|text| !text.is_empty()),
        GenerationResponse::Single(generation) => generation.generated_text,
    };

    text.map(|text| text.trim().to_string())
        .ok_or_else(|| {
            LLMError::InvalidResponse("expected generated_text in response".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Provider, ProviderConfig, Role};

    fn adapter() -> HuggingFaceAdapter {
        HuggingFaceAdapter::new(Client::new(), HuggingFaceAdapter::DEFAULT_BASE_URL.to_string())
    }

    #[test]
    fn flatten_system_and_user() {
        let messages = [ChatMessage::system("A"), ChatMessage::user("B")];
        assert_eq!(flatten_prompt(&messages), "System: A\nUser: B\nAssistant:");
    }

    #[test]
    fn flatten_unknown_role_without_label() {
        let messages = [
            ChatMessage::user("ping"),
            ChatMessage::assistant("pong"),
            ChatMessage::new(Role::Other("narrator".to_string()), "Later that day"),
        ];
        assert_eq!(
            flatten_prompt(&messages),
            "User: ping\nAssistant: pong\nLater that day\nAssistant:"
        );
    }

    #[test]
    fn build_request_without_key_has_no_auth() {
        let config = ProviderConfig::new(Provider::HuggingFace, "mistralai/Mistral-7B-Instruct-v0.2");
        let messages = [ChatMessage::user("hi")];

        let request = adapter()
            .build_request(&ChatCall::new(&config, &messages))
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2"
        );
        assert!(request.headers().get("authorization").is_none());

        let body: serde_json::Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "inputs": "User: hi\nAssistant:",
                "parameters": {
                    "max_new_tokens": 500,
                    "temperature": 0.7,
                    "return_full_text": false
                }
            })
        );
    }

    #[test]
    fn build_request_attaches_optional_key() {
        let config = ProviderConfig::new(Provider::HuggingFace, "gpt2").with_api_key("hf_abc");
        let messages = [ChatMessage::user("hi")];

        let request = adapter()
            .build_request(&ChatCall::new(&config, &messages))
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer hf_abc");
    }

    #[test]
    fn model_url_keeps_reserved_characters_in_path() {
        let adapter = HuggingFaceAdapter::new(
            Client::new(),
            "https://api-inference.huggingface.co/models/".to_string(),
        );

        let url = adapter.model_url("org/model?wait_for_model=true#x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api-inference.huggingface.co/models/org/model%3Fwait_for_model=true%23x"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn model_url_rejects_invalid_base() {
        let adapter = HuggingFaceAdapter::new(Client::new(), "not a url".to_string());
        let err = adapter.model_url("gpt2").unwrap_err();
        assert!(matches!(err, LLMError::InvalidEndpoint { .. }));
    }

    #[test]
    fn extract_reply_from_batch() {
        let response: GenerationResponse =
            serde_json::from_str(r#"[{"generated_text":" Hello!\n"}]"#).unwrap();
        assert_eq!(extract_reply(response).unwrap(), "Hello!");
    }

    #[test]
    fn extract_reply_from_single_object() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"generated_text":"  Bonjour "}"#).unwrap();
        assert_eq!(extract_reply(response).unwrap(), "Bonjour");
    }

    #[test]
    fn extract_reply_rejects_other_shapes() {
        for body in [r#"[]"#, r#"[{"generated_text":""}]"#, r#"{"text":"nope"}"#] {
            let response: GenerationResponse = serde_json::from_str(body).unwrap();
            assert!(
                matches!(extract_reply(response), Err(LLMError::InvalidResponse(_))),
                "body {body} should be rejected"
            );
        }
    }
}
