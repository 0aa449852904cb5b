//! Common types for provider chat calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LLMError;

/// Loopback chat endpoint of a locally-running Ollama server.
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434/api/chat";

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The role of a message sender.
///
/// Unknown role strings are kept verbatim so they can be relayed to providers
/// that accept them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(role) => role,
        }
    }

    /// Speaker label used when a conversation is flattened into a prompt.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Role::System => Some("System"),
            Role::User => Some("User"),
            Role::Assistant => Some("Assistant"),
            Role::Other(_) => None,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

/// Chat API backends known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Key-authenticated hosted router (chat-completions API).
    OpenRouter,
    /// Free-tier inference host (prompt-completion API, one model per path).
    HuggingFace,
    /// Locally-running chat server.
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenRouter, Provider::HuggingFace, Provider::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::HuggingFace => "huggingface",
            Provider::Ollama => "ollama",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Provider::OpenRouter)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openrouter" => Ok(Provider::OpenRouter),
            "huggingface" => Ok(Provider::HuggingFace),
            "ollama" => Ok(Provider::Ollama),
            other => Err(LLMError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Everything needed to address one provider for one call.
///
/// `api_key` is required for [`Provider::OpenRouter`], optional for
/// [`Provider::HuggingFace`] and ignored for [`Provider::Ollama`]. `endpoint`
/// only applies to [`Provider::Ollama`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            endpoint: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}
