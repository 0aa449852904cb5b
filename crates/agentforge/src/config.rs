use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{DEFAULT_LOCAL_ENDPOINT, HuggingFaceAdapter, OpenRouterAdapter, Provider};

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Browser origins allowed to call the API. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    300
}

// ============================================================================
// ProvidersConfig
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Relay used when a hosted provider cannot be reached directly.
    #[serde(default)]
    pub relay: Option<RelayConfig>,
}

impl ProvidersConfig {
    pub fn default_model(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenRouter => &self.openrouter.default_model,
            Provider::HuggingFace => &self.huggingface.default_model,
            Provider::Ollama => &self.ollama.default_model,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_openrouter_url")]
    pub url: String,
    /// Sent as `HTTP-Referer` to identify the calling site.
    #[serde(default = "default_openrouter_referer")]
    pub referer: String,
    /// Sent as `X-Title`.
    #[serde(default = "default_openrouter_title")]
    pub title: String,
    #[serde(default = "default_openrouter_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            url: default_openrouter_url(),
            referer: default_openrouter_referer(),
            title: default_openrouter_title(),
            default_model: default_openrouter_model(),
        }
    }
}

fn default_openrouter_url() -> String {
    OpenRouterAdapter::DEFAULT_URL.to_string()
}

fn default_openrouter_referer() -> String {
    OpenRouterAdapter::DEFAULT_REFERER.to_string()
}

fn default_openrouter_title() -> String {
    OpenRouterAdapter::DEFAULT_TITLE.to_string()
}

fn default_openrouter_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

#[derive(Debug, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default = "default_huggingface_base_url")]
    pub base_url: String,
    #[serde(default = "default_huggingface_model")]
    pub default_model: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_huggingface_base_url(),
            default_model: default_huggingface_model(),
        }
    }
}

fn default_huggingface_base_url() -> String {
    HuggingFaceAdapter::DEFAULT_BASE_URL.to_string()
}

fn default_huggingface_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}

#[derive(Debug, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ollama_model")]
    pub default_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            default_model: default_ollama_model(),
        }
    }
}

fn default_ollama_endpoint() -> String {
    DEFAULT_LOCAL_ENDPOINT.to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    /// Base URL; the target is appended as the `url` query parameter.
    pub url: String,
}

// ============================================================================
// ChatConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    /// Trailing non-system messages kept when a conversation is forwarded.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

fn default_history_window() -> usize {
    20
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

// ============================================================================
// Tests
// ============================================================================
