//! LLM provider clients for chat completions.

mod error;
mod gateway;
mod huggingface;
mod ollama;
mod openrouter;
mod provider;
mod types;

pub use error::{ChatError, ErrorKind, ErrorOrigin, LLMError, error_envelope_message};
pub use gateway::ProviderGateway;
pub use huggingface::{HuggingFaceAdapter, flatten_prompt};
pub use ollama::OllamaAdapter;
pub use openrouter::OpenRouterAdapter;
pub use provider::{ChatAdapter, ChatCall, MAX_TOKENS, Relay, TEMPERATURE};
pub use types::{ChatMessage, DEFAULT_LOCAL_ENDPOINT, Provider, ProviderConfig, Role};
