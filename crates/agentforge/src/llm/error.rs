//! LLM error types.

use serde::Serialize;
use thiserror::Error;

use super::types::Provider;

/// Errors that can occur when making LLM API calls.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Provider identifier outside the registered set
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Required API key absent or empty
    #[error("{provider} requires an API key")]
    MissingCredentials { provider: Provider },

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response with a body of unexpected shape
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// Direct request unreachable and the relay retry failed too
    #[error("request blocked and relay fallback failed: {0}")]
    RelayFallback(String),

    /// Endpoint string that does not parse as an absolute URL
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Local chat server could not be reached
    #[error(
        "cannot reach local server at {endpoint} ({message}); make sure it is running \
         and accepts requests from this origin (OLLAMA_ORIGINS)"
    )]
    LocalServerUnreachable { endpoint: String, message: String },

    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Caller cancelled the call
    #[error("request cancelled")]
    Cancelled,
}

/// Programmatic classification of an [`LLMError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedProvider,
    MissingCredentials,
    RemoteApi,
    InvalidResponse,
    RelayFallback,
    InvalidEndpoint,
    LocalServerUnreachable,
    Transport,
    Cancelled,
}

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    /// Bad input from the caller; retrying unchanged will fail again.
    Caller,
    /// Transport-level failure (connection refused, blocked origin, relay).
    Network,
    /// The remote API reported an error.
    Remote,
    /// The remote API answered with a body we could not interpret.
    Malformed,
}

impl LLMError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LLMError::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            LLMError::MissingCredentials { .. } => ErrorKind::MissingCredentials,
            LLMError::Api { .. } => ErrorKind::RemoteApi,
            LLMError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            LLMError::RelayFallback(_) => ErrorKind::RelayFallback,
            LLMError::InvalidEndpoint { .. } => ErrorKind::InvalidEndpoint,
            LLMError::LocalServerUnreachable { .. } => ErrorKind::LocalServerUnreachable,
            LLMError::Request(_) => ErrorKind::Transport,
            LLMError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl ErrorKind {
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            ErrorKind::UnsupportedProvider
            | ErrorKind::MissingCredentials
            | ErrorKind::InvalidEndpoint
            | ErrorKind::Cancelled => ErrorOrigin::Caller,
            ErrorKind::RemoteApi => ErrorOrigin::Remote,
            ErrorKind::InvalidResponse => ErrorOrigin::Malformed,
            ErrorKind::RelayFallback
            | ErrorKind::LocalServerUnreachable
            | ErrorKind::Transport => ErrorOrigin::Network,
        }
    }
}

/// The single failure shape returned by the gateway, whichever adapter failed.
#[derive(Debug, Error)]
#[error("failed to get response from {provider}: {source}")]
pub struct ChatError {
    pub provider: String,
    pub source: LLMError,
}

impl ChatError {
    pub fn new(provider: impl Into<String>, source: LLMError) -> Self {
        Self {
            provider: provider.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn origin(&self) -> ErrorOrigin {
        self.kind().origin()
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// Understands `{"error": {"message": ".."}}` and `{"error": ".."}`.
pub fn error_envelope_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Message for a failed response: the envelope text, or the bare status.
pub(crate) fn api_error_message(status: u16, body: &str) -> String {
    error_envelope_message(body).unwrap_or_else(|| format!("HTTP {status}"))
}
