//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::llm::{ChatError, ErrorOrigin};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

pub fn error(
    status: StatusCode,
    kind: impl Into<String>,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorBody>) {
    let body = ErrorBody {
        error: ErrorDetail {
            kind: kind.into(),
            message: message.into(),
        },
    };
    (status, Json(body))
}

pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    error(StatusCode::BAD_REQUEST, "bad_request", message)
}

/// Map a gateway failure onto an HTTP status by where it came from.
pub fn chat_error(err: &ChatError) -> (StatusCode, Json<ErrorBody>) {
    let status = match err.origin() {
        ErrorOrigin::Caller => StatusCode::BAD_REQUEST,
        ErrorOrigin::Remote | ErrorOrigin::Malformed => StatusCode::BAD_GATEWAY,
        ErrorOrigin::Network => StatusCode::GATEWAY_TIMEOUT,
    };
    let kind = serde_json::to_value(err.kind())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    error(status, kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMError;

    #[test]
    fn caller_errors_are_bad_requests() {
        let err = ChatError::new("nope", LLMError::UnsupportedProvider("nope".into()));
        let (status, Json(body)) = chat_error(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.kind, "unsupported_provider");
        assert!(body.error.message.contains("nope"));
    }

    #[test]
    fn remote_errors_are_bad_gateway() {
        let err = ChatError::new(
            "openrouter",
            LLMError::Api {
                status: 401,
                message: "Invalid API key".into(),
            },
        );
        let (status, Json(body)) = chat_error(&err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error.kind, "remote_api");
    }

    #[test]
    fn network_errors_are_gateway_timeout() {
        let err = ChatError::new(
            "ollama",
            LLMError::LocalServerUnreachable {
                endpoint: "http://localhost:11434/api/chat".into(),
                message: "connection refused".into(),
            },
        );
        let (status, _) = chat_error(&err);
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
