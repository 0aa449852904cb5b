//! Chat and provider discovery handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::agent::AgentProfile;
use crate::llm::{ChatMessage, Provider, Role};
use crate::response;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ChatRequestBody {
    provider: String,
    /// Falls back to the provider's configured default model.
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    agent: Option<AgentProfile>,
}

#[derive(Serialize)]
pub struct ChatResponseBody {
    message_id: String,
    role: Role,
    content: String,
}

#[derive(Serialize)]
pub struct ListProvidersResponse {
    providers: Vec<ProviderInfo>,
}

#[derive(Serialize)]
pub struct ProviderInfo {
    id: Provider,
    default_model: String,
    requires_api_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_endpoint: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/providers
pub async fn list_providers(State(state): State<AppState>) -> Json<ListProvidersResponse> {
    let providers = Provider::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            id: provider,
            default_model: state.providers.default_model(provider).to_string(),
            requires_api_key: provider.requires_api_key(),
            default_endpoint: (provider == Provider::Ollama)
                .then(|| state.providers.ollama.endpoint.clone()),
        })
        .collect();

    Json(ListProvidersResponse { providers })
}

/// POST /api/v1/chat
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequestBody>) -> Response {
    if req.messages.is_empty() {
        return response::bad_request("messages must not be empty").into_response();
    }

    let model = req
        .model
        .filter(|m| !m.is_empty())
        .or_else(|| {
            req.provider
                .parse::<Provider>()
                .ok()
                .map(|p| state.providers.default_model(p).to_string())
        })
        .unwrap_or_default();

    let agent = req.agent.unwrap_or_default();
    let messages = agent.conversation(&req.messages, state.history_window);

    let reply = state
        .gateway
        .send_chat(
            &req.provider,
            &model,
            &messages,
            req.api_key.as_deref(),
            req.endpoint.as_deref(),
            None,
        )
        .await;

    match reply {
        Ok(content) => {
            let body = ChatResponseBody {
                message_id: ulid::Ulid::new().to_string(),
                role: Role::Assistant,
                content,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => response::chat_error(&e).into_response(),
    }
}
