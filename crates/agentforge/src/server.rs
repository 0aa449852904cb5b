use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

use crate::config::{Config, ProvidersConfig};
use crate::handlers;
use crate::llm::ProviderGateway;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ProviderGateway,
    pub providers: Arc<ProvidersConfig>,
    pub history_window: usize,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        Self {
            gateway: ProviderGateway::from_config(&config.providers),
            providers: Arc::new(config.providers),
            history_window: config.chat.history_window,
        }
    }
}

pub fn build_app(state: AppState, request_timeout_secs: u64, allowed_origins: &[String]) -> Router {
    let api_v1 = Router::new()
        .route("/providers", get(handlers::v1::list_providers))
        .route("/chat", post(handlers::v1::chat))
        .with_state(state.clone());

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
        .layer(cors_layer(allowed_origins))
}

/// CORS for browser UIs. An empty list allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid allowed origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
