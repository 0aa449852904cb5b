use axum::extract::State;
use axum::http::StatusCode;

use crate::llm::Provider;
use crate::server::AppState;

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Ready once every built-in provider has an adapter.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if Provider::ALL.iter().all(|p| state.gateway.get(*p).is_some()) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "providers not registered")
    }
}
