use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Router};

use crate::main_lib::AppState;

async fn reset_metrics(State(state): State<Arc<AppState>>) -> StatusCode {
    state.request_tracker.reset();
    tracing::info!("Request metrics reset by operator");
    StatusCode::NO_CONTENT
}

async fn clear_fx_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.fx_cache.clear();
    StatusCode::NO_CONTENT
}

async fn reset_provider_health(State(state): State<Arc<AppState>>) -> StatusCode {
    state.provider_health.reset();
    StatusCode::NO_CONTENT
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/metrics/reset", post(reset_metrics))
        .route("/admin/fx-cache/clear", post(clear_fx_cache))
        .route("/admin/provider-health/reset", post(reset_provider_health))
}
