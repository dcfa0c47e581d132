use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tradesim_core::SystemStatus;

use crate::main_lib::AppState;

async fn healthz() -> &'static str {
    "ok"
}

/// Operator status snapshot: database, providers and request metrics.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.status.get_status().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(get_status))
}
