use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tradesim_core::validation::{sanitize_input, validate_symbol};
use tradesim_market_data::{ProviderHealthRecord, Quote};

use crate::{error::ApiResult, main_lib::AppState};

/// Latest quote from the primary provider.
async fn get_latest_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Quote>> {
    let symbol = validate_symbol(&sanitize_input(&symbol))?;
    let quote = state.quote_provider.get_latest_quote(&symbol).await?;
    Ok(Json(quote))
}

/// Current provider health records, without probing.
async fn get_provider_health(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ProviderHealthRecord>> {
    Json(state.provider_health.snapshot())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/market-data/quotes/{symbol}", get(get_latest_quote))
        .route("/market-data/providers", get(get_provider_health))
}
