use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tradesim_core::errors::ValidationError;
use tradesim_core::validation::{validate_amount, validate_currency};

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Serialize)]
struct RatesResponse {
    base: String,
    rates: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct RateResponse {
    from: String,
    to: String,
    rate: f64,
}

#[derive(Deserialize)]
struct ConvertQuery {
    amount: f64,
    from: String,
    to: String,
}

#[derive(Serialize)]
struct ConvertResponse {
    amount: f64,
    from: String,
    to: String,
    converted: f64,
    rate: f64,
}

async fn get_all_rates(
    State(state): State<Arc<AppState>>,
    Path(base): Path<String>,
) -> ApiResult<Json<RatesResponse>> {
    let base = validate_currency(&base)?;
    let rates = state.fx_cache.get_all_rates(&base).await;
    Ok(Json(RatesResponse { base, rates }))
}

async fn get_rate(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(String, String)>,
) -> ApiResult<Json<RateResponse>> {
    let from = validate_currency(&from)?;
    let to = validate_currency(&to)?;
    let rate = state.fx_cache.get_rate(&from, &to).await;
    Ok(Json(RateResponse { from, to, rate }))
}

async fn convert(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let Query(query) = query.map_err(|e| ValidationError::MalformedQuery(e.body_text()))?;
    let amount = validate_amount(query.amount)?;
    let from = validate_currency(&query.from)?;
    let to = validate_currency(&query.to)?;

    // One lookup so `converted` and `rate` always agree.
    let rate = state.fx_cache.get_rate(&from, &to).await;
    Ok(Json(ConvertResponse {
        amount,
        from,
        to,
        converted: amount * rate,
        rate,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exchange-rates/convert", get(convert))
        .route("/exchange-rates/{base}", get(get_all_rates))
        .route("/exchange-rates/{from}/{to}", get(get_rate))
}
