use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tradesim_core::ClassifiedError;

use crate::{config::Config, error::render_error, main_lib::AppState};

mod admin;
mod exchange_rates;
mod market_data;
mod status;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let api = Router::new()
        .merge(status::router())
        .merge(exchange_rates::router())
        .merge(market_data::router())
        .merge(admin::router());

    Router::new()
        .nest("/api/v1", api)
        .with_state(state.clone())
        .layer(cors)
        // Propagate sits inside Set so it sees the generated id.
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(middleware::from_fn_with_state(state, track_requests))
        .layer(TraceLayer::new_for_http())
}

/// Records every request in the tracker and renders classified errors for
/// the configured environment.
async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let guard = state.request_tracker.start_request();

    let mut response = next.run(request).await;
    if let Some(classified) = response.extensions_mut().remove::<ClassifiedError>() {
        let (_, body) = render_error(&classified, state.environment).into_parts();
        *response.body_mut() = body;
    }

    guard.finish(response.status().as_u16());
    response
}
