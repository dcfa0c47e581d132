use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tradesim_core::errors::{
    classify, AppEnvironment, ClassifiedError, Error as CoreError, ValidationError,
};
use tradesim_market_data::MarketDataError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Core(err.into())
    }
}

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        ApiError::Core(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

/// Renders the `{ code, message }` body for a classified error.
pub fn render_error(classified: &ClassifiedError, environment: AppEnvironment) -> Response {
    let status =
        StatusCode::from_u16(classified.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(ErrorBody {
        code: status.as_u16(),
        message: classified.public_message(environment).to_string(),
    });
    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match self {
            ApiError::Core(e) => e,
            ApiError::Anyhow(e) => CoreError::Unexpected(e),
        };
        let classified = classify(&error);

        if classified.is_operational {
            tracing::debug!(status = classified.status_code, "Request failed: {}", error);
        } else {
            tracing::error!("Unhandled error: {:?}", error);
        }

        // Production-safe body; the request middleware re-renders it for the
        // configured environment using the extension below.
        let mut response = render_error(&classified, AppEnvironment::Production);
        response.extensions_mut().insert(classified);
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
