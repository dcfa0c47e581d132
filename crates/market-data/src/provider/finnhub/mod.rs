//! Finnhub market data provider implementation.
//!
//! Latest quotes come from the `/quote` endpoint. Finnhub answers unknown
//! symbols with HTTP 200 and zeroed fields, so a zero price is treated as
//! not-found rather than as a quote.
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::http::ProviderHttp;
use crate::provider::{MarketDataProvider, DEFAULT_REQUEST_TIMEOUT};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";
const LIVENESS_SYMBOL: &str = "AAPL";

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // Note: d, dp, h, l, o, pc exist but are not used
}

/// Finnhub market data provider.
pub struct FinnhubProvider {
    http: ProviderHttp,
    api_key: Option<String>,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider. `None` or an empty key leaves it unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID, timeout),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn response_to_quote(symbol: &str, response: QuoteResponse) -> Result<Quote, MarketDataError> {
        let price = response.c.ok_or_else(|| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: "missing numeric field 'c'".to_string(),
        })?;

        if price <= 0.0 || response.t == Some(0) {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        let mut quote = Quote::new(symbol, price, PROVIDER_ID);
        if let Some(ts) = response.t.and_then(|t| Utc.timestamp_opt(t, 0).single()) {
            quote = quote.with_timestamp(ts);
        }
        Ok(quote)
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::NotConfigured {
                provider: PROVIDER_ID.to_string(),
            })?;

        // API key as header (more secure than query param)
        let request = self
            .http
            .get(&format!("{}/quote", BASE_URL))
            .header("X-Finnhub-Token", api_key)
            .query(&[("symbol", symbol)]);
        let response: QuoteResponse = self.http.get_json(request, symbol).await?;
        Self::response_to_quote(symbol, response)
    }

    async fn check_liveness(&self) -> Result<(), MarketDataError> {
        self.get_latest_quote(LIVENESS_SYMBOL).await.map(|_| ())
    }
}
