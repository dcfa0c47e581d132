//! MarketData.app provider implementation.
//!
//! Equities only, Bearer token authentication.
//!
//! # API Endpoints
//!
//! - Latest price: `https://api.marketdata.app/v1/stocks/prices/{symbol}/`
//!
//! # Response Format
//!
//! The API returns parallel arrays with a status field `s` indicating
//! success ("ok"), no data ("no_data") or an error ("error" + `errmsg`).

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::http::ProviderHttp;
use crate::provider::{MarketDataProvider, DEFAULT_REQUEST_TIMEOUT};

const BASE_URL: &str = "https://api.marketdata.app/v1";
const PROVIDER_ID: &str = "MARKETDATA_APP";
const LIVENESS_SYMBOL: &str = "AAPL";

/// Response from the prices endpoint for latest quote.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    /// Status: "ok", "no_data" or "error"
    s: String,
    /// Mid price (average of bid and ask)
    #[serde(default)]
    mid: Option<Vec<f64>>,
    /// Unix timestamps of last update
    #[serde(default)]
    updated: Option<Vec<i64>>,
    #[serde(default)]
    errmsg: Option<String>,
}

/// MarketData.app provider for fetching equity market data.
pub struct MarketDataAppProvider {
    http: ProviderHttp,
    api_key: Option<String>,
}

impl MarketDataAppProvider {
    /// Create a new MarketData.app provider. `None` or an empty token leaves it unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID, timeout),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn response_to_quote(symbol: &str, response: PriceResponse) -> Result<Quote, MarketDataError> {
        match response.s.as_str() {
            "ok" => {}
            "no_data" => return Err(MarketDataError::SymbolNotFound(symbol.to_string())),
            _ => {
                let message = response.errmsg.unwrap_or(response.s);
                if message.to_lowercase().contains("not found") {
                    return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
                }
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message,
                });
            }
        }

        let price = response
            .mid
            .and_then(|m| m.first().copied())
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: "missing numeric field 'mid'".to_string(),
            })?;

        let mut quote = Quote::new(symbol, price, PROVIDER_ID).with_currency("USD");
        if let Some(ts) = response
            .updated
            .and_then(|u| u.first().copied())
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
        {
            quote = quote.with_timestamp(ts);
        }
        Ok(quote)
    }
}

#[async_trait]
impl MarketDataProvider for MarketDataAppProvider {
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

        let url = format!("{}/stocks/prices/{}/", BASE_URL, encode(symbol));
        let request = self.http.get(&url).bearer_auth(api_key);
        let response: PriceResponse = self.http.get_json(request, symbol).await?;
        Self::response_to_quote(symbol, response)
    }

    async fn check_liveness(&self) -> Result<(), MarketDataError> {
        self.get_latest_quote(LIVENESS_SYMBOL).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_uses_first_mid() {
        let response: PriceResponse =
            serde_json::from_str(r#"{"s":"ok","mid":[189.25],"updated":[1700000000]}"#).unwrap();
        let quote = MarketDataAppProvider::response_to_quote("AAPL", response).unwrap();
        assert_eq!(quote.price, 189.25);
        assert_eq!(quote.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_no_data_is_not_found() {
        let response: PriceResponse = serde_json::from_str(r#"{"s":"no_data"}"#).unwrap();
        let err = MarketDataAppProvider::response_to_quote("ZZZZ", response).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_ok_without_mid_is_invalid() {
        let response: PriceResponse = serde_json::from_str(r#"{"s":"ok"}"#).unwrap();
        let err = MarketDataAppProvider::response_to_quote("AAPL", response).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));
    }
}
