//! Alpha Vantage market data provider implementation.
//!
//! Latest quotes come from the GLOBAL_QUOTE endpoint. Alpha Vantage reports
//! throttling and bad symbols in the body of an HTTP 200 response
//! (`Note` / `Information` / `Error Message`), so those keys are checked
//! before the quote itself.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute.

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::http::ProviderHttp;
use crate::provider::{MarketDataProvider, DEFAULT_REQUEST_TIMEOUT};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const LIVENESS_SYMBOL: &str = "IBM";

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    http: ProviderHttp,
    api_key: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Alpha Vantage encodes numbers as strings.
#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider. `None` or an empty key leaves it unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID, timeout),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn response_to_quote(
        symbol: &str,
        response: GlobalQuoteResponse,
    ) -> Result<Quote, MarketDataError> {
        // "Note" usually indicates rate limiting
        if let Some(note) = response.note {
            warn!("Alpha Vantage rate limit notice: {}", note);
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        // "Information" is used both for throttling and for premium-only endpoints
        if let Some(info) = response.information {
            if info.to_lowercase().contains("rate limit") {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: info,
            });
        }

        if response.error_message.is_some() {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        // An unknown symbol yields an empty "Global Quote" object
        let quote = response
            .global_quote
            .filter(|q| q.symbol.is_some())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = quote
            .price
            .as_deref()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: "missing numeric field '05. price'".to_string(),
            })?;

        Ok(Quote::new(
            quote.symbol.unwrap_or_else(|| symbol.to_string()),
            price,
            PROVIDER_ID,
        ))
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
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

        let request = self.http.get(BASE_URL).query(&[
            ("function", "GLOBAL_QUOTE"),
            ("symbol", symbol),
            ("apikey", api_key),
        ]);
        let response: GlobalQuoteResponse = self.http.get_json(request, symbol).await?;
        Self::response_to_quote(symbol, response)
    }

    async fn check_liveness(&self) -> Result<(), MarketDataError> {
        self.get_latest_quote(LIVENESS_SYMBOL).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GlobalQuoteResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_global_quote_parses_string_price() {
        let response =
            parse(r#"{"Global Quote":{"01. symbol":"IBM","05. price":"135.2300"}}"#);
        let quote = AlphaVantageProvider::response_to_quote("IBM", response).unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.price, 135.23);
    }

    #[test]
    fn test_note_is_rate_limit() {
        let response = parse(r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#);
        let err = AlphaVantageProvider::response_to_quote("IBM", response).unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_empty_global_quote_is_not_found() {
        let response = parse(r#"{"Global Quote":{}}"#);
        let err = AlphaVantageProvider::response_to_quote("ZZZZ", response).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_non_numeric_price_is_invalid() {
        let response = parse(r#"{"Global Quote":{"01. symbol":"IBM","05. price":"n/a"}}"#);
        let err = AlphaVantageProvider::response_to_quote("IBM", response).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        assert!(!AlphaVantageProvider::new(None).is_configured());
        assert!(!AlphaVantageProvider::new(Some("  ".to_string())).is_configured());
        assert!(AlphaVantageProvider::new(Some("demo".to_string())).is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_quote_fails_without_request() {
        let provider = AlphaVantageProvider::new(None);
        let err = provider.get_latest_quote("IBM").await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotConfigured { .. }));
    }
}
