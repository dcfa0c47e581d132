//! Yahoo Finance market data provider.
//!
//! Keyless, low-latency primary provider. Quotes come from the chart API's
//! `meta` block, which also covers FX pairs in the `{FROM}{TO}=X` form
//! (e.g. `USDEUR=X`).

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::http::ProviderHttp;
use crate::provider::{MarketDataProvider, DEFAULT_REQUEST_TIMEOUT};

use models::YahooChartResponse;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROVIDER_ID: &str = "YAHOO";

/// Symbol fetched by the liveness probe.
const LIVENESS_SYMBOL: &str = "AAPL";

/// Primary provider is cheap to call, so it is sampled every minute.
const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    http: ProviderHttp,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with the default request timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a provider whose HTTP client gives up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: ProviderHttp::new(PROVIDER_ID, timeout),
        }
    }

    /// Convert a chart response into a quote.
    ///
    /// The `regularMarketPrice` field must be present and numeric.
    fn chart_to_quote(
        symbol: &str,
        response: YahooChartResponse,
    ) -> Result<Quote, MarketDataError> {
        if let Some(error) = response.chart.error {
            return if error.code.eq_ignore_ascii_case("Not Found") {
                Err(MarketDataError::SymbolNotFound(symbol.to_string()))
            } else {
                Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: error.description.unwrap_or(error.code),
                })
            };
        }

        let meta = response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|result| result.meta)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let price = meta
            .regular_market_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: "missing numeric field 'regularMarketPrice'".to_string(),
            })?;

        let quote_symbol = meta.symbol.unwrap_or_else(|| symbol.to_string());
        let mut quote = Quote::new(quote_symbol, price, PROVIDER_ID);
        if let Some(currency) = meta.currency {
            quote = quote.with_currency(currency);
        }
        if let Some(ts) = meta
            .regular_market_time
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        {
            quote = quote.with_timestamp(ts);
        }
        Ok(quote)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn default_check_interval(&self) -> Duration {
        CHECK_INTERVAL
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let url = format!("{}/{}", BASE_URL, encode(symbol));
        let request = self
            .http
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1d")]);
        let response: YahooChartResponse = self.http.get_json(request, symbol).await?;
        Self::chart_to_quote(symbol, response)
    }

    async fn check_liveness(&self) -> Result<(), MarketDataError> {
        self.get_latest_quote(LIVENESS_SYMBOL).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> YahooChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_chart_to_quote_reads_meta() {
        let response = parse(
            r#"{"chart":{"result":[{"meta":{"symbol":"USDEUR=X","currency":"EUR",
                "regularMarketPrice":0.92,"regularMarketTime":1700000000}}],"error":null}}"#,
        );
        let quote = YahooProvider::chart_to_quote("USDEUR=X", response).unwrap();
        assert_eq!(quote.symbol, "USDEUR=X");
        assert_eq!(quote.price, 0.92);
        assert_eq!(quote.currency.as_deref(), Some("EUR"));
        assert_eq!(quote.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(quote.source, "YAHOO");
    }

    #[test]
    fn test_missing_price_is_invalid_response() {
        let response = parse(r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"}}],"error":null}}"#);
        let err = YahooProvider::chart_to_quote("AAPL", response).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse { .. }));
    }

    #[test]
    fn test_mistyped_price_fails_to_parse() {
        let result: Result<YahooChartResponse, _> = serde_json::from_str(
            r#"{"chart":{"result":[{"meta":{"regularMarketPrice":"n/a"}}],"error":null}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_not_found_error_maps_to_symbol_not_found() {
        let response = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        let err = YahooProvider::chart_to_quote("ZZZZ", response).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(s) if s == "ZZZZ"));
    }

    #[test]
    fn test_primary_interval_is_one_minute() {
        let provider = YahooProvider::new();
        assert!(provider.is_configured());
        assert_eq!(provider.default_check_interval(), Duration::from_secs(60));
    }
}
