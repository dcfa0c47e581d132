//! Yahoo Finance chart API response models.

use serde::Deserialize;

/// Top-level response from `/v8/finance/chart/{symbol}`.
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

#[derive(Debug, Deserialize)]
pub struct YahooChart {
    #[serde(default)]
    pub result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    pub error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
}

/// Only the fields needed for a latest quote; the API returns many more.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}
