//! Tradesim Market Data Crate
//!
//! Upstream market-data access for the trading simulator, built to keep
//! unreliable third-party providers from hurting request handling.
//!
//! # Overview
//!
//! - Multiple providers: Yahoo Finance (keyless primary), Alpha Vantage,
//!   Finnhub and MarketData.app (keyed, optional)
//! - Sampled provider health: per-provider check intervals and credential
//!   preconditions, no background timers
//! - A TTL exchange-rate cache with single-flight lookups and a neutral
//!   fallback rate
//!
//! # Architecture
//!
//! ```text
//! +------------------------+      +-------------------------+
//! | ProviderHealthMonitor  |      |   ExchangeRateCache     |
//! | (one record/provider)  |      | (TTL + in-flight map)   |
//! +------------------------+      +-------------------------+
//!             |                               |
//!             v                               v
//!   check_liveness()                 RateSource::fetch_rate()
//!             |                               |
//!             +---------------+---------------+
//!                             v
//!                  +---------------------+
//!                  | MarketDataProvider  |  (Yahoo, Alpha Vantage, ...)
//!                  +---------------------+
//! ```

pub mod errors;
pub mod fx;
pub mod health;
pub mod models;
pub mod provider;

pub use errors::MarketDataError;
pub use fx::{ExchangeRateCache, ProviderRateSource, RateSource, FALLBACK_RATE};
pub use health::{ProviderHealthMonitor, ProviderHealthRecord};
pub use models::{is_supported_currency, CurrencyPair, Quote, SUPPORTED_CURRENCIES};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::marketdata_app::MarketDataAppProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::MarketDataProvider;
