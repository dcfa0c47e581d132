//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - A shared HTTP helper that maps transport and status failures into
//!   `MarketDataError`
//! - Concrete provider implementations (Yahoo, Alpha Vantage, Finnhub,
//!   MarketData.app)
//!
//! Providers that need a credential take it as `Option<String>`; a provider
//! built without one reports `is_configured() == false` and is never called
//! by the health monitor.

mod http;
mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod marketdata_app;
pub mod yahoo;

pub use traits::MarketDataProvider;

/// Default HTTP request timeout for provider clients.
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
