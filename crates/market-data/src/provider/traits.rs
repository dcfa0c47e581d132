//! Market data provider trait definitions.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::Quote;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source. The
/// health monitor only relies on [`is_configured`](Self::is_configured),
/// [`default_check_interval`](Self::default_check_interval) and
/// [`check_liveness`](Self::check_liveness); the quote endpoint and the
/// exchange-rate cache use [`get_latest_quote`](Self::get_latest_quote).
///
/// # Example
///
/// ```ignore
/// struct MyProvider {
///     api_key: Option<String>,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn is_configured(&self) -> bool {
///         self.api_key.is_some()
///     }
///
///     // ... implement quote and liveness methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "ALPHA_VANTAGE", etc.
    /// Used for logging and as the health record key.
    fn id(&self) -> &'static str;

    /// Whether the provider has everything it needs to make a request.
    ///
    /// Providers without a credential return false. Default is true.
    fn is_configured(&self) -> bool {
        true
    }

    /// How often the provider should be probed when no override is configured.
    ///
    /// Default is one hour, suitable for rate-limited keyed APIs.
    fn default_check_interval(&self) -> Duration {
        Duration::from_secs(60 * 60)
    }

    /// Fetch the latest quote for a provider-native symbol.
    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Perform one minimal read and judge the provider alive.
    ///
    /// Implementations must check that the expected field is present and has
    /// the expected type; an HTTP 200 with an unexpected payload is a failure.
    async fn check_liveness(&self) -> Result<(), MarketDataError>;
}
