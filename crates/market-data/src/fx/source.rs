//! Upstream lookups behind the exchange-rate cache.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::CurrencyPair;
use crate::provider::MarketDataProvider;

/// Something that can produce a spot rate for a currency pair.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<f64, MarketDataError>;
}

/// Rate source backed by a quote provider using the `{FROM}{TO}=X` symbol
/// convention.
pub struct ProviderRateSource {
    provider: Arc<dyn MarketDataProvider>,
}

impl ProviderRateSource {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RateSource for ProviderRateSource {
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<f64, MarketDataError> {
        let quote = self.provider.get_latest_quote(&pair.quote_symbol()).await?;
        Ok(quote.price)
    }
}
