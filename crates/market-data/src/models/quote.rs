use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest market data quote for a single symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Symbol as sent to the provider (e.g. `AAPL`, `USDEUR=X`)
    pub symbol: String,

    /// Last traded / current price
    pub price: f64,

    /// Quote currency, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Source of the quote (YAHOO, FINNHUB, etc.)
    pub source: String,
}

impl Quote {
    /// Create a new quote stamped with the current time.
    pub fn new(symbol: impl Into<String>, price: f64, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            currency: None,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Set the quote currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Set the quote timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
