//! Error types for the market data crate.
//!
//! Every upstream failure is mapped into a [`MarketDataError`] at the lowest
//! level (the HTTP helper or the provider), so callers never see raw
//! transport errors and the server can classify failures by variant instead
//! of by message text.

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    /// This is a terminal error - retrying won't help.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429 or an in-body notice).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider has no credential configured, so no request was made.
    #[error("Provider not configured: {provider}")]
    NotConfigured {
        /// The provider missing its credential
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The response arrived but did not carry the expected field.
    #[error("Unexpected response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the malformed payload
        provider: String,
        /// What was missing or mistyped
        message: String,
    },

    /// The currency code is not in the supported list.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns true for failures that may clear up on their own
    /// (throttling, timeouts, dropped connections).
    ///
    /// ```
    /// use tradesim_market_data::errors::MarketDataError;
    ///
    /// let error = MarketDataError::Timeout { provider: "YAHOO".to_string() };
    /// assert!(error.is_transient());
    ///
    /// let error = MarketDataError::SymbolNotFound("ZZZZ".to_string());
    /// assert!(!error.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::SymbolNotFound(_)
            | Self::NotConfigured { .. }
            | Self::ProviderError { .. }
            | Self::InvalidResponse { .. }
            | Self::UnsupportedCurrency(_) => false,
        }
    }
}
