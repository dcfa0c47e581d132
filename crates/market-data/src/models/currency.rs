//! Supported currencies and FX pair symbols.
//!
//! The list is shared with the currency-formatting code in the UI layer, so
//! order and membership are part of the public contract.

use std::fmt;

use crate::errors::MarketDataError;

/// Currencies that can be converted between. ISO 4217 codes.
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "CNY", "INR", "BRL", "MXN", "KRW",
];

/// Returns true if `code` is in [`SUPPORTED_CURRENCIES`] (case-sensitive).
pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// A directed currency pair, normalised to upper case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    /// Build a pair from raw codes, rejecting currencies outside the supported list.
    pub fn new(from: &str, to: &str) -> Result<Self, MarketDataError> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();
        for code in [&from, &to] {
            if !is_supported_currency(code) {
                return Err(MarketDataError::UnsupportedCurrency(code.clone()));
            }
        }
        Ok(Self { from, to })
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Upstream quote symbol, e.g. `USDEUR=X`.
    pub fn quote_symbol(&self) -> String {
        format!("{}{}=X", self.from, self.to)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_symbol_convention() {
        let pair = CurrencyPair::new("usd", "eur").unwrap();
        assert_eq!(pair.quote_symbol(), "USDEUR=X");
        assert_eq!(pair.to_string(), "USD/EUR");
    }

    #[test]
    fn test_unsupported_currency_rejected() {
        let err = CurrencyPair::new("USD", "XYZ").unwrap_err();
        assert!(matches!(err, MarketDataError::UnsupportedCurrency(code) if code == "XYZ"));
    }

    #[test]
    fn test_identity_pair() {
        assert!(CurrencyPair::new("BRL", "brl").unwrap().is_identity());
        assert!(!CurrencyPair::new("USD", "BRL").unwrap().is_identity());
    }
}
