//! Market data models
//!
//! - `quote` - Latest quote returned by a provider (Quote)
//! - `currency` - Supported currency list and FX pair symbols (CurrencyPair)

mod currency;
mod quote;

pub use currency::{is_supported_currency, CurrencyPair, SUPPORTED_CURRENCIES};
pub use quote::Quote;
