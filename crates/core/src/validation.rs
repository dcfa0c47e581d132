//! Input primitives applied before symbols or free text reach a provider.

use std::sync::LazyLock;

use regex::Regex;
use tradesim_market_data::is_supported_currency;

use crate::errors::ValidationError;

/// Longest free-text value kept by [`sanitize_input`], in characters.
pub const MAX_INPUT_LENGTH: usize = 1000;

/// Longest ticker accepted by [`validate_symbol`].
pub const MAX_SYMBOL_LENGTH: usize = 20;

/// Tickers, indices (`^GSPC`), share classes (`BRK.B`, `BF-B`) and FX pairs (`USDEUR=X`).
static SYMBOL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\^?[A-Z0-9][A-Z0-9.\-=]*$").expect("Invalid regex pattern")
});

/// Normalizes a ticker symbol and checks its format.
///
/// Returns the trimmed, upper-cased symbol.
pub fn validate_symbol(symbol: &str) -> Result<String, ValidationError> {
    let normalized = symbol.trim().to_uppercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }
    if normalized.chars().count() > MAX_SYMBOL_LENGTH || !SYMBOL_REGEX.is_match(&normalized) {
        return Err(ValidationError::MalformedSymbol(normalized));
    }

    Ok(normalized)
}

/// Strips markup brackets and control characters, trims, and caps the length.
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>') && !c.is_control())
        .take(MAX_INPUT_LENGTH)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalizes a currency code and checks it against the supported list.
pub fn validate_currency(code: &str) -> Result<String, ValidationError> {
    let normalized = code.trim().to_uppercase();
    if is_supported_currency(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::UnsupportedCurrency(normalized))
    }
}

pub fn validate_amount(amount: f64) -> Result<f64, ValidationError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(ValidationError::InvalidAmount(amount.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_symbol_accepts_common_formats() {
        for symbol in ["AAPL", "brk.b", "BF-B", "^GSPC", "USDEUR=X", " msft "] {
            assert!(validate_symbol(symbol).is_ok(), "symbol: {}", symbol);
        }
        assert_eq!(validate_symbol(" msft ").unwrap(), "MSFT");
    }

    #[test]
    fn test_validate_symbol_rejects_malformed() {
        assert_eq!(validate_symbol("   "), Err(ValidationError::EmptySymbol));
        assert!(matches!(
            validate_symbol("AAPL; DROP TABLE"),
            Err(ValidationError::MalformedSymbol(_))
        ));
        assert!(validate_symbol(".AAPL").is_err());
        assert!(validate_symbol("A".repeat(21).as_str()).is_err());
        assert!(validate_symbol("<script>").is_err());
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  hello  "), "hello");
        assert_eq!(
            sanitize_input("<script>alert(1)</script>"),
            "scriptalert(1)/script"
        );
        assert_eq!(sanitize_input("line\u{0}break\r\n"), "linebreak");
        assert_eq!(sanitize_input(&"x".repeat(5000)).len(), MAX_INPUT_LENGTH);
    }

    #[test]
    fn test_validate_currency() {
        assert_eq!(validate_currency(" eur").unwrap(), "EUR");
        assert_eq!(
            validate_currency("XYZ"),
            Err(ValidationError::UnsupportedCurrency("XYZ".to_string()))
        );
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(12.5), Ok(12.5));
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }
}
