use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tradesim_market_data::MarketDataError;

use super::Error;

const SYMBOL_NOT_FOUND: &str = "Symbol not found";
const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded. Please try again later.";
const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable";
const INTERNAL_ERROR: &str = "Internal server error";

const NOT_FOUND_SIGNATURES: &[&str] = &["not found", "invalid symbol"];
const RATE_LIMIT_SIGNATURES: &[&str] = &["rate limit", "too many requests"];

/// A bare 429 status code, not digits inside a larger number.
static STATUS_429: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b429\b").expect("Invalid regex pattern"));

const UNAVAILABLE_SIGNATURES: &[&str] = &[
    "timeout",
    "timed out",
    "econnreset",
    "connection reset",
    "etimedout",
];

/// The error taxonomy exposed to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    RateLimited,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Message used when an upstream failure is reclassified into this kind.
    fn canonical_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Invalid request",
            ErrorKind::NotFound => SYMBOL_NOT_FOUND,
            ErrorKind::RateLimited => RATE_LIMIT_EXCEEDED,
            ErrorKind::Unavailable => SERVICE_UNAVAILABLE,
            ErrorKind::Internal => INTERNAL_ERROR,
        }
    }
}

/// Deployment mode; decides how much of a non-operational error reaches clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    Development,
    #[default]
    Production,
}

impl AppEnvironment {
    pub fn is_development(self) -> bool {
        matches!(self, AppEnvironment::Development)
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnvironment::Development),
            "production" | "prod" => Ok(AppEnvironment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnvironment::Development => write!(f, "development"),
            AppEnvironment::Production => write!(f, "production"),
        }
    }
}

/// The uniform, client-safe shape every failure is reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// The real message. For non-operational errors this is internal detail.
    pub message: String,
    pub status_code: u16,
    pub is_operational: bool,
}

impl ClassifiedError {
    fn operational(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: kind.status_code(),
            is_operational: true,
        }
    }

    fn reclassified(kind: ErrorKind) -> Self {
        Self::operational(kind, kind.canonical_message())
    }

    fn internal(message: String) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message,
            status_code: ErrorKind::Internal.status_code(),
            is_operational: false,
        }
    }

    /// The message sent to the client.
    pub fn public_message(&self, environment: AppEnvironment) -> &str {
        if self.is_operational || environment.is_development() {
            &self.message
        } else {
            INTERNAL_ERROR
        }
    }
}

/// Maps any [`Error`] to a status code and message.
///
/// Declared errors keep their status and message. Undeclared errors are
/// matched against known upstream signatures (not-found, rate-limit,
/// timeout/connection-reset) and fall back to a non-operational 500.
///
/// ```
/// use tradesim_core::errors::{classify, Error};
///
/// let classified = classify(&Error::Unexpected(anyhow::anyhow!("Invalid symbol: ZZZZ")));
/// assert_eq!(classified.status_code, 404);
/// assert_eq!(classified.message, "Symbol not found");
/// ```
pub fn classify(error: &Error) -> ClassifiedError {
    match error {
        Error::Validation(e) => ClassifiedError::operational(ErrorKind::Validation, e.to_string()),
        Error::NotFound(message) => ClassifiedError::operational(ErrorKind::NotFound, message),
        Error::RateLimited(message) => {
            ClassifiedError::operational(ErrorKind::RateLimited, message)
        }
        Error::Unavailable(message) => {
            ClassifiedError::operational(ErrorKind::Unavailable, message)
        }
        Error::MarketData(e) => classify_market_data(e),
        Error::Database(e) => by_signature(&e.to_string()),
        // `{:#}` includes the whole context chain.
        Error::Unexpected(e) => by_signature(&format!("{:#}", e)),
    }
}

fn classify_market_data(error: &MarketDataError) -> ClassifiedError {
    match error {
        MarketDataError::SymbolNotFound(_) => ClassifiedError::reclassified(ErrorKind::NotFound),
        MarketDataError::RateLimited { .. } => {
            ClassifiedError::reclassified(ErrorKind::RateLimited)
        }
        MarketDataError::Timeout { .. } | MarketDataError::NotConfigured { .. } => {
            ClassifiedError::reclassified(ErrorKind::Unavailable)
        }
        MarketDataError::UnsupportedCurrency(_) => {
            ClassifiedError::operational(ErrorKind::Validation, error.to_string())
        }
        MarketDataError::Network(e) if e.is_timeout() || e.is_connect() => {
            ClassifiedError::reclassified(ErrorKind::Unavailable)
        }
        MarketDataError::Network(_)
        | MarketDataError::ProviderError { .. }
        | MarketDataError::InvalidResponse { .. } => by_signature(&error.to_string()),
    }
}

fn by_signature(message: &str) -> ClassifiedError {
    match match_signature(message) {
        Some(kind) => ClassifiedError::reclassified(kind),
        None => ClassifiedError::internal(message.to_string()),
    }
}

fn match_signature(message: &str) -> Option<ErrorKind> {
    let lower = message.to_lowercase();
    let matches = |signatures: &[&str]| signatures.iter().any(|s| lower.contains(s));

    if matches(NOT_FOUND_SIGNATURES) {
        Some(ErrorKind::NotFound)
    } else if matches(RATE_LIMIT_SIGNATURES) || STATUS_429.is_match(&lower) {
        Some(ErrorKind::RateLimited)
    } else if matches(UNAVAILABLE_SIGNATURES) {
        Some(ErrorKind::Unavailable)
    } else {
        None
    }
}
