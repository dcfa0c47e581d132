//! Core error types for the trading simulator server.
//!
//! This module defines the database-agnostic error taxonomy. Storage-specific
//! errors (Diesel, r2d2, SQLite) are converted to [`DatabaseError`] by the
//! storage layer, and upstream failures arrive as
//! [`tradesim_market_data::MarketDataError`].

mod classifier;

use thiserror::Error;
use tradesim_market_data::MarketDataError;

pub use classifier::{classify, AppEnvironment, ClassifiedError, ErrorKind};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the reliability layer.
///
/// The first four variants are operational: they are raised on purpose and
/// carry their own status. `MarketData` is mapped by variant where the
/// upstream failure is typed. Everything else is unexpected.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors raised by the shared input primitives in [`crate::validation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Symbol is required")]
    EmptySymbol,

    #[error("Malformed symbol format: {0}")]
    MalformedSymbol(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Unexpected(anyhow::anyhow!("background task failed: {}", err))
    }
}
