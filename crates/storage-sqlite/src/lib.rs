//! SQLite storage implementation for the trading simulator.
//!
//! This crate provides the database-related functionality using Diesel with
//! SQLite. The server only needs a health view of the database, so it
//! contains:
//! - Database initialisation and connection pooling
//! - [`SqliteDatabaseProbe`], the `DatabaseProbe` implementation used by the
//!   status aggregator
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//!
//! ```text
//!        core (status aggregator)
//!                  │  DatabaseProbe
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod health;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, DbConnection, DbPool};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use health::SqliteDatabaseProbe;

// Re-export from tradesim-core for convenience
pub use tradesim_core::errors::{DatabaseError, Error, Result};
