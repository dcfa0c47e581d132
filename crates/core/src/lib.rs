//! Tradesim Core - request metrics, error taxonomy and system status.
//!
//! This crate holds the process-wide reliability state of the server. It is
//! database-agnostic: persistence health is reached through the
//! [`status::DatabaseProbe`] trait, implemented by the `storage-sqlite` crate.

pub mod errors;
pub mod metrics;
pub mod status;
pub mod validation;

// Re-export error types
pub use errors::{classify, AppEnvironment, ClassifiedError, Error, ErrorKind, Result};

pub use metrics::{RequestGuard, RequestTracker};
pub use status::{DatabaseHealth, DatabaseProbe, SystemStatus, SystemStatusAggregator};
