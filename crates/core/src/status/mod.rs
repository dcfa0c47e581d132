//! System status module.
//!
//! Composes the database probe, provider health and request metrics into one
//! operator snapshot.
//!
//! ```text
//! SystemStatusAggregator ─┬─> DatabaseProbe          (storage crate)
//!                         ├─> ProviderHealthMonitor  (market-data crate)
//!                         └─> RequestTracker
//! ```
//!
//! - **Models** (`model.rs`) - The serialized status document
//! - **Traits** (`traits.rs`) - The persistence probe seam
//! - **Service** (`service.rs`) - The aggregator

pub mod model;
pub mod service;
pub mod traits;

pub use model::{
    ApiStatus, DatabaseHealth, ProviderStatus, ProviderStatusEntry, SystemMetrics, SystemStatus,
};
pub use service::{format_uptime, uptime_percentage, SystemStatusAggregator};
pub use traits::DatabaseProbe;
