//! Status snapshot types, serialized as the operator status document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tradesim_market_data::ProviderHealthRecord;

/// Result of the persistence-layer probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub connected: bool,
    /// Number of schema objects (tables) visible to the connection.
    pub table_count: u64,
    /// Connections currently checked out of the pool.
    pub active_connections: u64,
}

impl DatabaseHealth {
    /// Reported when the probe fails or times out.
    pub fn disconnected() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Healthy,
    Unhealthy,
}

impl From<bool> for ProviderStatus {
    fn from(is_healthy: bool) -> Self {
        if is_healthy {
            ProviderStatus::Healthy
        } else {
            ProviderStatus::Unhealthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusEntry {
    pub status: ProviderStatus,
    pub last_checked: Option<DateTime<Utc>>,
    /// Check interval in milliseconds.
    pub check_interval: u64,
}

impl From<&ProviderHealthRecord> for ProviderStatusEntry {
    fn from(record: &ProviderHealthRecord) -> Self {
        Self {
            status: record.is_healthy.into(),
            last_checked: record.last_checked_at,
            check_interval: record.check_interval.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    /// Keyed by provider id.
    pub providers: BTreeMap<String, ProviderStatusEntry>,
    /// Keyed by credential name; `true` when the credential is set.
    pub credentials: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    /// Formatted as `"{days}d {hours}h {minutes}m"`.
    pub uptime: String,
    pub uptime_seconds: u64,
    /// Uptime relative to a 24 hour window, capped at 99.9.
    pub uptime_percentage: f64,
    /// Percentage of requests that finished with status >= 400.
    pub error_rate: f64,
    /// Mean of recent response times, in milliseconds.
    pub avg_response_time: f64,
    pub active_users: u64,
    pub total_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub database: DatabaseHealth,
    pub apis: ApiStatus,
    pub system: SystemMetrics,
    pub timestamp: DateTime<Utc>,
}
