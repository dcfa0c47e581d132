use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::warn;
use tokio::time::{timeout, Instant};
use tradesim_market_data::ProviderHealthMonitor;

use super::model::{ApiStatus, DatabaseHealth, ProviderStatusEntry, SystemMetrics, SystemStatus};
use super::traits::DatabaseProbe;
use crate::metrics::RequestTracker;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const UPTIME_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_UPTIME_PERCENTAGE: f64 = 99.9;

/// Builds [`SystemStatus`] snapshots on demand.
///
/// Holds no state of its own beyond the process start time; every call reads
/// its collaborators afresh.
pub struct SystemStatusAggregator {
    database: Arc<dyn DatabaseProbe>,
    providers: Arc<ProviderHealthMonitor>,
    tracker: Arc<RequestTracker>,
    credentials: BTreeMap<String, bool>,
    started_at: Instant,
    probe_timeout: Duration,
}

impl SystemStatusAggregator {
    pub fn new(
        database: Arc<dyn DatabaseProbe>,
        providers: Arc<ProviderHealthMonitor>,
        tracker: Arc<RequestTracker>,
    ) -> Self {
        Self {
            database,
            providers,
            tracker,
            credentials: BTreeMap::new(),
            started_at: Instant::now(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Bound on the database probe.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Report whether a named credential is present.
    pub fn with_credential(mut self, name: impl Into<String>, present: bool) -> Self {
        self.credentials.insert(name.into(), present);
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Probes the database and every provider in parallel, then reads metrics.
    ///
    /// Never fails: an unreachable database is reported as disconnected and
    /// failing providers as unhealthy.
    pub async fn get_status(&self) -> SystemStatus {
        let (database, records) =
            tokio::join!(self.database_health(), self.providers.check_all());

        let providers = records
            .iter()
            .map(|record| (record.provider_id.clone(), ProviderStatusEntry::from(record)))
            .collect();

        let uptime = self.uptime();
        let system = SystemMetrics {
            uptime: format_uptime(uptime),
            uptime_seconds: uptime.as_secs(),
            uptime_percentage: uptime_percentage(uptime),
            error_rate: round2(self.tracker.error_rate_percent()),
            avg_response_time: round2(self.tracker.average_latency_ms()),
            active_users: self.tracker.active_connections(),
            total_requests: self.tracker.total_requests(),
        };

        SystemStatus {
            database,
            apis: ApiStatus {
                providers,
                credentials: self.credentials.clone(),
            },
            system,
            timestamp: Utc::now(),
        }
    }

    async fn database_health(&self) -> DatabaseHealth {
        match timeout(self.probe_timeout, self.database.probe()).await {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => {
                warn!("Database health probe failed: {}", e);
                DatabaseHealth::disconnected()
            }
            Err(_) => {
                warn!(
                    "Database health probe timed out after {:?}",
                    self.probe_timeout
                );
                DatabaseHealth::disconnected()
            }
        }
    }
}

/// Formats an uptime as `"{days}d {hours}h {minutes}m"`.
pub fn format_uptime(uptime: Duration) -> String {
    let total_minutes = uptime.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

/// Uptime as a percentage of a 24 hour window, capped at 99.9.
///
/// This does not account for outages; it only grows with process age.
pub fn uptime_percentage(uptime: Duration) -> f64 {
    let percentage = uptime.as_secs_f64() / UPTIME_WINDOW.as_secs_f64() * 100.0;
    round2(percentage.min(MAX_UPTIME_PERCENTAGE))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseError, Error, Result};
    use crate::status::model::ProviderStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tradesim_market_data::{MarketDataError, MarketDataProvider, Quote};

    // =========================================================================
    // Mocks
    // =========================================================================

    enum ProbeBehavior {
        Healthy,
        Failing,
        Hanging,
    }

    struct MockDatabaseProbe {
        behavior: ProbeBehavior,
        calls: AtomicUsize,
    }

    impl MockDatabaseProbe {
        fn new(behavior: ProbeBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DatabaseProbe for MockDatabaseProbe {
        async fn probe(&self) -> Result<DatabaseHealth> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                ProbeBehavior::Healthy => Ok(DatabaseHealth {
                    connected: true,
                    table_count: 12,
                    active_connections: 1,
                }),
                ProbeBehavior::Failing => Err(Error::Database(DatabaseError::ConnectionFailed(
                    "unable to open database file".to_string(),
                ))),
                ProbeBehavior::Hanging => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(DatabaseHealth::disconnected())
                }
            }
        }
    }

    struct MockProvider {
        id: &'static str,
        configured: bool,
        healthy: bool,
        probes: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, configured: bool, healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                id,
                configured,
                healthy,
                probes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn get_latest_quote(
            &self,
            symbol: &str,
        ) -> std::result::Result<Quote, MarketDataError> {
            Ok(Quote::new(symbol, 100.0, self.id))
        }

        async fn check_liveness(&self) -> std::result::Result<(), MarketDataError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.healthy {
                Ok(())
            } else {
                Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "HTTP error: 502 Bad Gateway".to_string(),
                })
            }
        }
    }

    fn aggregator(
        database: Arc<MockDatabaseProbe>,
        providers: Vec<Arc<MockProvider>>,
        tracker: Arc<RequestTracker>,
    ) -> SystemStatusAggregator {
        let monitor = providers.into_iter().fold(ProviderHealthMonitor::new(), |m, p| {
            m.with_provider(p as Arc<dyn MarketDataProvider>)
        });
        SystemStatusAggregator::new(database, Arc::new(monitor), tracker)
            .with_probe_timeout(Duration::from_secs(5))
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_status_combines_all_sources() {
        let tracker = Arc::new(RequestTracker::new());
        tracker.start_request().finish(200);
        tracker.start_request().finish(500);
        let _in_flight = tracker.start_request();

        let primary = MockProvider::new("PRIMARY", true, true);
        let keyed = MockProvider::new("KEYED", false, true);
        let status = aggregator(
            MockDatabaseProbe::new(ProbeBehavior::Healthy),
            vec![primary.clone(), keyed.clone()],
            tracker,
        )
        .with_credential("KEYED_API_KEY", false)
        .get_status()
        .await;

        assert!(status.database.connected);
        assert_eq!(status.database.table_count, 12);

        let primary_entry = &status.apis.providers["PRIMARY"];
        assert_eq!(primary_entry.status, ProviderStatus::Healthy);
        assert!(primary_entry.last_checked.is_some());
        assert_eq!(primary_entry.check_interval, 3_600_000);
        assert_eq!(
            status.apis.providers["KEYED"].status,
            ProviderStatus::Unhealthy
        );
        assert_eq!(keyed.probes.load(Ordering::SeqCst), 0);
        assert_eq!(primary.probes.load(Ordering::SeqCst), 1);
        assert_eq!(status.apis.credentials.get("KEYED_API_KEY"), Some(&false));

        assert_eq!(status.system.total_requests, 3);
        assert_eq!(status.system.active_users, 1);
        assert_eq!(status.system.error_rate, 33.33);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_database_reported_as_disconnected() {
        let status = aggregator(
            MockDatabaseProbe::new(ProbeBehavior::Failing),
            vec![MockProvider::new("PRIMARY", true, false)],
            Arc::new(RequestTracker::new()),
        )
        .get_status()
        .await;

        assert!(!status.database.connected);
        assert_eq!(status.database.table_count, 0);
        assert_eq!(
            status.apis.providers["PRIMARY"].status,
            ProviderStatus::Unhealthy
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_database_probe_times_out() {
        let database = MockDatabaseProbe::new(ProbeBehavior::Hanging);
        let status = aggregator(database.clone(), vec![], Arc::new(RequestTracker::new()))
            .get_status()
            .await;

        assert!(!status.database.connected);
        assert_eq!(database.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_reported_from_construction() {
        let aggregator = aggregator(
            MockDatabaseProbe::new(ProbeBehavior::Healthy),
            vec![],
            Arc::new(RequestTracker::new()),
        );

        tokio::time::advance(Duration::from_secs(26 * 3600 + 5 * 60)).await;
        let status = aggregator.get_status().await;

        assert_eq!(status.system.uptime, "1d 2h 5m");
        assert_eq!(status.system.uptime_percentage, 99.9);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 0h 0m");
        assert_eq!(format_uptime(Duration::from_secs(59)), "0d 0h 0m");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 7 * 60)), "0d 3h 7m");
        assert_eq!(
            format_uptime(Duration::from_secs(3 * 86_400 + 23 * 3600 + 59 * 60 + 59)),
            "3d 23h 59m"
        );
    }

    #[test]
    fn test_uptime_percentage_is_capped() {
        assert_eq!(uptime_percentage(Duration::ZERO), 0.0);
        assert_eq!(uptime_percentage(Duration::from_secs(12 * 3600)), 50.0);
        assert_eq!(uptime_percentage(Duration::from_secs(24 * 3600)), 99.9);
        assert_eq!(uptime_percentage(Duration::from_secs(90 * 86_400)), 99.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_serializes_expected_shape() {
        let status = aggregator(
            MockDatabaseProbe::new(ProbeBehavior::Healthy),
            vec![MockProvider::new("PRIMARY", true, true)],
            Arc::new(RequestTracker::new()),
        )
        .get_status()
        .await;

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["database"]["tableCount"], 12);
        assert_eq!(json["database"]["activeConnections"], 1);
        assert_eq!(json["apis"]["providers"]["PRIMARY"]["status"], "healthy");
        assert!(json["apis"]["providers"]["PRIMARY"]["lastChecked"].is_string());
        assert_eq!(json["apis"]["providers"]["PRIMARY"]["checkInterval"], 3_600_000);
        for key in [
            "uptime",
            "uptimePercentage",
            "errorRate",
            "avgResponseTime",
            "activeUsers",
            "totalRequests",
        ] {
            assert!(json["system"].get(key).is_some(), "missing system.{}", key);
        }
        assert!(json["timestamp"].is_string());
    }
}
