//! Per-provider health sampling.
//!
//! Each registered provider gets one [`ProviderHealthMonitor`] record holding
//! its last result and its own check interval. Health is sampled, not
//! continuously verified: a call inside the interval returns the cached
//! result without touching the network, and an unconfigured provider is
//! marked unhealthy without ever being called. There are no background
//! timers; probes happen only when someone asks.
//!
//! The monitor is in-memory and resets on application restart.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::provider::MarketDataProvider;

/// Default bound on a single liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Point-in-time view of one provider's health record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealthRecord {
    pub provider_id: String,
    pub is_healthy: bool,
    /// `None` until the first check.
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(with = "duration_millis")]
    pub check_interval: Duration,
    /// Whether the provider's credential is present.
    pub configured: bool,
}

#[derive(Debug)]
struct HealthState {
    is_healthy: bool,
    /// Monotonic stamp used for the interval gate.
    last_checked: Option<Instant>,
    /// Wall-clock stamp reported to operators.
    last_checked_at: Option<DateTime<Utc>>,
    check_interval: Duration,
}

impl HealthState {
    fn new(check_interval: Duration) -> Self {
        Self {
            is_healthy: false,
            last_checked: None,
            last_checked_at: None,
            check_interval,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.last_checked
            .is_some_and(|last| now.saturating_duration_since(last) < self.check_interval)
    }

    /// Stamp the record. Both stamps only ever move forward.
    fn mark_checked(&mut self, now: Instant) {
        self.last_checked = Some(self.last_checked.map_or(now, |last| last.max(now)));
        let wall = Utc::now();
        self.last_checked_at = Some(self.last_checked_at.map_or(wall, |last| last.max(wall)));
    }
}

struct MonitoredProvider {
    provider: Arc<dyn MarketDataProvider>,
    state: Mutex<HealthState>,
}

impl MonitoredProvider {
    fn lock_state(&self) -> MutexGuard<'_, HealthState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Health record mutex for '{}' was poisoned, recovering",
                self.provider.id()
            );
            poisoned.into_inner()
        })
    }

    fn record(&self) -> ProviderHealthRecord {
        let state = self.lock_state();
        ProviderHealthRecord {
            provider_id: self.provider.id().to_string(),
            is_healthy: state.is_healthy,
            last_checked_at: state.last_checked_at,
            check_interval: state.check_interval,
            configured: self.provider.is_configured(),
        }
    }
}

/// Health monitor owning one record per provider.
///
/// Providers are registered at construction time and never removed.
/// Checks on different providers run independently; each record has its own
/// lock, and no lock is held across a network call.
pub struct ProviderHealthMonitor {
    providers: Vec<MonitoredProvider>,
    probe_timeout: Duration,
}

impl ProviderHealthMonitor {
    /// Create an empty monitor with the default probe timeout.
    pub fn new() -> Self {
        Self::with_probe_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    /// Create an empty monitor whose probes give up after `probe_timeout`.
    pub fn with_probe_timeout(probe_timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            probe_timeout,
        }
    }

    /// Register a provider using its own default check interval.
    pub fn with_provider(self, provider: Arc<dyn MarketDataProvider>) -> Self {
        let interval = provider.default_check_interval();
        self.with_provider_interval(provider, interval)
    }

    /// Register a provider with an explicit check interval.
    ///
    /// Registering the same provider id twice replaces the earlier record.
    pub fn with_provider_interval(
        mut self,
        provider: Arc<dyn MarketDataProvider>,
        check_interval: Duration,
    ) -> Self {
        self.providers.retain(|p| p.provider.id() != provider.id());
        self.providers.push(MonitoredProvider {
            provider,
            state: Mutex::new(HealthState::new(check_interval)),
        });
        self
    }

    /// Ids of all registered providers, in registration order.
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.provider.id()).collect()
    }

    /// Look up a registered provider by id.
    pub fn provider(&self, provider_id: &str) -> Option<Arc<dyn MarketDataProvider>> {
        self.find(provider_id).map(|p| Arc::clone(&p.provider))
    }

    fn find(&self, provider_id: &str) -> Option<&MonitoredProvider> {
        self.providers
            .iter()
            .find(|p| p.provider.id() == provider_id)
    }

    /// Check a single provider's health.
    ///
    /// Returns the cached result when the last check is younger than the
    /// provider's interval. Otherwise probes (unless unconfigured), stores
    /// and returns the result. Never fails; unknown ids report unhealthy.
    pub async fn check_health(&self, provider_id: &str) -> bool {
        match self.find(provider_id) {
            Some(monitored) => self.check(monitored).await,
            None => {
                warn!("Health check requested for unknown provider '{}'", provider_id);
                false
            }
        }
    }

    /// Check every provider concurrently and return their records in
    /// registration order.
    pub async fn check_all(&self) -> Vec<ProviderHealthRecord> {
        join_all(self.providers.iter().map(|p| self.check(p))).await;
        self.snapshot()
    }

    /// Current records without probing anything.
    pub fn snapshot(&self) -> Vec<ProviderHealthRecord> {
        self.providers.iter().map(MonitoredProvider::record).collect()
    }

    /// Return every record to its initial never-checked, unhealthy state.
    pub fn reset(&self) {
        for monitored in &self.providers {
            let mut state = monitored.lock_state();
            let interval = state.check_interval;
            *state = HealthState::new(interval);
        }
        info!("Provider health records reset");
    }

    async fn check(&self, monitored: &MonitoredProvider) -> bool {
        let provider = &monitored.provider;
        let now = Instant::now();

        // Claim the check under the lock so concurrent callers inside the
        // same interval get the cached value instead of probing again.
        {
            let mut state = monitored.lock_state();
            if state.is_fresh(now) {
                return state.is_healthy;
            }
            state.mark_checked(now);

            if !provider.is_configured() {
                debug!(
                    "Skipping health probe for '{}': no credential configured",
                    provider.id()
                );
                state.is_healthy = false;
                return false;
            }
        }

        let healthy = match tokio::time::timeout(self.probe_timeout, provider.check_liveness())
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Health probe for '{}' failed: {}", provider.id(), e);
                false
            }
            Err(_) => {
                warn!(
                    "Health probe for '{}' timed out after {:?}",
                    provider.id(),
                    self.probe_timeout
                );
                false
            }
        };

        let mut state = monitored.lock_state();
        if state.is_healthy != healthy {
            info!(
                "Provider '{}' is now {}",
                provider.id(),
                if healthy { "healthy" } else { "unhealthy" }
            );
        }
        state.is_healthy = healthy;
        state.mark_checked(Instant::now());
        healthy
    }
}

impl Default for ProviderHealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MarketDataError;
    use crate::models::Quote;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockProvider {
        id: &'static str,
        configured: bool,
        healthy: AtomicBool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                configured: true,
                healthy: AtomicBool::new(true),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn unconfigured(id: &'static str) -> Self {
            Self {
                configured: false,
                ..Self::new(id)
            }
        }

        fn slow(id: &'static str, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(id)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
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

        async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            Ok(Quote::new(symbol, 1.0, self.id))
        }

        async fn check_liveness(&self) -> Result<(), MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(MarketDataError::Timeout {
                    provider: self.id.to_string(),
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_provider_is_unhealthy_without_probe() {
        let provider = Arc::new(MockProvider::unconfigured("KEYED"));
        let monitor = ProviderHealthMonitor::new().with_provider(provider.clone());

        assert!(!monitor.check_health("KEYED").await);
        assert_eq!(provider.calls(), 0);

        let record = &monitor.snapshot()[0];
        assert!(!record.is_healthy);
        assert!(!record.configured);
        assert!(record.last_checked_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checks_within_interval_use_cached_result() {
        let provider = Arc::new(MockProvider::new("PRIMARY"));
        let monitor = ProviderHealthMonitor::new()
            .with_provider_interval(provider.clone(), Duration::from_secs(60));

        assert!(monitor.check_health("PRIMARY").await);
        provider.healthy.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(monitor.check_health("PRIMARY").await);
        assert_eq!(provider.calls(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!monitor.check_health("PRIMARY").await);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_is_reported_not_raised() {
        let provider = Arc::new(MockProvider::new("FLAKY"));
        provider.healthy.store(false, Ordering::SeqCst);
        let monitor = ProviderHealthMonitor::new()
            .with_provider_interval(provider.clone(), Duration::from_secs(60));

        assert!(!monitor.check_health("FLAKY").await);
        let first = monitor.snapshot()[0].last_checked_at;
        assert!(first.is_some());

        provider.healthy.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(monitor.check_health("FLAKY").await);
        assert!(monitor.snapshot()[0].last_checked_at >= first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_probe_times_out_as_unhealthy() {
        let provider = Arc::new(MockProvider::slow("HUNG", Duration::from_secs(600)));
        let monitor = ProviderHealthMonitor::with_probe_timeout(Duration::from_secs(5))
            .with_provider(provider.clone());

        assert!(!monitor.check_health("HUNG").await);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intervals_are_per_provider() {
        let fast = Arc::new(MockProvider::new("FAST"));
        let slow = Arc::new(MockProvider::new("SLOW"));
        let monitor = ProviderHealthMonitor::new()
            .with_provider_interval(fast.clone(), Duration::from_secs(60))
            .with_provider_interval(slow.clone(), Duration::from_secs(3600));

        monitor.check_all().await;
        tokio::time::advance(Duration::from_secs(120)).await;
        monitor.check_all().await;

        assert_eq!(fast.calls(), 2);
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checks_probe_once() {
        let provider = Arc::new(MockProvider::slow("SHARED", Duration::from_millis(200)));
        let monitor = ProviderHealthMonitor::new().with_provider(provider.clone());

        join_all((0..5).map(|_| monitor.check_health("SHARED"))).await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_reports_in_registration_order() {
        let monitor = ProviderHealthMonitor::new()
            .with_provider(Arc::new(MockProvider::new("A")))
            .with_provider(Arc::new(MockProvider::unconfigured("B")));

        let records = monitor.check_all().await;
        let ids: Vec<_> = records.iter().map(|r| r.provider_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(records[0].is_healthy);
        assert!(!records[1].is_healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_forgets_previous_checks() {
        let provider = Arc::new(MockProvider::new("RESET"));
        let monitor = ProviderHealthMonitor::new().with_provider(provider.clone());

        assert!(monitor.check_health("RESET").await);
        monitor.reset();
        let record = &monitor.snapshot()[0];
        assert!(!record.is_healthy);
        assert!(record.last_checked_at.is_none());

        assert!(monitor.check_health("RESET").await);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unhealthy() {
        let monitor = ProviderHealthMonitor::new();
        assert!(!monitor.check_health("NOPE").await);
    }

    #[test]
    fn test_record_serializes_interval_as_millis() {
        let record = ProviderHealthRecord {
            provider_id: "YAHOO".to_string(),
            is_healthy: true,
            last_checked_at: None,
            check_interval: Duration::from_secs(60),
            configured: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["checkInterval"], 60_000);
        assert_eq!(json["providerId"], "YAHOO");
    }
}
