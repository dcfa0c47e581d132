//! Process-wide request metrics.
//!
//! [`RequestTracker`] is constructed once at startup and shared through the
//! application state. Each inbound request takes a [`RequestGuard`] from
//! [`RequestTracker::start_request`]; the guard is the only way to record a
//! completion, so the start/finish pair is always balanced.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};
use serde::Serialize;
use tokio::time::Instant;

/// Number of recent latencies kept for the average.
pub const LATENCY_WINDOW: usize = 100;

/// Status recorded for a guard dropped without [`RequestGuard::finish`].
const ABANDONED_STATUS: u16 = 500;

/// Counters and a bounded latency history for every request the server handles.
#[derive(Debug, Default)]
pub struct RequestTracker {
    active_connections: AtomicU64,
    total_requests: AtomicU64,
    error_count: AtomicU64,
    /// Bumped by every reset; guards from an older epoch only release their slot.
    epoch: AtomicU64,
    recent_latencies_ms: Mutex<VecDeque<f64>>,
}

/// Point-in-time copy of the tracker's metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetrics {
    pub active_connections: u64,
    pub total_requests: u64,
    pub error_count: u64,
    pub error_rate_percent: f64,
    pub average_latency_ms: f64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a request and returns the guard that will finish it.
    pub fn start_request(self: &Arc<Self>) -> RequestGuard {
        // Read before counting, so a racing reset can only under-count errors.
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.active_connections.fetch_add(1, Ordering::SeqCst);
        self.total_requests.fetch_add(1, Ordering::SeqCst);

        RequestGuard {
            tracker: Arc::clone(self),
            started_at: Instant::now(),
            epoch,
            finished: false,
        }
    }

    fn record_finish(&self, started_at: Instant, epoch: u64, status_code: u16) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        // Held across the epoch check so a concurrent reset cannot interleave.
        let mut latencies = self.lock_latencies();
        if epoch != self.epoch.load(Ordering::SeqCst) {
            debug!("Request started before the last metrics reset; not recorded");
            return;
        }

        if status_code >= 400 {
            self.error_count.fetch_add(1, Ordering::SeqCst);
        }

        let elapsed_ms = started_at.elapsed().as_micros() as f64 / 1000.0;
        if latencies.len() == LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(elapsed_ms);
    }

    /// `error_count / total_requests * 100`, or 0 before the first request.
    pub fn error_rate_percent(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.error_count() as f64 / total as f64 * 100.0
    }

    /// Mean of the recent latency window, or 0 when it is empty.
    pub fn average_latency_ms(&self) -> f64 {
        let latencies = self.lock_latencies();
        if latencies.is_empty() {
            return 0.0;
        }
        latencies.iter().sum::<f64>() / latencies.len() as f64
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::SeqCst)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    /// Recent latencies, oldest first.
    pub fn recent_latencies_ms(&self) -> Vec<f64> {
        self.lock_latencies().iter().copied().collect()
    }

    pub fn snapshot(&self) -> RequestMetrics {
        RequestMetrics {
            active_connections: self.active_connections(),
            total_requests: self.total_requests(),
            error_count: self.error_count(),
            error_rate_percent: self.error_rate_percent(),
            average_latency_ms: self.average_latency_ms(),
        }
    }

    /// Operator reset: clears counters and latency history.
    ///
    /// In-flight requests stay counted as active until they finish, but their
    /// status and latency belong to the previous window and are discarded.
    pub fn reset(&self) {
        let mut latencies = self.lock_latencies();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.total_requests.store(0, Ordering::SeqCst);
        self.error_count.store(0, Ordering::SeqCst);
        latencies.clear();
        debug!("Request metrics reset");
    }

    fn lock_latencies(&self) -> MutexGuard<'_, VecDeque<f64>> {
        match self.recent_latencies_ms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Latency buffer mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Scoped handle for one in-flight request.
///
/// Call [`finish`](Self::finish) with the response status. A guard dropped
/// without finishing (handler cancelled or panicked) is recorded as a 500.
#[derive(Debug)]
#[must_use = "a request guard records the request when finished or dropped"]
pub struct RequestGuard {
    tracker: Arc<RequestTracker>,
    started_at: Instant,
    epoch: u64,
    finished: bool,
}

impl RequestGuard {
    pub fn finish(mut self, status_code: u16) {
        self.finished = true;
        self.tracker.record_finish(self.started_at, self.epoch, status_code);
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Request guard dropped without finishing; recording as {ABANDONED_STATUS}");
            self.tracker.record_finish(self.started_at, self.epoch, ABANDONED_STATUS);
        }
    }
}
