//! Time-bounded exchange-rate cache with single-flight lookups.
//!
//! Conversion is best effort: a failed or timed-out lookup is never cached
//! and the caller gets [`FALLBACK_RATE`] instead of an error. At most one
//! upstream lookup per currency pair is in flight at any time; callers that
//! arrive while it runs await the same result.
//!
//! Lookups run on their own spawned task, so a caller that gives up early
//! cannot strand the in-flight slot. The lookup timeout bounds how long the
//! slot can be held, and the slot is released even if the upstream call panics.

mod source;

pub use source::{ProviderRateSource, RateSource};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::models::{CurrencyPair, SUPPORTED_CURRENCIES};

/// Rate returned when no real rate can be obtained.
pub const FALLBACK_RATE: f64 = 1.0;

/// How long a computed rate stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default bound on one upstream lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached rate and when it was computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CachedRate {
    pub rate: f64,
    pub computed_at: Instant,
}

type SharedLookup = Shared<BoxFuture<'static, Option<f64>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<CurrencyPair, CachedRate>,
    in_flight: HashMap<CurrencyPair, SharedLookup>,
}

struct Inner {
    source: Arc<dyn RateSource>,
    state: Mutex<CacheState>,
    ttl: Duration,
    lookup_timeout: Duration,
}

impl Inner {
    /// Lock the cache state, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Exchange rate cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run one upstream lookup, store a good result and release the slot.
    async fn lookup(self: Arc<Self>, pair: CurrencyPair) -> Option<f64> {
        let slot = InFlightSlot {
            inner: Arc::clone(&self),
            pair: pair.clone(),
        };

        let outcome =
            tokio::time::timeout(self.lookup_timeout, self.source.fetch_rate(&pair)).await;

        let rate = match outcome {
            Ok(Ok(rate)) if rate.is_finite() && rate > 0.0 => Some(rate),
            Ok(Ok(rate)) => {
                warn!("Discarding invalid rate {} for {}", rate, pair);
                None
            }
            Ok(Err(e)) => {
                warn!("Exchange rate lookup for {} failed: {}", pair, e);
                None
            }
            Err(_) => {
                warn!(
                    "Exchange rate lookup for {} timed out after {:?}",
                    pair, self.lookup_timeout
                );
                None
            }
        };

        if let Some(rate) = rate {
            debug!("Caching rate {} for {}", rate, pair);
            self.lock_state().entries.insert(
                pair,
                CachedRate {
                    rate,
                    computed_at: Instant::now(),
                },
            );
        }
        drop(slot);
        rate
    }
}

/// Releases a pair's in-flight slot when its lookup ends, including when the
/// upstream call panics or the task is cancelled.
struct InFlightSlot {
    inner: Arc<Inner>,
    pair: CurrencyPair,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.inner.lock_state().in_flight.remove(&self.pair);
    }
}

/// Memoizing exchange-rate cache.
///
/// Cheap to clone; clones share the same entries and in-flight lookups.
#[derive(Clone)]
pub struct ExchangeRateCache {
    inner: Arc<Inner>,
}

impl ExchangeRateCache {
    /// Create a cache with the default TTL and lookup timeout.
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self::with_settings(source, DEFAULT_TTL, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_settings(
        source: Arc<dyn RateSource>,
        ttl: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(CacheState::default()),
                ttl,
                lookup_timeout,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Rate to multiply an amount in `from` by to get `to`.
    ///
    /// Same-currency requests return 1.0 without touching the cache.
    /// Unsupported currencies and failed lookups return [`FALLBACK_RATE`].
    pub async fn get_rate(&self, from: &str, to: &str) -> f64 {
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return 1.0;
        }

        let pair = match CurrencyPair::new(from, to) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Using fallback rate: {}", e);
                return FALLBACK_RATE;
            }
        };

        let lookup = {
            let mut state = self.inner.lock_state();

            if let Some(cached) = state.entries.get(&pair) {
                if cached.computed_at.elapsed() < self.inner.ttl {
                    return cached.rate;
                }
            }

            match state.in_flight.get(&pair) {
                Some(lookup) => lookup.clone(),
                None => {
                    let task = tokio::spawn(Arc::clone(&self.inner).lookup(pair.clone()));
                    let lookup = async move {
                        task.await.unwrap_or_else(|e| {
                            warn!("Exchange rate lookup task failed: {}", e);
                            None
                        })
                    }
                    .boxed()
                    .shared();
                    state.in_flight.insert(pair, lookup.clone());
                    lookup
                }
            }
        };

        lookup.await.unwrap_or(FALLBACK_RATE)
    }

    /// `amount` expressed in `to`.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        amount * self.get_rate(from, to).await
    }

    /// Rates from `base` to every supported currency, looked up concurrently
    /// through the cache.
    pub async fn get_all_rates(&self, base: &str) -> BTreeMap<String, f64> {
        let rates = join_all(
            SUPPORTED_CURRENCIES
                .iter()
                .map(|target| self.get_rate(base, target)),
        )
        .await;

        SUPPORTED_CURRENCIES
            .iter()
            .map(|c| c.to_string())
            .zip(rates)
            .collect()
    }

    /// The cached entry for a pair, if any, valid or not.
    pub fn cached(&self, from: &str, to: &str) -> Option<CachedRate> {
        let pair = CurrencyPair::new(from, to).ok()?;
        self.inner.lock_state().entries.get(&pair).copied()
    }

    /// Number of cached entries, including expired ones not yet replaced.
    pub fn len(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached rate. In-flight lookups are left to finish.
    pub fn clear(&self) {
        let mut state = self.inner.lock_state();
        let dropped = state.entries.len();
        state.entries.clear();
        info!("Exchange rate cache cleared ({} entries)", dropped);
    }
}
