//! Memoized block evaluation with stampede protection.
//!
//! One flight per key: the first caller computes on a detached task while
//! concurrent callers for the same key wait on a watch channel and receive
//! the same value. Callers for different keys never block each other. A
//! caller that times out abandons its await without cancelling the shared
//! compute, so waiters already attached still get a result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use vitrine_core::cache_key::CacheKey;
use vitrine_core::composer::ScoredProduct;
use vitrine_core::errors::EngineError;

#[derive(Clone, Debug)]
pub struct CachedValue {
    pub items: Arc<Vec<ScoredProduct>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

struct Entry {
    value: CachedValue,
    hit_count: u64,
}

type FlightResult = Result<CachedValue, EngineError>;

enum Slot {
    Ready(Entry),
    InFlight(watch::Receiver<Option<FlightResult>>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Clone, Debug)]
pub struct CacheLookup {
    pub items: Arc<Vec<ScoredProduct>>,
    pub from_cache: bool,
    /// Reads served from this entry so far; 0 for a fresh compute.
    pub hit_count: u64,
}

struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    bypass: AtomicBool,
}

/// Shared per-process cache. Constructed once and injected; there is no
/// ambient global instance.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                bypass: AtomicBool::new(false),
            }),
        }
    }

    /// Disable or re-enable caching. While bypassed every call computes
    /// directly; used when the cache is administratively disabled or
    /// considered unhealthy.
    pub fn set_bypass(&self, bypass: bool) {
        self.inner.bypass.store(bypass, Ordering::Relaxed);
    }

    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<CacheLookup, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ScoredProduct>, EngineError>> + Send + 'static,
    {
        if self.inner.bypass.load(Ordering::Relaxed) {
            warn!(key = %key, "cache bypassed, computing directly");
            let items = Arc::new(compute().await?);
            return Ok(CacheLookup { items, from_cache: false, hit_count: 0 });
        }

        let mut compute = Some(compute);
        loop {
            let mut slots = self.inner.slots.lock().await;
            let joined_flight = match slots.get_mut(&key.0) {
                Some(Slot::Ready(entry)) if entry.value.expires_at > Utc::now() => {
                    entry.hit_count += 1;
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, hit_count = entry.hit_count, "cache hit");
                    return Ok(CacheLookup {
                        items: entry.value.items.clone(),
                        from_cache: true,
                        hit_count: entry.hit_count,
                    });
                }
                Some(Slot::InFlight(rx)) => Some(rx.clone()),
                _ => None,
            };

            let mut rx = match joined_flight {
                Some(rx) => {
                    drop(slots);
                    rx
                }
                None => {
                    let Some(compute) = compute.take() else {
                        return Err(EngineError::CacheUnavailable(
                            "single-flight state lost".to_owned(),
                        ));
                    };
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "cache miss, starting compute");

                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.0.clone(), Slot::InFlight(rx.clone()));
                    drop(slots);

                    let inner = self.inner.clone();
                    let flight_key = key.0.clone();
                    let future = compute();
                    tokio::spawn(async move {
                        let result = match future.await {
                            Ok(items) => {
                                let now = Utc::now();
                                Ok(CachedValue {
                                    items: Arc::new(items),
                                    created_at: now,
                                    expires_at: now
                                        + chrono::Duration::from_std(ttl)
                                            .unwrap_or(chrono::Duration::zero()),
                                })
                            }
                            Err(error) => Err(error),
                        };

                        let mut slots = inner.slots.lock().await;
                        match &result {
                            Ok(value) => {
                                slots.insert(
                                    flight_key,
                                    Slot::Ready(Entry { value: value.clone(), hit_count: 0 }),
                                );
                            }
                            // Failures are never cached; the next caller
                            // retries the compute.
                            Err(_) => {
                                slots.remove(&flight_key);
                            }
                        }
                        drop(slots);
                        let _ = tx.send(Some(result));
                    });
                    rx
                }
            };

            loop {
                let settled = rx.borrow_and_update().clone();
                if let Some(result) = settled {
                    let value = result?;
                    return Ok(CacheLookup {
                        items: value.items.clone(),
                        from_cache: false,
                        hit_count: 0,
                    });
                }
                if rx.changed().await.is_err() {
                    // The flight vanished without settling; start over.
                    break;
                }
            }
        }
    }

    pub async fn purge(&self, key: &CacheKey) {
        let mut slots = self.inner.slots.lock().await;
        slots.remove(&key.0);
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut slots = self.inner.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => entry.value.expires_at > now,
            Slot::InFlight(_) => true,
        });
        before - slots.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let slots = self.inner.slots.lock().await;
        let entries = slots.values().filter(|slot| matches!(slot, Slot::Ready(_))).count();
        CacheStats {
            entries,
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}
