//! Proxy Cache
//!
//! Maps a structural [`ProxyKey`] to a generated [`Proxy`]. The shared cache
//! is single-flight per key: however many threads ask for the same missing
//! key at once, generation runs once and every caller receives the same
//! `Arc<Proxy>`. Requests for different keys only contend on the map shard
//! while claiming their slot, never on each other's generation.
//!
//! # Failure
//!
//! A failed generation is not cached. The caller that ran it gets the error;
//! threads that were waiting on the same slot each run their own attempt
//! afterwards. The slot itself is dropped once nobody holds it, so a later
//! request starts from a clean miss.

mod key;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;

use crate::{Proxy, ProxyError};

pub use key::ProxyKey;

/// Generation callback handed to [`ProxyCache::get_or_create`].
pub type Generate<'a> = dyn FnMut() -> Result<Proxy, ProxyError> + 'a;

/// Storage for generated proxies.
pub trait ProxyCache: Send + Sync {
    fn contains(&self, key: &ProxyKey) -> bool;

    /// Return the proxy for `key`, running `generate` on a miss.
    fn get_or_create(
        &self,
        key: &ProxyKey,
        generate: &mut Generate<'_>,
    ) -> Result<Arc<Proxy>, ProxyError>;

    /// Insert a proxy produced elsewhere. An existing entry wins.
    fn store(&self, key: ProxyKey, proxy: Arc<Proxy>);
}

type SlotCell = Arc<OnceCell<Arc<Proxy>>>;

/// Process-wide cache with per-key single flight.
#[derive(Debug, Default)]
pub struct SharedProxyCache {
    slots: DashMap<ProxyKey, SlotCell, FxBuildHasher>,
    stats: CacheStats,
}

impl SharedProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of keys with a finished proxy.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Proxies already handed out stay valid.
    pub fn clear(&self) {
        self.slots.clear();
    }

    fn slot(&self, key: &ProxyKey) -> SlotCell {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.slots.entry(key.clone()).or_default())
    }
}

impl ProxyCache for SharedProxyCache {
    fn contains(&self, key: &ProxyKey) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.get().is_some())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(key = ?key))]
    fn get_or_create(
        &self,
        key: &ProxyKey,
        generate: &mut Generate<'_>,
    ) -> Result<Arc<Proxy>, ProxyError> {
        let slot = self.slot(key);
        if let Some(proxy) = slot.get() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache hit");
            return Ok(Arc::clone(proxy));
        }

        let mut generated = false;
        let result = slot.get_or_try_init(|| {
            generated = true;
            self.stats.generations.fetch_add(1, Ordering::Relaxed);
            generate().map(Arc::new)
        });

        match result {
            Ok(proxy) => {
                if generated {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(proxy = proxy.name(), "cache miss, generated");
                } else {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("cache hit after waiting");
                }
                Ok(Arc::clone(proxy))
            }
            Err(err) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%err, "generation failed, not cached");
                drop(slot);
                self.slots
                    .remove_if(key, |_, slot| slot.get().is_none() && Arc::strong_count(slot) == 1);
                Err(err)
            }
        }
    }

    fn store(&self, key: ProxyKey, proxy: Arc<Proxy>) {
        let slot = self.slot(&key);
        if slot.set(proxy).is_err() {
            tracing::debug!(key = ?key, "store ignored, key already cached");
        }
    }
}

/// A cache that caches nothing: every request generates.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopProxyCache;

impl ProxyCache for NoopProxyCache {
    fn contains(&self, _: &ProxyKey) -> bool {
        false
    }

    fn get_or_create(
        &self,
        _: &ProxyKey,
        generate: &mut Generate<'_>,
    ) -> Result<Arc<Proxy>, ProxyError> {
        generate().map(Arc::new)
    }

    fn store(&self, _: ProxyKey, _: Arc<Proxy>) {}
}

/// Counters for [`SharedProxyCache`].
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    generations: AtomicU64,
    failures: AtomicU64,
}

impl CacheStats {
    /// Requests answered with an existing proxy, including after waiting.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Requests that generated the proxy they returned.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Generation attempts, successful or not.
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
