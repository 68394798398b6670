//! Resolver counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of resolver activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStats {
    /// Resolves answered from the cache
    pub hits: u64,
    /// Resolves that had to classify and resolve the location
    pub misses: u64,
    /// Local payloads turned into playable handles
    pub materializations: u64,
    /// Stored keys that were missing or failed to materialize
    pub materialize_failures: u64,
    /// Materialized handles released
    pub releases: u64,
    pub refreshes_started: u64,
    pub refreshes_succeeded: u64,
    pub refreshes_failed: u64,
    /// Refresh results dropped because the cache changed underneath them
    pub refreshes_discarded: u64,
    /// Entries currently cached
    pub entries: usize,
}

impl ResolverStats {
    /// Fraction of resolves served from the cache.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub materializations: AtomicU64,
    pub materialize_failures: AtomicU64,
    pub releases: AtomicU64,
    pub refreshes_started: AtomicU64,
    pub refreshes_succeeded: AtomicU64,
    pub refreshes_failed: AtomicU64,
    pub refreshes_discarded: AtomicU64,
}

impl StatsRecorder {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entries: usize) -> ResolverStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ResolverStats {
            hits: load(&self.hits),
            misses: load(&self.misses),
            materializations: load(&self.materializations),
            materialize_failures: load(&self.materialize_failures),
            releases: load(&self.releases),
            refreshes_started: load(&self.refreshes_started),
            refreshes_succeeded: load(&self.refreshes_succeeded),
            refreshes_failed: load(&self.refreshes_failed),
            refreshes_discarded: load(&self.refreshes_discarded),
            entries,
        }
    }
}
