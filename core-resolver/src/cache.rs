//! Cache state guarded by the resolver's mutex.
//!
//! Every method is synchronous; callers take the lock, mutate, collect any
//! handles that must be released, drop the lock, then release. Handles are
//! never released while the lock is held.
//!
//! A materialized handle that stops being the cached value (replaced by a
//! refresh, or evicted for capacity) may still be bound to a player. It is
//! parked as *retired* under its location and released only by an explicit
//! `evict` of that location or a `clear`.

use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::time::Duration;

/// A cached resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    pub resolved: String,
    /// The URL is a handle this cache created and must release
    pub materialized: bool,
}

impl CacheEntry {
    pub fn identity(location: &str) -> Self {
        Self {
            resolved: location.to_string(),
            materialized: false,
        }
    }

    pub fn materialized(url: String) -> Self {
        Self {
            resolved: url,
            materialized: true,
        }
    }

    pub fn fresh(url: String) -> Self {
        Self {
            resolved: url,
            materialized: false,
        }
    }
}

/// Lookup shared by concurrent resolves of one location.
pub(crate) type PendingLookup = Shared<BoxFuture<'static, String>>;

pub(crate) struct CacheState {
    entries: LruCache<String, CacheEntry>,
    retired: HashMap<String, Vec<String>>,
    last_attempt_ms: HashMap<String, i64>,
    in_flight: HashSet<String>,
    pending: HashMap<String, (u64, PendingLookup)>,
    next_flight: u64,
    generation: u64,
}

impl CacheState {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            retired: HashMap::new(),
            last_attempt_ms: HashMap::new(),
            in_flight: HashSet::new(),
            pending: HashMap::new(),
            next_flight: 0,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up and promote an entry.
    pub fn get(&mut self, location: &str) -> Option<CacheEntry> {
        self.entries.get(location).cloned()
    }

    /// Look up without touching recency.
    pub fn peek(&self, location: &str) -> Option<&CacheEntry> {
        self.entries.peek(location)
    }

    /// Store `entry`. A displaced materialized handle is retired, never
    /// released here.
    pub fn insert(&mut self, location: &str, entry: CacheEntry) {
        let new_value = entry.resolved.clone();
        if let Some((evicted_key, old)) = self.entries.push(location.to_string(), entry) {
            let same_key = evicted_key == location;
            if !same_key {
                self.last_attempt_ms.remove(&evicted_key);
            }
            if old.materialized && !(same_key && old.resolved == new_value) {
                self.retired.entry(evicted_key).or_default().push(old.resolved);
            }
        }
    }

    /// Compare-and-swap used by background refresh: replace the entry only if
    /// it still holds `expected`. Returns `false` when it did not.
    pub fn replace_if_current(&mut self, location: &str, expected: &str, entry: CacheEntry) -> bool {
        match self.entries.peek(location) {
            Some(current) if current.resolved == expected => {
                self.insert(location, entry);
                true
            }
            _ => false,
        }
    }

    /// Remove the entry and all bookkeeping for `location`.
    ///
    /// Returns the cached materialized handle, if any, followed by the
    /// handles retired under `location`.
    #[must_use]
    pub fn evict(&mut self, location: &str) -> Vec<String> {
        self.last_attempt_ms.remove(location);
        self.pending.remove(location);
        let mut released: Vec<String> = self
            .entries
            .pop(location)
            .filter(|entry| entry.materialized)
            .map(|entry| entry.resolved)
            .into_iter()
            .collect();
        released.extend(self.retired.remove(location).unwrap_or_default());
        released
    }

    /// Like [`evict`](Self::evict), but leaves non-materialized entries in
    /// place.
    #[must_use]
    pub fn release_location(&mut self, location: &str) -> Vec<String> {
        let materialized = self
            .entries
            .peek(location)
            .is_some_and(|entry| entry.materialized);
        let mut released = Vec::new();
        if materialized {
            if let Some(entry) = self.entries.pop(location) {
                self.last_attempt_ms.remove(location);
                released.push(entry.resolved);
            }
        }
        released.extend(self.retired.remove(location).unwrap_or_default());
        released
    }

    /// Handles no longer cached but not yet released.
    pub fn retired_count(&self) -> usize {
        self.retired.values().map(Vec::len).sum()
    }

    /// Drop everything and start a new generation.
    ///
    /// Returns every materialized and retired handle exactly once.
    #[must_use]
    pub fn clear(&mut self) -> Vec<String> {
        let mut released = Vec::new();
        while let Some((_, entry)) = self.entries.pop_lru() {
            if entry.materialized {
                released.push(entry.resolved);
            }
        }
        for (_, handles) in self.retired.drain() {
            released.extend(handles);
        }
        self.last_attempt_ms.clear();
        self.in_flight.clear();
        self.pending.clear();
        self.generation += 1;
        released
    }

    pub fn cooldown_elapsed(&self, location: &str, now_ms: i64, cooldown: Duration) -> bool {
        match self.last_attempt_ms.get(location) {
            Some(last) => now_ms.saturating_sub(*last) >= cooldown.as_millis() as i64,
            None => true,
        }
    }

    pub fn record_attempt(&mut self, location: &str, now_ms: i64) {
        self.last_attempt_ms.insert(location.to_string(), now_ms);
    }

    pub fn is_refreshing(&self, location: &str) -> bool {
        self.in_flight.contains(location)
    }

    /// Mark a background refresh as started. Returns `false` if one already is.
    pub fn begin_refresh(&mut self, location: &str, now_ms: i64) -> bool {
        if !self.in_flight.insert(location.to_string()) {
            return false;
        }
        self.record_attempt(location, now_ms);
        true
    }

    pub fn finish_refresh(&mut self, location: &str) {
        self.in_flight.remove(location);
    }

    pub fn refreshes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending(&self, location: &str) -> Option<PendingLookup> {
        self.pending.get(location).map(|(_, lookup)| lookup.clone())
    }

    /// Reserve an id for a lookup that is about to be registered.
    pub fn next_flight_id(&mut self) -> u64 {
        self.next_flight += 1;
        self.next_flight
    }

    pub fn set_pending(&mut self, location: &str, flight: u64, lookup: PendingLookup) {
        self.pending.insert(location.to_string(), (flight, lookup));
    }

    /// Forget the pending lookup for `location` if it is still `flight`.
    pub fn finish_flight(&mut self, location: &str, flight: u64) {
        if self.pending.get(location).is_some_and(|(id, _)| *id == flight) {
            self.pending.remove(location);
        }
    }

    #[cfg(test)]
    pub fn pending_lookups(&self) -> usize {
        self.pending.len()
    }
}
