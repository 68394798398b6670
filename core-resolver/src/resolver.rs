//! The video URL resolver.

use bridge_traits::{BlobStore, Clock, MediaRecordStore, ObjectUrlFactory, SystemClock};
use core_async::task;
use core_runtime::events::{CoreEvent, EventBus, ResolverEvent};
use core_runtime::logging::strip_query;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::cache::{CacheEntry, CacheState, PendingLookup};
use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::location::{blob_looks_expired, is_session_local_url, VideoLocation};
use crate::refresh::find_fresher_url;
use crate::stats::{ResolverStats, StatsRecorder};
use crate::subscription::{
    RefreshCallback, RefreshNotification, Subscribers, SubscriptionId, SubscriptionScope,
};

struct Inner {
    config: ResolverConfig,
    record_store: Arc<dyn MediaRecordStore>,
    blob_store: Arc<dyn BlobStore>,
    object_urls: Arc<dyn ObjectUrlFactory>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    state: Mutex<CacheState>,
    subscribers: Subscribers,
    stats: StatsRecorder,
}

/// Outcome of trying to start or join a single-flight lookup.
enum Flight {
    Cached(String),
    Join(PendingLookup),
    Skipped,
}

/// Resolves location strings into playable URLs.
///
/// Cheap to clone; clones share one cache. See the crate docs for the
/// resolution rules.
#[derive(Clone)]
pub struct VideoUrlResolver {
    inner: Arc<Inner>,
}

/// Builder for [`VideoUrlResolver`].
pub struct VideoUrlResolverBuilder {
    record_store: Arc<dyn MediaRecordStore>,
    blob_store: Arc<dyn BlobStore>,
    object_urls: Arc<dyn ObjectUrlFactory>,
    config: ResolverConfig,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl VideoUrlResolverBuilder {
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> VideoUrlResolver {
        let state = CacheState::new(self.config.max_entries);
        VideoUrlResolver {
            inner: Arc::new(Inner {
                config: self.config,
                record_store: self.record_store,
                blob_store: self.blob_store,
                object_urls: self.object_urls,
                clock: self.clock,
                event_bus: self.event_bus,
                state: Mutex::new(state),
                subscribers: Subscribers::default(),
                stats: StatsRecorder::default(),
            }),
        }
    }
}

impl VideoUrlResolver {
    pub fn builder(
        record_store: Arc<dyn MediaRecordStore>,
        blob_store: Arc<dyn BlobStore>,
        object_urls: Arc<dyn ObjectUrlFactory>,
    ) -> VideoUrlResolverBuilder {
        VideoUrlResolverBuilder {
            record_store,
            blob_store,
            object_urls,
            config: ResolverConfig::default(),
            clock: Arc::new(SystemClock),
            event_bus: None,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Resolve `location` into a playable URL.
    ///
    /// Never fails: unresolvable stored keys yield `""`, unrecoverable blob
    /// URLs and unknown schemes come back unchanged.
    #[instrument(level = "debug", skip_all, fields(location = %strip_query(location)))]
    pub async fn resolve(&self, location: &str) -> String {
        self.resolve_location(VideoLocation::parse(location), false)
            .await
    }

    /// Drop the cached resolution for `location` and resolve it again.
    ///
    /// Materialized handles for the location, including ones a refresh or
    /// eviction already displaced, are released first. Session-local URLs are
    /// looked up in the record store even when they do not look expired.
    #[instrument(skip_all, fields(location = %strip_query(location)))]
    pub async fn force_refresh(&self, location: &str) -> String {
        let parsed = VideoLocation::parse(location);
        if parsed.as_str().is_empty() {
            return String::new();
        }

        let released = self.inner.state.lock().evict(parsed.as_str());
        self.release_handles(released);
        debug!("evicted cache entry");

        self.resolve_location(parsed, true).await
    }

    /// Release every materialized handle and forget all cached state.
    ///
    /// Background refreshes that started before the clear have their results
    /// discarded.
    #[instrument(skip(self))]
    pub fn clear_cache(&self) {
        let released = self.inner.state.lock().clear();
        let count = released.len();
        self.release_handles(released);
        info!(released_handles = count, "resolver cache cleared");
        self.emit(ResolverEvent::CacheCleared {
            released_handles: count,
        });
    }

    /// Release the materialized handles owned for `location`: the cached one
    /// and any displaced by a refresh or a capacity eviction.
    ///
    /// Returns `true` when a handle was released. Entries that are not
    /// materialized handles are left in place.
    pub fn release(&self, location: &str) -> bool {
        let parsed = VideoLocation::parse(location);
        let released = self.inner.state.lock().release_location(parsed.as_str());
        let any = !released.is_empty();
        self.release_handles(released);
        any
    }

    /// Displaced handles still waiting for [`release`](Self::release),
    /// [`force_refresh`](Self::force_refresh) or
    /// [`clear_cache`](Self::clear_cache).
    pub fn retired_handles(&self) -> usize {
        self.inner.state.lock().retired_count()
    }

    /// Cached value for `location` without resolving or touching recency.
    pub fn cached(&self, location: &str) -> Option<String> {
        let parsed = VideoLocation::parse(location);
        self.inner
            .state
            .lock()
            .peek(parsed.as_str())
            .map(|entry| entry.resolved.clone())
    }

    /// Register `callback` for refreshes matching `scope`.
    pub fn subscribe<F>(&self, scope: SubscriptionScope, callback: F) -> SubscriptionId
    where
        F: Fn(&RefreshNotification) + Send + Sync + 'static,
    {
        let callback: RefreshCallback = Arc::new(callback);
        self.inner.subscribers.subscribe(scope, callback)
    }

    /// Returns `false` when `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn stats(&self) -> ResolverStats {
        let entries = self.len();
        self.inner.stats.snapshot(entries)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of background refreshes currently running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.inner.state.lock().refreshes_in_flight()
    }

    async fn resolve_location(&self, location: VideoLocation, forced: bool) -> String {
        if location.as_str().is_empty() {
            return String::new();
        }

        if let Some(hit) = self.cached_with_revalidation(location.as_str()) {
            return hit;
        }
        StatsRecorder::bump(&self.inner.stats.misses);

        match location {
            VideoLocation::Remote(url) => {
                self.store_entry(&url, CacheEntry::identity(&url));
                url
            }
            VideoLocation::Opaque(value) => value,
            VideoLocation::StoreKey { location, key } => {
                let inner = Arc::clone(&self.inner);
                let flight_location = location.clone();
                let flight = self.begin_flight(
                    &location,
                    |_| true,
                    move |flight| materialize(inner, flight_location, key, flight).boxed(),
                );
                self.await_flight(flight, &location).await
            }
            VideoLocation::LocalBlob(url) => {
                let config = &self.inner.config;
                let expired = blob_looks_expired(
                    &url,
                    config.page_origin.as_deref(),
                    config.min_blob_id_len,
                );

                if !expired && !forced {
                    self.store_entry(&url, CacheEntry::identity(&url));
                    return url;
                }

                debug!(expired, forced, "looking up replacement for session-local URL");
                let now = self.inner.clock.unix_timestamp_millis();
                let cooldown = config.refresh_cooldown;
                let inner = Arc::clone(&self.inner);
                let flight_location = url.clone();
                let flight = self.begin_flight(
                    &url,
                    move |state| {
                        if forced || state.cooldown_elapsed(&flight_location, now, cooldown) {
                            state.record_attempt(&flight_location, now);
                            true
                        } else {
                            false
                        }
                    },
                    {
                        let location = url.clone();
                        move |flight| recover_expired(inner, location, flight).boxed()
                    },
                );
                self.await_flight(flight, &url).await
            }
        }
    }

    /// Serve a cache hit, scheduling a background refresh when the cached
    /// value is session-local and the cooldown has elapsed.
    fn cached_with_revalidation(&self, location: &str) -> Option<String> {
        let now = self.inner.clock.unix_timestamp_millis();
        let cooldown = self.inner.config.refresh_cooldown;

        let (entry, refresh_generation) = {
            let mut state = self.inner.state.lock();
            let entry = state.get(location)?;
            let session_local = entry.materialized || is_session_local_url(&entry.resolved);
            let start = session_local
                && !state.is_refreshing(location)
                && state.cooldown_elapsed(location, now, cooldown)
                && task::runtime_available()
                && state.begin_refresh(location, now);
            let generation = start.then(|| state.generation());
            (entry, generation)
        };

        StatsRecorder::bump(&self.inner.stats.hits);
        if let Some(generation) = refresh_generation {
            self.spawn_refresh(location.to_string(), entry.resolved.clone(), generation);
        }
        Some(entry.resolved)
    }

    fn begin_flight<G, M>(&self, location: &str, allow_start: G, make: M) -> Flight
    where
        G: FnOnce(&mut CacheState) -> bool,
        M: FnOnce(u64) -> BoxFuture<'static, String>,
    {
        let mut state = self.inner.state.lock();
        if let Some(entry) = state.peek(location) {
            return Flight::Cached(entry.resolved.clone());
        }
        if let Some(existing) = state.pending(location) {
            debug!("joining in-flight lookup");
            return Flight::Join(existing);
        }
        if !allow_start(&mut state) {
            return Flight::Skipped;
        }

        let flight = state.next_flight_id();
        let lookup = make(flight).shared();
        state.set_pending(location, flight, lookup.clone());
        Flight::Join(lookup)
    }

    async fn await_flight(&self, flight: Flight, location: &str) -> String {
        match flight {
            Flight::Cached(value) => value,
            Flight::Join(lookup) => lookup.await,
            Flight::Skipped => {
                debug!("lookup cooling down; returning location unchanged");
                location.to_string()
            }
        }
    }

    fn spawn_refresh(&self, location: String, current: String, generation: u64) {
        StatsRecorder::bump(&self.inner.stats.refreshes_started);
        let span = info_span!("background_refresh", location = %strip_query(&location));
        let resolver = self.clone();
        task::spawn(
            async move {
                resolver.run_refresh(location, current, generation).await;
            }
            .instrument(span),
        );
    }

    async fn run_refresh(&self, location: String, current: String, generation: u64) {
        let outcome = find_fresher_url(
            self.inner.record_store.as_ref(),
            &location,
            &current,
            // Only host-issued session URLs can match the newest record.
            self.inner.config.allow_latest_video_fallback && is_session_local_url(&location),
        )
        .await;

        let applied: Result<_> = {
            let mut state = self.inner.state.lock();
            if state.generation() != generation {
                Err(ResolverError::Superseded)
            } else {
                state.finish_refresh(&location);
                match outcome {
                    Ok((url, source)) => {
                        if state.replace_if_current(&location, &current, CacheEntry::fresh(url.clone())) {
                            Ok((url, source))
                        } else {
                            Err(ResolverError::Superseded)
                        }
                    }
                    Err(err) => Err(err),
                }
            }
        };

        match applied {
            Ok((refreshed, source)) => {
                StatsRecorder::bump(&self.inner.stats.refreshes_succeeded);
                info!(%source, refreshed = %strip_query(&refreshed), "cached URL refreshed");
                let notification = RefreshNotification {
                    original: location.clone(),
                    refreshed: refreshed.clone(),
                    source,
                };
                self.inner.subscribers.notify(&notification);
                self.emit(ResolverEvent::UrlRefreshed {
                    original: location,
                    refreshed,
                    source,
                });
            }
            Err(ResolverError::Superseded) => {
                StatsRecorder::bump(&self.inner.stats.refreshes_discarded);
                debug!("cache changed during refresh; result discarded");
            }
            Err(err) => {
                StatsRecorder::bump(&self.inner.stats.refreshes_failed);
                if matches!(err, ResolverError::NoFresherUrl(_)) {
                    debug!(error = %err, "background refresh found nothing");
                } else {
                    warn!(error = %err, "background refresh failed");
                }
                self.emit(ResolverEvent::RefreshFailed {
                    location,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn store_entry(&self, location: &str, entry: CacheEntry) {
        let now = self.inner.clock.unix_timestamp_millis();
        let mut state = self.inner.state.lock();
        if is_session_local_url(&entry.resolved) {
            state.record_attempt(location, now);
        }
        state.insert(location, entry);
    }

    fn release_handles(&self, handles: Vec<String>) {
        release_all(&self.inner, handles);
    }

    fn emit(&self, event: ResolverEvent) {
        emit(&self.inner, event);
    }
}

impl fmt::Debug for VideoUrlResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoUrlResolver")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn release_all(inner: &Inner, handles: Vec<String>) {
    if handles.is_empty() {
        return;
    }
    StatsRecorder::add(&inner.stats.releases, handles.len() as u64);
    for handle in handles {
        debug!(handle = %handle, "releasing materialized handle");
        inner.object_urls.release(&handle);
    }
}

fn emit(inner: &Inner, event: ResolverEvent) {
    if let Some(bus) = &inner.event_bus {
        // No subscribers is not an error for the resolver.
        let _ = bus.emit(CoreEvent::Resolver(event));
    }
}

async fn load_and_materialize(inner: &Inner, key: &str) -> Result<String> {
    let blob = inner
        .blob_store
        .get(key)
        .await
        .map_err(|source| ResolverError::BlobRead {
            key: key.to_string(),
            source,
        })?
        .ok_or_else(|| ResolverError::BlobMissing(key.to_string()))?;

    inner
        .object_urls
        .create(&blob, &inner.config.default_mime_type)
        .await
        .map_err(|source| ResolverError::Materialize {
            key: key.to_string(),
            source,
        })
}

/// Single-flight body for `idb://<key>` locations.
async fn materialize(inner: Arc<Inner>, location: String, key: String, flight: u64) -> String {
    let outcome = load_and_materialize(&inner, &key).await;

    match outcome {
        Ok(url) => {
            let now = inner.clock.unix_timestamp_millis();
            {
                let mut state = inner.state.lock();
                state.finish_flight(&location, flight);
                state.insert(&location, CacheEntry::materialized(url.clone()));
                state.record_attempt(&location, now);
            }
            StatsRecorder::bump(&inner.stats.materializations);
            debug!(key = %key, "stored video materialized");
            emit(&inner, ResolverEvent::Materialized { key });
            url
        }
        Err(err) => {
            inner.state.lock().finish_flight(&location, flight);
            StatsRecorder::bump(&inner.stats.materialize_failures);
            error!(key = %key, "{}", err);
            emit(
                &inner,
                ResolverEvent::MaterializeFailed {
                    key,
                    reason: err.to_string(),
                },
            );
            String::new()
        }
    }
}

/// Single-flight body for session-local URLs that look expired.
async fn recover_expired(inner: Arc<Inner>, location: String, flight: u64) -> String {
    let outcome = find_fresher_url(
        inner.record_store.as_ref(),
        &location,
        &location,
        inner.config.allow_latest_video_fallback,
    )
    .await;

    match outcome {
        Ok((url, source)) => {
            let now = inner.clock.unix_timestamp_millis();
            {
                let mut state = inner.state.lock();
                state.finish_flight(&location, flight);
                state.insert(&location, CacheEntry::fresh(url.clone()));
                state.record_attempt(&location, now);
            }
            info!(%source, refreshed = %strip_query(&url), "recovered expired session URL");
            emit(
                &inner,
                ResolverEvent::UrlRefreshed {
                    original: location,
                    refreshed: url.clone(),
                    source,
                },
            );
            url
        }
        Err(err) => {
            inner.state.lock().finish_flight(&location, flight);
            warn!(error = %err, "could not recover expired session URL");
            emit(
                &inner,
                ResolverEvent::RefreshFailed {
                    location: location.clone(),
                    reason: err.to_string(),
                },
            );
            location
        }
    }
}
