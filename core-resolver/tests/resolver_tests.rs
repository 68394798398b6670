//! Integration tests for the video URL resolver.
//!
//! Bridges are replaced by in-memory fakes; time-dependent paths use
//! `ManualClock` for cooldowns and a paused Tokio clock for store latency.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BlobStore, BridgeError, ManualClock, MediaKind, MediaRecord, MediaRecordStore,
    ObjectUrlFactory, StoredBlob,
};
use chrono::Utc;
use core_resolver::{
    RefreshNotification, RefreshSource, ResolverConfig, SubscriptionScope, VideoUrlResolver,
};
use core_runtime::events::{CoreEvent, EventBus, ResolverEvent};
use mockall::mock;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

const LIVE_BLOB: &str = "blob:https://app.example/0f3c9a2e-77aa-4c1b-9d41";
const FRESH_URL: &str = "https://cdn.example/videos/0f3c9a2e.mp4";
const START_MS: i64 = 1_700_000_000_000;
const COOLDOWN: Duration = Duration::from_secs(5);

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeRecordStore {
    by_url: Mutex<HashMap<String, MediaRecord>>,
    latest: Mutex<Option<MediaRecord>>,
    find_calls: AtomicUsize,
    latest_calls: AtomicUsize,
    fail: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeRecordStore {
    fn insert(&self, url: &str, storage_url: &str) {
        self.by_url
            .lock()
            .unwrap()
            .insert(url.to_string(), record("rec-1", url, Some(storage_url)));
    }

    fn set_latest(&self, url: &str) {
        *self.latest.lock().unwrap() = Some(record("rec-latest", url, None));
    }

    fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaRecordStore for FakeRecordStore {
    async fn find_by_url(&self, url: &str) -> BridgeResult<Option<MediaRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::StoreError("HTTP 503".to_string()));
        }
        Ok(self.by_url.lock().unwrap().get(url).cloned())
    }

    async fn latest_video(&self) -> BridgeResult<Option<MediaRecord>> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.latest.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct FakeBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    get_calls: AtomicUsize,
    latency: Mutex<Duration>,
}

impl FakeBlobStore {
    fn with(keys: &[&str]) -> Self {
        let store = Self::default();
        for key in keys {
            store.blobs.lock().unwrap().insert(
                key.to_string(),
                StoredBlob::new(vec![0u8; 32]).with_mime_type("video/webm"),
            );
        }
        store
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<StoredBlob>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, blob: StoredBlob) -> BridgeResult<()> {
        self.blobs.lock().unwrap().insert(key.to_string(), blob);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct FakeObjectUrls {
    next: AtomicUsize,
    created: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
}

impl FakeObjectUrls {
    fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectUrlFactory for FakeObjectUrls {
    async fn create(&self, _blob: &StoredBlob, _fallback_mime: &str) -> BridgeResult<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("blob:https://app.example/handle-{:04}-a1b2c3", n);
        self.created.lock().unwrap().push(url.clone());
        Ok(url)
    }

    fn release(&self, url: &str) {
        self.released.lock().unwrap().push(url.to_string());
    }
}

mock! {
    pub RecordStore {}

    #[async_trait]
    impl MediaRecordStore for RecordStore {
        async fn find_by_url(&self, url: &str) -> BridgeResult<Option<MediaRecord>>;
        async fn latest_video(&self) -> BridgeResult<Option<MediaRecord>>;
    }
}

fn record(id: &str, url: &str, storage_url: Option<&str>) -> MediaRecord {
    MediaRecord {
        id: id.to_string(),
        url: url.to_string(),
        storage_url: storage_url.map(str::to_string),
        placeholder_image: None,
        kind: MediaKind::Video,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    resolver: VideoUrlResolver,
    records: Arc<FakeRecordStore>,
    blobs: Arc<FakeBlobStore>,
    urls: Arc<FakeObjectUrls>,
    clock: Arc<ManualClock>,
    bus: EventBus,
}

fn harness_with(config: ResolverConfig, blob_keys: &[&str]) -> Harness {
    let records = Arc::new(FakeRecordStore::default());
    let blobs = Arc::new(FakeBlobStore::with(blob_keys));
    let urls = Arc::new(FakeObjectUrls::default());
    let clock = Arc::new(ManualClock::new(START_MS));
    let bus = EventBus::new(32);

    let resolver = VideoUrlResolver::builder(records.clone(), blobs.clone(), urls.clone())
        .config(config)
        .clock(clock.clone())
        .event_bus(bus.clone())
        .build();

    Harness {
        resolver,
        records,
        blobs,
        urls,
        clock,
        bus,
    }
}

fn harness(blob_keys: &[&str]) -> Harness {
    harness_with(ResolverConfig::default(), blob_keys)
}

/// Wait until no background refresh is running.
async fn settle(resolver: &VideoUrlResolver) {
    for _ in 0..200 {
        if resolver.refreshes_in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("background refresh did not finish");
}

fn collect_notifications(resolver: &VideoUrlResolver, scope: SubscriptionScope) -> Arc<Mutex<Vec<RefreshNotification>>> {
    let seen: Arc<Mutex<Vec<RefreshNotification>>> = Arc::default();
    let sink = Arc::clone(&seen);
    resolver.subscribe(scope, move |notification| {
        sink.lock().unwrap().push(notification.clone());
    });
    seen
}

#[derive(Clone, Default)]
struct ErrorCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

struct FieldsVisitor(String);

impl Visit for FieldsVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for ErrorCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            let mut visitor = FieldsVisitor(String::new());
            event.record(&mut visitor);
            self.messages.lock().unwrap().push(visitor.0);
        }
    }
}

// ============================================================================
// Identity and caching
// ============================================================================

#[tokio::test]
async fn test_remote_urls_resolve_to_themselves_without_lookups() {
    let mut store = MockRecordStore::new();
    store.expect_find_by_url().never();
    store.expect_latest_video().never();

    let resolver = VideoUrlResolver::builder(
        Arc::new(store),
        Arc::new(FakeBlobStore::default()),
        Arc::new(FakeObjectUrls::default()),
    )
    .build();

    let url = "https://cdn.example/a.mp4";
    assert_eq!(resolver.resolve(url).await, url);
    assert_eq!(resolver.resolve(url).await, url);
    assert_eq!(resolver.cached(url).as_deref(), Some(url));

    let stats = resolver.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.refreshes_started, 0);
}

#[tokio::test]
async fn test_empty_and_opaque_locations_are_not_cached() {
    let h = harness(&[]);
    assert_eq!(h.resolver.resolve("").await, "");
    assert_eq!(h.resolver.resolve("   ").await, "");
    assert_eq!(h.resolver.resolve("clips/intro.mp4").await, "clips/intro.mp4");
    assert!(h.resolver.is_empty());
    assert_eq!(h.records.find_calls(), 0);
}

#[tokio::test]
async fn test_cached_store_key_is_served_without_another_read() {
    let h = harness(&["clip-1"]);

    let first = h.resolver.resolve("idb://clip-1").await;
    let second = h.resolver.resolve("idb://clip-1").await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(h.blobs.get_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.urls.created().len(), 1);
    assert_eq!(h.resolver.stats().materializations, 1);
}

#[tokio::test]
async fn test_missing_store_key_resolves_empty_and_logs_the_key_once() {
    let capture = ErrorCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let h = harness(&[]);
    let mut events = h.bus.subscribe();

    assert_eq!(h.resolver.resolve("idb://vid123").await, "");

    let errors = capture.messages.lock().unwrap().clone();
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("vid123"));
    assert!(h.resolver.cached("idb://vid123").is_none());
    assert_eq!(h.resolver.stats().materialize_failures, 1);
    assert!(matches!(
        events.try_recv(),
        Ok(CoreEvent::Resolver(ResolverEvent::MaterializeFailed { key, .. })) if key == "vid123"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolves_share_one_lookup() {
    let h = harness(&["clip-1"]);
    *h.blobs.latency.lock().unwrap() = Duration::from_millis(50);

    let (a, b, c) = tokio::join!(
        h.resolver.resolve("idb://clip-1"),
        h.resolver.resolve("idb://clip-1"),
        h.resolver.resolve("idb://clip-1"),
    );

    assert!(!a.is_empty());
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(h.blobs.get_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.urls.created().len(), 1);
}

#[tokio::test]
async fn test_lru_eviction_leaves_release_to_the_owner() {
    let config = ResolverConfig::default().with_max_entries(NonZeroUsize::new(1).unwrap());
    let h = harness_with(config, &["a", "b"]);

    let first = h.resolver.resolve("idb://a").await;
    let second = h.resolver.resolve("idb://b").await;

    assert!(h.urls.released().is_empty());
    assert_eq!(h.resolver.len(), 1);
    assert_eq!(h.resolver.retired_handles(), 1);

    assert!(h.resolver.release("idb://a"));
    assert_eq!(h.urls.released(), vec![first.clone()]);
    assert_eq!(h.resolver.retired_handles(), 0);

    h.resolver.clear_cache();
    assert_eq!(h.urls.released(), vec![first, second]);
}

#[tokio::test]
async fn test_repeated_resolves_of_a_stored_key_keep_the_handle() {
    let h = harness(&["vid123"]);
    h.records.set_latest("https://cdn.example/unrelated.mp4");

    let bound = h.resolver.resolve("idb://vid123").await;
    let second = h.resolver.resolve("idb://vid123").await;
    settle(&h.resolver).await;

    assert_eq!(bound, second);
    assert_eq!(h.resolver.cached("idb://vid123"), Some(bound));
    assert!(h.urls.released().is_empty());
    assert_eq!(h.records.find_calls(), 0);
    assert_eq!(h.resolver.stats().refreshes_started, 0);
}

#[tokio::test]
async fn test_stored_key_revalidation_skips_the_latest_video_guess() {
    let h = harness(&["vid123"]);
    h.records.set_latest("https://cdn.example/unrelated.mp4");

    let bound = h.resolver.resolve("idb://vid123").await;
    h.clock.advance(COOLDOWN);
    h.resolver.resolve("idb://vid123").await;
    settle(&h.resolver).await;

    assert_eq!(h.records.find_calls(), 1);
    assert_eq!(h.records.latest_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.resolver.cached("idb://vid123"), Some(bound));
    assert!(h.urls.released().is_empty());
}

#[tokio::test]
async fn test_refreshed_stored_key_retires_its_handle_until_released() {
    let h = harness(&["vid123"]);
    h.records.insert("idb://vid123", FRESH_URL);

    let bound = h.resolver.resolve("idb://vid123").await;
    h.clock.advance(COOLDOWN);
    assert_eq!(h.resolver.resolve("idb://vid123").await, bound);
    settle(&h.resolver).await;

    assert_eq!(h.resolver.cached("idb://vid123").as_deref(), Some(FRESH_URL));
    assert!(h.urls.released().is_empty());
    assert_eq!(h.resolver.retired_handles(), 1);

    assert!(h.resolver.release("idb://vid123"));
    assert_eq!(h.urls.released(), vec![bound]);
    assert_eq!(h.resolver.retired_handles(), 0);
    assert_eq!(h.resolver.cached("idb://vid123").as_deref(), Some(FRESH_URL));
}

// ============================================================================
// Release, force refresh, clear
// ============================================================================

#[tokio::test]
async fn test_force_refresh_releases_the_old_handle_exactly_once() {
    let h = harness(&["clip-1"]);

    let first = h.resolver.resolve("idb://clip-1").await;
    let second = h.resolver.force_refresh("idb://clip-1").await;

    assert_ne!(first, second);
    assert_eq!(h.urls.released(), vec![first.clone()]);
    assert_eq!(h.resolver.cached("idb://clip-1"), Some(second.clone()));

    let third = h.resolver.force_refresh("idb://clip-1").await;
    assert_eq!(h.urls.released(), vec![first, second]);
    assert_eq!(h.resolver.cached("idb://clip-1"), Some(third));
}

#[tokio::test]
async fn test_clear_cache_releases_each_handle_once() {
    let h = harness(&["a", "b"]);
    let mut events = h.bus.subscribe();

    let a = h.resolver.resolve("idb://a").await;
    let b = h.resolver.resolve("idb://b").await;
    h.resolver.resolve("https://cdn.example/c.mp4").await;

    h.resolver.clear_cache();
    h.resolver.clear_cache();

    let mut released = h.urls.released();
    released.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(released, expected);
    assert!(h.resolver.is_empty());

    let cleared: Vec<usize> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            CoreEvent::Resolver(ResolverEvent::CacheCleared { released_handles }) => {
                Some(released_handles)
            }
            _ => None,
        })
        .collect();
    assert_eq!(cleared, vec![2, 0]);
}

#[tokio::test]
async fn test_release_only_touches_materialized_entries() {
    let h = harness(&["a"]);
    let handle = h.resolver.resolve("idb://a").await;
    h.resolver.resolve("https://cdn.example/c.mp4").await;

    assert!(h.resolver.release("idb://a"));
    assert!(!h.resolver.release("idb://a"));
    assert!(!h.resolver.release("https://cdn.example/c.mp4"));

    assert_eq!(h.urls.released(), vec![handle]);
    assert!(h.resolver.cached("https://cdn.example/c.mp4").is_some());
    assert_eq!(h.resolver.stats().releases, 1);
}

#[tokio::test]
async fn test_force_refresh_looks_up_live_session_urls() {
    let h = harness(&[]);
    h.records.insert(LIVE_BLOB, FRESH_URL);

    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    assert_eq!(h.records.find_calls(), 0);

    assert_eq!(h.resolver.force_refresh(LIVE_BLOB).await, FRESH_URL);
    assert_eq!(h.records.find_calls(), 1);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(FRESH_URL));
}

// ============================================================================
// Stale-while-revalidate
// ============================================================================

#[tokio::test]
async fn test_repeated_resolves_start_at_most_one_background_refresh() {
    let h = harness(&[]);

    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    settle(&h.resolver).await;
    assert_eq!(h.records.find_calls(), 0);

    h.clock.advance(COOLDOWN);
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    settle(&h.resolver).await;

    assert_eq!(h.records.find_calls(), 1);
    assert_eq!(h.resolver.stats().refreshes_started, 1);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(LIVE_BLOB));
}

#[tokio::test]
async fn test_background_refresh_updates_cache_and_notifies() {
    let h = harness(&[]);
    h.records.insert(LIVE_BLOB, FRESH_URL);
    let scoped = collect_notifications(&h.resolver, SubscriptionScope::location(LIVE_BLOB));
    let unrelated = collect_notifications(
        &h.resolver,
        SubscriptionScope::location("blob:https://app.example/ffff-0000-1111"),
    );
    let mut events = h.bus.subscribe();

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    // Stale value is returned while the refresh runs.
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    settle(&h.resolver).await;

    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, FRESH_URL);
    assert_eq!(
        *scoped.lock().unwrap(),
        vec![RefreshNotification {
            original: LIVE_BLOB.to_string(),
            refreshed: FRESH_URL.to_string(),
            source: RefreshSource::RecordMatch,
        }]
    );
    assert!(unrelated.lock().unwrap().is_empty());

    let refreshed = std::iter::from_fn(|| events.try_recv().ok()).find(|event| {
        matches!(event, CoreEvent::Resolver(ResolverEvent::UrlRefreshed { .. }))
    });
    assert_eq!(
        refreshed,
        Some(CoreEvent::Resolver(ResolverEvent::UrlRefreshed {
            original: LIVE_BLOB.to_string(),
            refreshed: FRESH_URL.to_string(),
            source: RefreshSource::RecordMatch,
        }))
    );
    assert_eq!(h.resolver.stats().refreshes_succeeded, 1);
}

#[tokio::test]
async fn test_refresh_cooldown_limits_attempts_per_location() {
    let h = harness(&[]);

    h.resolver.resolve(LIVE_BLOB).await;
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;
    assert_eq!(h.records.find_calls(), 0);

    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;
    assert_eq!(h.records.find_calls(), 1);

    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;

    assert_eq!(h.records.find_calls(), 2);
    assert_eq!(h.resolver.stats().refreshes_failed, 2);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(LIVE_BLOB));
}

#[tokio::test]
async fn test_latest_video_fallback_is_flagged() {
    let h = harness(&[]);
    h.records.set_latest("https://cdn.example/newest.mp4");
    let seen = collect_notifications(&h.resolver, SubscriptionScope::All);

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].refreshed, "https://cdn.example/newest.mp4");
    assert_eq!(seen[0].source, RefreshSource::LatestVideoFallback);
}

#[tokio::test]
async fn test_latest_video_fallback_can_be_disabled() {
    let h = harness_with(ResolverConfig::default().with_latest_video_fallback(false), &[]);
    h.records.set_latest("https://cdn.example/newest.mp4");

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;

    assert_eq!(h.records.latest_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(LIVE_BLOB));
}

#[tokio::test]
async fn test_refresh_errors_leave_the_entry_untouched() {
    let h = harness(&[]);
    h.records.fail.store(true, Ordering::SeqCst);
    let mut events = h.bus.subscribe();

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);
    settle(&h.resolver).await;

    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(LIVE_BLOB));
    assert_eq!(h.resolver.stats().refreshes_failed, 1);
    let failed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|event| matches!(event, CoreEvent::Resolver(ResolverEvent::RefreshFailed { .. })));
    assert!(failed);
}

#[tokio::test]
async fn test_clear_cache_discards_refresh_started_before_it() {
    let h = harness(&[]);
    h.records.insert(LIVE_BLOB, FRESH_URL);
    let gate = h.records.gate();
    let seen = collect_notifications(&h.resolver, SubscriptionScope::All);

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    assert_eq!(h.resolver.stats().refreshes_started, 1);
    tokio::task::yield_now().await;

    h.resolver.clear_cache();
    assert_eq!(h.resolver.resolve(LIVE_BLOB).await, LIVE_BLOB);

    gate.notify_one();
    for _ in 0..200 {
        if h.resolver.stats().refreshes_discarded == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(h.resolver.stats().refreshes_discarded, 1);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(LIVE_BLOB));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsubscribed_callbacks_are_not_invoked() {
    let h = harness(&[]);
    h.records.insert(LIVE_BLOB, FRESH_URL);
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let id = h.resolver.subscribe(SubscriptionScope::All, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(h.resolver.unsubscribe(id));
    assert!(!h.resolver.unsubscribe(id));

    h.resolver.resolve(LIVE_BLOB).await;
    h.clock.advance(COOLDOWN);
    h.resolver.resolve(LIVE_BLOB).await;
    settle(&h.resolver).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(h.resolver.cached(LIVE_BLOB).as_deref(), Some(FRESH_URL));
}

// ============================================================================
// Expired session URLs
// ============================================================================

#[tokio::test]
async fn test_expired_blob_is_recovered_before_returning() {
    let config = ResolverConfig::default().with_page_origin("https://app.example");
    let h = harness_with(config, &[]);
    let stale = "blob:https://old.example/0f3c9a2e-77aa-4c1b";
    h.records.insert(stale, FRESH_URL);

    assert_eq!(h.resolver.resolve(stale).await, FRESH_URL);
    assert_eq!(h.resolver.resolve(stale).await, FRESH_URL);
    assert_eq!(h.records.find_calls(), 1);
}

#[tokio::test]
async fn test_unrecoverable_expired_blob_is_returned_unchanged_and_cooled_down() {
    let h = harness_with(ResolverConfig::default().with_latest_video_fallback(false), &[]);
    let malformed = "blob:https://app.example/abc";

    assert_eq!(h.resolver.resolve(malformed).await, malformed);
    assert_eq!(h.resolver.resolve(malformed).await, malformed);
    assert_eq!(h.records.find_calls(), 1);
    assert!(h.resolver.cached(malformed).is_none());

    h.clock.advance(Duration::from_secs(6));
    assert_eq!(h.resolver.resolve(malformed).await, malformed);
    assert_eq!(h.records.find_calls(), 2);
}
