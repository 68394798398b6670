//! Fresher-URL lookup against the media record store.

use bridge_traits::{MediaRecord, MediaRecordStore};
use core_runtime::events::RefreshSource;
use core_runtime::logging::strip_query;
use tracing::{debug, warn};

use crate::error::{ResolverError, Result};

/// Find a URL that can replace `current` for `original`.
///
/// Looks for the record whose stored URL equals `original` first. When none
/// matches and `allow_fallback` is set, the newest video record is used; that
/// heuristic can pick an unrelated asset, so it is logged at warn level and
/// reported as [`RefreshSource::LatestVideoFallback`].
///
/// A candidate only counts when it is non-empty and differs from `current`.
pub(crate) async fn find_fresher_url(
    store: &dyn MediaRecordStore,
    original: &str,
    current: &str,
    allow_fallback: bool,
) -> Result<(String, RefreshSource)> {
    if let Some(record) = store.find_by_url(original).await? {
        if let Some(url) = candidate(&record, current) {
            debug!(record_id = %record.id, "matched media record");
            return Ok((url, RefreshSource::RecordMatch));
        }
        debug!(record_id = %record.id, "matched record has no newer URL");
    }

    if allow_fallback {
        if let Some(record) = store.latest_video().await? {
            if let Some(url) = candidate(&record, current) {
                warn!(
                    record_id = %record.id,
                    refreshed = %strip_query(&url),
                    "no record matches location; using newest video record"
                );
                return Ok((url, RefreshSource::LatestVideoFallback));
            }
        }
    }

    Err(ResolverError::NoFresherUrl(original.to_string()))
}

fn candidate(record: &MediaRecord, current: &str) -> Option<String> {
    record
        .playable_url()
        .filter(|url| *url != current)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, MediaKind};
    use chrono::Utc;

    struct StaticStore {
        by_url: Option<MediaRecord>,
        latest: Option<MediaRecord>,
        fail: bool,
    }

    #[async_trait]
    impl MediaRecordStore for StaticStore {
        async fn find_by_url(&self, _url: &str) -> BridgeResult<Option<MediaRecord>> {
            if self.fail {
                return Err(BridgeError::StoreError("503".to_string()));
            }
            Ok(self.by_url.clone())
        }

        async fn latest_video(&self) -> BridgeResult<Option<MediaRecord>> {
            Ok(self.latest.clone())
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

    const STALE: &str = "blob:https://app.example/0f3c9a2e-77aa";

    #[tokio::test]
    async fn test_exact_match_wins() {
        let store = StaticStore {
            by_url: Some(record("1", STALE, Some("https://cdn.example/1.mp4"))),
            latest: Some(record("2", "https://cdn.example/2.mp4", None)),
            fail: false,
        };
        let (url, source) = find_fresher_url(&store, STALE, STALE, true).await.unwrap();
        assert_eq!(url, "https://cdn.example/1.mp4");
        assert_eq!(source, RefreshSource::RecordMatch);
    }

    #[tokio::test]
    async fn test_fallback_to_latest_video() {
        let store = StaticStore {
            by_url: None,
            latest: Some(record("2", "https://cdn.example/2.mp4", None)),
            fail: false,
        };
        let (url, source) = find_fresher_url(&store, STALE, STALE, true).await.unwrap();
        assert_eq!(url, "https://cdn.example/2.mp4");
        assert_eq!(source, RefreshSource::LatestVideoFallback);

        let disabled = find_fresher_url(&store, STALE, STALE, false).await;
        assert!(matches!(disabled, Err(ResolverError::NoFresherUrl(_))));
    }

    #[tokio::test]
    async fn test_unchanged_candidate_does_not_count() {
        let store = StaticStore {
            by_url: Some(record("1", STALE, None)),
            latest: None,
            fail: false,
        };
        let result = find_fresher_url(&store, STALE, STALE, true).await;
        assert!(matches!(result, Err(ResolverError::NoFresherUrl(_))));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = StaticStore {
            by_url: None,
            latest: None,
            fail: true,
        };
        let result = find_fresher_url(&store, STALE, STALE, true).await;
        assert!(matches!(result, Err(ResolverError::Store(_))));
    }
}
