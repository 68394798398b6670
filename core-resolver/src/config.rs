//! Resolver configuration.

use core_runtime::config::ResolverSettings;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Runtime configuration of a [`VideoUrlResolver`](crate::VideoUrlResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Minimum time between background refresh attempts for one location
    pub refresh_cooldown: Duration,
    /// Blob identifiers shorter than this look expired
    pub min_blob_id_len: usize,
    /// Origin of the current page, if known
    pub page_origin: Option<String>,
    /// Use the newest video record when nothing matches exactly
    pub allow_latest_video_fallback: bool,
    /// Content type for payloads stored without one
    pub default_mime_type: String,
    /// LRU capacity
    pub max_entries: NonZeroUsize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&ResolverSettings::default())
    }
}

impl From<&ResolverSettings> for ResolverConfig {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            refresh_cooldown: settings.refresh_cooldown(),
            min_blob_id_len: settings.min_blob_id_len,
            page_origin: settings.page_origin.clone(),
            allow_latest_video_fallback: settings.allow_latest_video_fallback,
            default_mime_type: settings.default_mime_type.clone(),
            max_entries: NonZeroUsize::new(settings.max_entries).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl ResolverConfig {
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    pub fn with_page_origin(mut self, origin: impl Into<String>) -> Self {
        self.page_origin = Some(origin.into());
        self
    }

    pub fn with_latest_video_fallback(mut self, allow: bool) -> Self {
        self.allow_latest_video_fallback = allow;
        self
    }

    pub fn with_max_entries(mut self, max_entries: NonZeroUsize) -> Self {
        self.max_entries = max_entries;
        self
    }
}
