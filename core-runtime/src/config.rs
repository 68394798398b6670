//! # Core Configuration Module
//!
//! Builder-based configuration for the video core.
//!
//! ## Overview
//!
//! [`CoreConfigBuilder`] collects the host bridges and tunable settings and
//! produces a validated [`CoreConfig`]. Missing bridges fail fast with
//! [`Error::CapabilityMissing`] naming the capability and how to provide it.
//!
//! ## Required Dependencies
//!
//! - `MediaRecordStore` - Hosted media table lookups used for URL refresh
//! - `BlobStore` - Locally stored video payloads (`idb://<key>` locations)
//! - `ObjectUrlFactory` - Materializes payloads into playable handles
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source (default: [`SystemClock`])
//! - `HttpClient` - Used by the desktop REST store
//!
//! When the `desktop-shims` feature is enabled, `FsBlobStore` and
//! `TempFileObjectUrls` are injected if not provided, and
//! [`rest_backend`](CoreConfigBuilder::rest_backend) wires a reqwest-backed
//! `RestMediaStore`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .record_store(Arc::new(MyRecordStore))
//!     .blob_store(Arc::new(MyBlobStore))
//!     .object_urls(Arc::new(MyObjectUrls))
//!     .settings_from_toml(r#"
//!         [resolver]
//!         refresh_cooldown_ms = 2000
//!         page_origin = "https://gallery.example"
//!     "#)?
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{BlobStore, Clock, HttpClient, MediaRecordStore, ObjectUrlFactory, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

fn default_refresh_cooldown_ms() -> u64 {
    5_000
}

fn default_min_blob_id_len() -> usize {
    8
}

fn default_allow_latest_video_fallback() -> bool {
    true
}

fn default_mime_type() -> String {
    "video/mp4".to_string()
}

fn default_max_entries() -> usize {
    500
}

fn default_visibility_debounce_ms() -> u64 {
    150
}

fn default_hover_delay_ms() -> u64 {
    0
}

/// Tunables for URL resolution and revalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Minimum time between background refresh attempts for one location
    #[serde(default = "default_refresh_cooldown_ms")]
    pub refresh_cooldown_ms: u64,

    /// Blob identifiers shorter than this are treated as malformed/expired
    #[serde(default = "default_min_blob_id_len")]
    pub min_blob_id_len: usize,

    /// Origin of the current page; blob URLs from another origin are expired.
    /// `None` disables the origin check.
    #[serde(default)]
    pub page_origin: Option<String>,

    /// Fall back to the newest video record when no record matches exactly
    #[serde(default = "default_allow_latest_video_fallback")]
    pub allow_latest_video_fallback: bool,

    /// Content type used when a stored payload carries none
    #[serde(default = "default_mime_type")]
    pub default_mime_type: String,

    /// Maximum cached locations before least-recently-used eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            refresh_cooldown_ms: default_refresh_cooldown_ms(),
            min_blob_id_len: default_min_blob_id_len(),
            page_origin: None,
            allow_latest_video_fallback: default_allow_latest_video_fallback(),
            default_mime_type: default_mime_type(),
            max_entries: default_max_entries(),
        }
    }
}

impl ResolverSettings {
    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_millis(self.refresh_cooldown_ms)
    }
}

/// Defaults applied to every playback orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDefaults {
    /// Debounce applied to viewport enter/leave signals
    #[serde(default = "default_visibility_debounce_ms")]
    pub visibility_debounce_ms: u64,

    /// Delay between pointer enter and play intent (0 = immediate)
    #[serde(default = "default_hover_delay_ms")]
    pub hover_delay_ms: u64,

    /// Keep position on hover end instead of seeking back to the start
    #[serde(default)]
    pub preview_mode: bool,

    /// Treat the host as a touch device (tap-to-play, poster affordance)
    #[serde(default)]
    pub touch_device: bool,

    /// Release a materialized local handle when its player unmounts.
    /// Off by default: several players may share one location.
    #[serde(default)]
    pub release_local_on_unmount: bool,
}

impl Default for PlayerDefaults {
    fn default() -> Self {
        Self {
            visibility_debounce_ms: default_visibility_debounce_ms(),
            hover_delay_ms: default_hover_delay_ms(),
            preview_mode: false,
            touch_device: false,
            release_local_on_unmount: false,
        }
    }
}

impl PlayerDefaults {
    pub fn visibility_debounce(&self) -> Duration {
        Duration::from_millis(self.visibility_debounce_ms)
    }

    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }
}

/// Serializable settings loaded from TOML or set programmatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSettings {
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub player: PlayerDefaults,
}

impl CoreSettings {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(format!("Invalid settings: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolver.max_entries == 0 {
            return Err(Error::Config(
                "resolver.max_entries must be greater than 0".to_string(),
            ));
        }

        if self.resolver.default_mime_type.trim().is_empty() {
            return Err(Error::Config(
                "resolver.default_mime_type cannot be empty".to_string(),
            ));
        }

        if let Some(origin) = &self.resolver.page_origin {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "resolver.page_origin must be an http(s) origin, got '{}'",
                    origin
                )));
            }
        }

        if self.player.visibility_debounce_ms > 10_000 {
            return Err(Error::Config(
                "player.visibility_debounce_ms exceeds maximum of 10 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration: host bridges plus settings.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Hosted media table lookups (required)
    pub record_store: Arc<dyn MediaRecordStore>,

    /// Local video payloads (required, desktop default: `FsBlobStore`)
    pub blob_store: Arc<dyn BlobStore>,

    /// Local playable handle factory (required, desktop default: `TempFileObjectUrls`)
    pub object_urls: Arc<dyn ObjectUrlFactory>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// HTTP client, when one was injected or created for the REST store
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub settings: CoreSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("record_store", &"MediaRecordStore { ... }")
            .field("blob_store", &"BlobStore { ... }")
            .field("object_urls", &"ObjectUrlFactory { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("settings", &self.settings)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates settings and sizes.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }
        self.settings.validate()
    }
}

fn record_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaRecordStore".to_string(),
        message: "A media record store is required to refresh expired video URLs. \
                 Desktop: enable the 'desktop-shims' feature and call rest_backend(). \
                 Web: inject the host's backend-as-a-service adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_blob_store(_data_dir: Option<&PathBuf>) -> Result<Arc<dyn BlobStore>> {
    Err(Error::CapabilityMissing {
        capability: "BlobStore".to_string(),
        message: "A blob store is required to resolve locally stored videos. \
                 Desktop: enable the 'desktop-shims' feature to use FsBlobStore. \
                 Web: inject an IndexedDB-backed store."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_blob_store(data_dir: Option<&PathBuf>) -> Result<Arc<dyn BlobStore>> {
    use bridge_desktop::FsBlobStore;

    let store = match data_dir {
        Some(dir) => FsBlobStore::new(dir.join("blobs")),
        None => FsBlobStore::in_default_location().map_err(|e| {
            Error::Internal(format!("Failed to locate default blob directory: {}", e))
        })?,
    };
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_object_urls() -> Result<Arc<dyn ObjectUrlFactory>> {
    Err(Error::CapabilityMissing {
        capability: "ObjectUrlFactory".to_string(),
        message: "An object URL factory is required to play locally stored videos. \
                 Desktop: enable the 'desktop-shims' feature to use TempFileObjectUrls. \
                 Web: inject a URL.createObjectURL adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_object_urls() -> Result<Arc<dyn ObjectUrlFactory>> {
    use bridge_desktop::TempFileObjectUrls;

    let factory = TempFileObjectUrls::in_temp_dir()
        .map_err(|e| Error::Internal(format!("Failed to prepare temp media directory: {}", e)))?;
    Ok(Arc::new(factory))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    record_store: Option<Arc<dyn MediaRecordStore>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    object_urls: Option<Arc<dyn ObjectUrlFactory>>,
    clock: Option<Arc<dyn Clock>>,
    http_client: Option<Arc<dyn HttpClient>>,
    data_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    settings: CoreSettings,
    #[cfg(feature = "desktop-shims")]
    rest_backend: Option<(String, String)>,
}

impl CoreConfigBuilder {
    pub fn record_store(mut self, store: Arc<dyn MediaRecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    pub fn object_urls(mut self, factory: Arc<dyn ObjectUrlFactory>) -> Self {
        self.object_urls = Some(factory);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Directory for desktop default storage (blob payloads live under `blobs/`).
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn settings(mut self, settings: CoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn resolver_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings.resolver = settings;
        self
    }

    pub fn player_defaults(mut self, defaults: PlayerDefaults) -> Self {
        self.settings.player = defaults;
        self
    }

    /// Replace the settings with ones parsed from a TOML document.
    ///
    /// Missing keys take their defaults.
    pub fn settings_from_toml(mut self, source: &str) -> Result<Self> {
        self.settings = CoreSettings::from_toml(source)?;
        Ok(self)
    }

    /// Use a PostgREST-style backend for record lookups.
    ///
    /// The injected [`HttpClient`] is used when present, otherwise a reqwest
    /// client is created.
    #[cfg(feature = "desktop-shims")]
    pub fn rest_backend(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.rest_backend = Some((base_url.into(), api_key.into()));
        self
    }

    /// Builds the configuration, injecting platform defaults where available.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    /// - [`Error::Config`] when settings are invalid
    pub fn build(self) -> Result<CoreConfig> {
        #[cfg(feature = "desktop-shims")]
        let (record_store, http_client) = match (self.record_store, self.rest_backend) {
            (Some(store), _) => (store, self.http_client),
            (None, Some((base_url, api_key))) => {
                use bridge_desktop::{ReqwestHttpClient, RestMediaStore};

                let client: Arc<dyn HttpClient> = match self.http_client {
                    Some(client) => client,
                    None => Arc::new(ReqwestHttpClient::new()),
                };
                let store: Arc<dyn MediaRecordStore> =
                    Arc::new(RestMediaStore::new(Arc::clone(&client), base_url, api_key));
                (store, Some(client))
            }
            (None, None) => return Err(record_store_missing_error()),
        };

        #[cfg(not(feature = "desktop-shims"))]
        let (record_store, http_client) = (
            self.record_store.ok_or_else(record_store_missing_error)?,
            self.http_client,
        );

        let blob_store = match self.blob_store {
            Some(store) => store,
            None => provide_default_blob_store(self.data_dir.as_ref())?,
        };

        let object_urls = match self.object_urls {
            Some(factory) => factory,
            None => provide_default_object_urls()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            record_store,
            blob_store,
            object_urls,
            clock,
            http_client,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            settings: self.settings,
        };

        config.validate()?;
        Ok(config)
    }
}
