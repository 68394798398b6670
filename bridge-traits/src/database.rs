//! Media Record Store Abstraction
//!
//! Read-only view of the hosted relational store that backs the gallery. The
//! core only needs two lookups from it:
//! - the record whose stored URL equals a given location, and
//! - the most recently created video record (fallback heuristic).
//!
//! Hosts implement this against their backend-as-a-service (REST, GraphQL,
//! SQL). Desktop builds use `bridge_desktop::RestMediaStore`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::database::MediaRecordStore;
//!
//! async fn fresher_url(store: &dyn MediaRecordStore, stale: &str) -> Option<String> {
//!     let record = store.find_by_url(stale).await.ok()??;
//!     record.playable_url().map(str::to_string)
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSendSync};

/// Kind of asset a media record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Lora,
    Workflow,
    #[serde(other)]
    Other,
}

/// A row from the hosted media table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Primary key
    pub id: String,
    /// URL as originally stored by the uploader (may be a transient handle)
    pub url: String,
    /// Durable object-storage URL, when the upload has been persisted
    #[serde(default)]
    pub storage_url: Option<String>,
    /// Still image shown before playback starts
    #[serde(default)]
    pub placeholder_image: Option<String>,
    /// Asset kind
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Best URL for playback: the durable storage URL when present, otherwise
    /// the stored URL. Returns `None` when both are blank.
    pub fn playable_url(&self) -> Option<&str> {
        self.storage_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or_else(|| Some(self.url.trim()).filter(|url| !url.is_empty()))
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// Read-only media record lookups.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` on native targets so the resolver can
/// call them from background refresh tasks.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaRecordStore: PlatformSendSync {
    /// Find the record whose stored `url` equals `url` exactly.
    async fn find_by_url(&self, url: &str) -> Result<Option<MediaRecord>>;

    /// Most recently created record of kind [`MediaKind::Video`].
    async fn latest_video(&self) -> Result<Option<MediaRecord>>;
}
