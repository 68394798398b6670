//! Local Blob Storage Abstractions
//!
//! Two capabilities the resolver needs to turn an `idb://<key>` location into
//! something a media element can play:
//! - [`BlobStore`]: keyed lookup of binary video payloads
//!   (IndexedDB on the web, a data directory on desktop)
//! - [`ObjectUrlFactory`]: materialize a payload as a playable local handle and
//!   release it again (`URL.createObjectURL` / `revokeObjectURL` on the web,
//!   temp files on desktop)

use bytes::Bytes;

use crate::{error::Result, platform::PlatformSendSync};

/// Keyed binary payload storage.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::BlobStore;
///
/// async fn has_payload(store: &dyn BlobStore, key: &str) -> bool {
///     matches!(store.get(key).await, Ok(Some(_)))
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait BlobStore: PlatformSendSync {
    /// Read the payload stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored under the key.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>>;

    /// Store a payload under `key`, replacing any previous value.
    async fn put(&self, key: &str, blob: StoredBlob) -> Result<()>;

    /// Remove the payload stored under `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// A stored payload plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub mime_type: Option<String>,
}

impl StoredBlob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Creates and releases local playable handles for in-memory payloads.
///
/// Every URL returned by [`create`](ObjectUrlFactory::create) must be passed
/// to [`release`](ObjectUrlFactory::release) exactly once; the resolver tracks
/// ownership so callers never release a handle themselves.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ObjectUrlFactory: PlatformSendSync {
    /// Materialize `blob` and return a URL usable as a media source.
    ///
    /// May write the whole payload somewhere, so implementations must not
    /// block the calling task.
    async fn create(&self, blob: &StoredBlob, fallback_mime: &str) -> Result<String>;

    /// Release a URL previously returned by `create`.
    fn release(&self, url: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_blob_builder() {
        let blob = StoredBlob::new(vec![0u8; 16]).with_mime_type("video/webm");
        assert_eq!(blob.len(), 16);
        assert!(!blob.is_empty());
        assert_eq!(blob.mime_type.as_deref(), Some("video/webm"));
    }

    #[test]
    fn test_empty_blob() {
        let blob = StoredBlob::new(Bytes::new());
        assert!(blob.is_empty());
        assert!(blob.mime_type.is_none());
    }
}
