//! Blob store keeping payloads as files under a data directory.
//!
//! Each key maps to `<root>/<encoded key>.bin` plus a small JSON sidecar
//! (`.meta.json`) carrying the content type. Keys are percent-encoded so any
//! string is a valid key on every platform.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{BlobStore, StoredBlob},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR: &str = "vidshelf";

#[derive(Debug, Default, Serialize, Deserialize)]
struct BlobMeta {
    #[serde(default)]
    mime_type: Option<String>,
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform data directory (`~/.local/share/vidshelf/blobs`
    /// on Linux).
    pub fn in_default_location() -> io::Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no platform data directory")
        })?;
        Ok(Self::new(data_dir.join(APP_DIR).join("blobs")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.bin", encode_key(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.meta.json", encode_key(key)))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BridgeError::Io(e)),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        let data = match fs::read(self.payload_path(key)).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        let meta = match fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice::<BlobMeta>(&raw).map_err(|e| {
                BridgeError::BlobError(format!("Corrupt metadata for '{}': {}", key, e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BlobMeta::default(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(key, size = data.len(), "Read stored blob");
        Ok(Some(StoredBlob {
            data,
            mime_type: meta.mime_type,
        }))
    }

    async fn put(&self, key: &str, blob: StoredBlob) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        // Write to a temp name first so readers never see a partial payload.
        let payload = self.payload_path(key);
        let staging = payload.with_extension("bin.partial");
        fs::write(&staging, &blob.data).await?;
        fs::rename(&staging, &payload).await?;

        let meta = BlobMeta {
            mime_type: blob.mime_type,
        };
        let raw = serde_json::to_vec(&meta)
            .map_err(|e| BridgeError::BlobError(format!("Failed to encode metadata: {}", e)))?;
        fs::write(self.meta_path(key), raw).await?;

        debug!(key, size = blob.data.len(), "Stored blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        remove_if_present(&self.payload_path(key)).await?;
        remove_if_present(&self.meta_path(key)).await?;
        debug!(key, "Deleted stored blob");
        Ok(())
    }
}
