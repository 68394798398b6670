//! Object URL factory writing payloads to temp files.
//!
//! Desktop media backends cannot play in-memory buffers directly, so each
//! materialized payload becomes a uniquely named file and a `file://` URL.
//! Releasing the URL deletes the file; anything still live is removed when
//! the factory is dropped.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{ObjectUrlFactory, StoredBlob},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const TEMP_DIR_NAME: &str = "vidshelf-media";

pub struct TempFileObjectUrls {
    dir: PathBuf,
    live: Mutex<HashMap<String, PathBuf>>,
}

impl TempFileObjectUrls {
    /// Use (and create) `dir` for materialized files.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            live: Mutex::new(HashMap::new()),
        })
    }

    /// Use a directory under the system temp dir.
    pub fn in_temp_dir() -> io::Result<Self> {
        Self::new(std::env::temp_dir().join(TEMP_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of URLs created and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    fn file_url(path: &Path) -> String {
        let path = path.to_string_lossy().replace('\\', "/");
        if path.starts_with('/') {
            format!("file://{}", path)
        } else {
            format!("file:///{}", path)
        }
    }
}

fn extension_for(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/ogg" => "ogv",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

#[async_trait]
impl ObjectUrlFactory for TempFileObjectUrls {
    async fn create(&self, blob: &StoredBlob, fallback_mime: &str) -> Result<String> {
        let mime = blob
            .mime_type
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback_mime);
        let path = self
            .dir
            .join(format!("{}.{}", Uuid::new_v4(), extension_for(mime)));

        tokio::fs::write(&path, &blob.data).await.map_err(|e| {
            BridgeError::BlobError(format!("Failed to materialize payload: {}", e))
        })?;

        let url = Self::file_url(&path);
        debug!(url = %url, size = blob.len(), mime, "Materialized payload");
        self.live.lock().insert(url.clone(), path);
        Ok(url)
    }

    fn release(&self, url: &str) {
        let Some(path) = self.live.lock().remove(url) else {
            debug!(url, "Ignoring release of unknown URL");
            return;
        };
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(url, error = %e, "Failed to remove materialized file");
            }
        }
    }
}

impl Drop for TempFileObjectUrls {
    fn drop(&mut self) {
        for (_, path) in self.live.get_mut().drain() {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("video/webm; codecs=vp9"), "webm");
        assert_eq!(extension_for("VIDEO/QUICKTIME"), "mov");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn test_create_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let factory = TempFileObjectUrls::new(dir.path().join("media")).unwrap();

        let blob = StoredBlob::new(vec![7u8; 10]).with_mime_type("video/webm");
        let url = factory.create(&blob, "video/mp4").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(".webm"));
        assert_eq!(factory.live_count(), 1);

        let path = factory.live.lock().get(&url).cloned().unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 10]);

        factory.release(&url);
        assert!(!path.exists());
        assert_eq!(factory.live_count(), 0);

        // Unknown and repeated releases are ignored.
        factory.release(&url);
        factory.release("file:///elsewhere.mp4");
    }

    #[tokio::test]
    async fn test_fallback_mime_and_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let factory = TempFileObjectUrls::new(dir.path()).unwrap();

        let blob = StoredBlob::new(vec![0u8; 4]);
        let a = factory.create(&blob, "video/mp4").await.unwrap();
        let b = factory.create(&blob, "video/mp4").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_drop_removes_live_files() {
        let dir = tempfile::tempdir().unwrap();
        let factory = TempFileObjectUrls::new(dir.path()).unwrap();
        let url = factory
            .create(&StoredBlob::new(vec![1u8]), "video/mp4")
            .await
            .unwrap();
        let path = factory.live.lock().get(&url).cloned().unwrap();

        drop(factory);
        assert!(!path.exists());
    }
}
