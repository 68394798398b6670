//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry on 5xx/429
//! - `MediaRecordStore` against a PostgREST-style hosted media table
//! - `BlobStore` keeping payloads as files under the platform data directory
//! - `ObjectUrlFactory` materializing payloads as temp files (`file://` URLs)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsBlobStore, ReqwestHttpClient, RestMediaStore, TempFileObjectUrls};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestHttpClient::new());
//! let records = RestMediaStore::new(http, "https://project.example", "anon-key");
//! let blobs = FsBlobStore::in_default_location()?;
//! let urls = TempFileObjectUrls::in_temp_dir()?;
//! ```

mod blob_store;
mod http;
mod object_urls;
mod rest_store;

pub use blob_store::FsBlobStore;
pub use http::ReqwestHttpClient;
pub use object_urls::TempFileObjectUrls;
pub use rest_store::RestMediaStore;
