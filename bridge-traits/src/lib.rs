//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the video core and the host. Each
//! trait represents a capability the resolver or the playback orchestrator
//! needs but that must be implemented differently per platform (desktop, web).
//!
//! ## Traits
//!
//! ### Storage
//! - [`MediaRecordStore`](database::MediaRecordStore) - Hosted media table lookups
//! - [`BlobStore`](storage::BlobStore) - Keyed local video payloads
//! - [`ObjectUrlFactory`](storage::ObjectUrlFactory) - Create/release local playable handles
//!
//! ### Playback
//! - [`MediaElement`](playback::MediaElement) - Host-owned native media element
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by REST-backed stores
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Web      | host supplied       | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let store = builder.record_store.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "MediaRecordStore".to_string(),
//!     message: "No record store provided. \
//!               Desktop: enable the `desktop-shims` feature. \
//!               Web: inject the host adapter.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with enough context (key, URL,
//! status code) to act on.
//!
//! ## Thread Safety
//!
//! On native targets every trait is `Send + Sync` through
//! [`PlatformSendSync`](platform::PlatformSendSync); on `wasm32` the bound is
//! dropped because browser objects are single-threaded.

pub mod database;
pub mod error;
pub mod http;
pub mod platform;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use database::{MediaKind, MediaRecord, MediaRecordStore};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use platform::PlatformSendSync;
pub use playback::{
    MediaAttributes, MediaElement, MediaErrorCode, MediaEvent, Preload,
};
pub use storage::{BlobStore, ObjectUrlFactory, StoredBlob};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
