//! # Video URL Resolver
//!
//! Turns location strings into playable URLs and keeps them fresh.
//!
//! ## Overview
//!
//! | Location | Resolution |
//! |----------|------------|
//! | `https://…`, `http://…` | Identity, cached |
//! | `idb://<key>` | Payload read from the [`BlobStore`](bridge_traits::BlobStore), materialized into a local handle, cached; `""` when missing |
//! | `blob:…` (looks live) | Identity, cached and revalidated in the background |
//! | `blob:…` (looks expired) | Awaited record-store lookup; fresher URL or the original |
//! | anything else | Returned unchanged, not cached |
//! | empty | `""` |
//!
//! Cache hits on session-local values return immediately and, once the
//! per-location cooldown has elapsed, start at most one background refresh
//! (stale-while-revalidate). Refreshed URLs are pushed to subscribers and
//! published on the [`EventBus`](core_runtime::events::EventBus).
//!
//! Concurrent resolves that need a lookup share a single in-flight future, so
//! one location is fetched once no matter how many players ask for it.
//!
//! ## Usage
//!
//! ```ignore
//! use core_resolver::{SubscriptionScope, VideoUrlResolver};
//!
//! let resolver = VideoUrlResolver::builder(record_store, blob_store, object_urls)
//!     .event_bus(bus.clone())
//!     .build();
//!
//! let url = resolver.resolve("idb://clip-42").await;
//! let id = resolver.subscribe(SubscriptionScope::All, |n| {
//!     tracing::info!(original = %n.original, "refreshed");
//! });
//! ```

mod cache;
pub mod config;
pub mod error;
pub mod location;
mod refresh;
pub mod resolver;
pub mod stats;
pub mod subscription;

pub use config::ResolverConfig;
pub use core_runtime::events::RefreshSource;
pub use error::{ResolverError, Result};
pub use location::{LocationKind, VideoLocation};
pub use resolver::{VideoUrlResolver, VideoUrlResolverBuilder};
pub use stats::ResolverStats;
pub use subscription::{RefreshNotification, SubscriptionId, SubscriptionScope};
