//! # Event Bus System
//!
//! Typed, broadcast-based events shared between the resolver, the playback
//! orchestrators, and the host.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │   Resolver   ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│    Host    │
//! ┌──────────────┐     emit      │ (broadcast│                  └────────────┘
//! │ Orchestrator ├──────────────>│  channel) │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, RefreshSource, ResolverEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Resolver(ResolverEvent::UrlRefreshed {
//!     original: "blob:https://app.example/1".to_string(),
//!     refreshed: "https://cdn.example/1.mp4".to_string(),
//!     source: RefreshSource::RecordMatch,
//! }))
//! .ok();
//!
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Resolver(_))));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// URL resolution and cache events
    Resolver(ResolverEvent),
    /// Per-player state machine events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Short human-readable description
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Resolver(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Resolver(ResolverEvent::MaterializeFailed { .. })
            | CoreEvent::Playback(PlaybackEvent::Errored { .. }) => EventSeverity::Error,
            CoreEvent::Resolver(ResolverEvent::RefreshFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Resolver(ResolverEvent::UrlRefreshed {
                source: RefreshSource::LatestVideoFallback,
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::StateChanged { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Severity used by hosts to route events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// How a fresher URL was found during revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshSource {
    /// A record whose stored URL equals the original location
    RecordMatch,
    /// The most recent video record; a heuristic that may pick the wrong asset
    LatestVideoFallback,
}

impl fmt::Display for RefreshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshSource::RecordMatch => write!(f, "record_match"),
            RefreshSource::LatestVideoFallback => write!(f, "latest_video_fallback"),
        }
    }
}

/// Events emitted by the video URL resolver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResolverEvent {
    /// A locally stored payload was materialized into a playable handle
    Materialized { key: String },
    /// A stored key had no payload (or materialization failed)
    MaterializeFailed { key: String, reason: String },
    /// A fresher URL replaced the cached value for `original`
    UrlRefreshed {
        original: String,
        refreshed: String,
        source: RefreshSource,
    },
    /// A revalidation attempt failed or found nothing
    RefreshFailed { location: String, reason: String },
    /// Every entry was dropped and owned handles released
    CacheCleared { released_handles: usize },
}

impl ResolverEvent {
    pub fn description(&self) -> &str {
        match self {
            ResolverEvent::Materialized { .. } => "Local video materialized",
            ResolverEvent::MaterializeFailed { .. } => "Local video missing",
            ResolverEvent::UrlRefreshed { .. } => "Video URL refreshed",
            ResolverEvent::RefreshFailed { .. } => "Video URL refresh failed",
            ResolverEvent::CacheCleared { .. } => "Resolver cache cleared",
        }
    }
}

/// Events emitted by playback orchestrators.
///
/// States are carried as their lowercase names so hosts do not need the
/// playback crate to decode them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The state machine moved between states
    StateChanged {
        player_id: String,
        from: String,
        to: String,
    },
    /// Playback failed and the player entered the errored state
    Errored {
        player_id: String,
        kind: String,
        message: String,
    },
    /// A user-initiated retry started
    RetryRequested { player_id: String },
    /// The platform refused to start playback
    PlayRejected { player_id: String, reason: String },
}

impl PlaybackEvent {
    pub fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Errored { .. } => "Playback error",
            PlaybackEvent::RetryRequested { .. } => "Playback retry requested",
            PlaybackEvent::PlayRejected { .. } => "Play request rejected",
        }
    }

    pub fn player_id(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { player_id, .. }
            | PlaybackEvent::Errored { player_id, .. }
            | PlaybackEvent::RetryRequested { player_id }
            | PlaybackEvent::PlayRejected { player_id, .. } => player_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event; returns the number of subscribers reached.
    ///
    /// Returns an error when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the stream fell behind, `RecvError::Closed`
    /// once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use tokio::sync::broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
