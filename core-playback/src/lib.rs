//! # Playback Orchestration
//!
//! Per-element state machine that decides when a video location is resolved,
//! binds the resolved URL to a host media element and keeps play/pause in
//! line with hover, visibility, tap and parent play signals.
//!
//! ## Overview
//!
//! - [`PlaybackOrchestrator`]: the state machine, one per media element
//! - [`PlayerConfig`]: load strategy, hover/visibility behavior, poster
//! - [`PlayerSnapshot`]: render-ready view published through a watch channel
//! - [`PlaybackFailure`]: categorized, user-facing failure with retry
//!
//! Resolution goes through a shared
//! [`VideoUrlResolver`](core_resolver::VideoUrlResolver); retry uses its
//! forced-refresh path.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use config::{LoadStrategy, PlayerConfig};
pub use error::{FailureKind, PlaybackError, PlaybackFailure, Result};
pub use orchestrator::{PlaybackOrchestrator, PlaybackOrchestratorBuilder, ReadyCallback};
pub use state::{PlaybackState, PlayerSnapshot, Trigger};
