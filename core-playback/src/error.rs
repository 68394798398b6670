//! # Playback Error Types
//!
//! Two layers:
//! - [`PlaybackFailure`]: a categorized, user-facing failure carried by the
//!   errored state. It never propagates as a Rust error; hosts render it next to
//!   a retry control.
//! - [`PlaybackError`]: misuse of the orchestrator API (retrying while not
//!   errored, invalid configuration, rejected element calls).

use bridge_traits::{BridgeError, MediaErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::state::PlaybackState;

// ============================================================================
// User-facing failures
// ============================================================================

/// Category of a playback failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Container or codec not supported by the element.
    Format,
    /// Network error while fetching media data.
    Network,
    /// Media data could not be decoded.
    Decode,
    /// The bound source is invalid or could not be opened.
    Source,
    /// Streaming (ranged/segmented fetch) failed mid-playback.
    Streaming,
    /// Fetching was aborted.
    Aborted,
    /// A session-local link no longer resolves.
    ExpiredLink,
    /// The location could not be resolved to a playable URL.
    Resolution,
}

impl FailureKind {
    /// Failures caused by the network path rather than the media itself.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            FailureKind::Network | FailureKind::Streaming | FailureKind::ExpiredLink
        )
    }

    /// Classify a native media error.
    ///
    /// The numeric code decides first; the free-form message refines codes
    /// that browsers overload (`SRC_NOT_SUPPORTED` covers both unsupported
    /// formats and unreachable sources). Failures of session-local sources
    /// that look like fetch failures are reported as expired links.
    pub fn classify(code: MediaErrorCode, message: Option<&str>, session_local: bool) -> Self {
        let message = message.map(str::to_ascii_lowercase).unwrap_or_default();
        let mentions = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

        match code {
            MediaErrorCode::Aborted => FailureKind::Aborted,
            MediaErrorCode::Decode => FailureKind::Decode,
            MediaErrorCode::Network if session_local => FailureKind::ExpiredLink,
            MediaErrorCode::Network if mentions(&["stream", "range", "segment"]) => {
                FailureKind::Streaming
            }
            MediaErrorCode::Network => FailureKind::Network,
            MediaErrorCode::SourceNotSupported if mentions(&["format", "codec", "mime"]) => {
                FailureKind::Format
            }
            MediaErrorCode::SourceNotSupported if session_local => FailureKind::ExpiredLink,
            MediaErrorCode::SourceNotSupported => FailureKind::Source,
            MediaErrorCode::Unknown(_) => {
                if mentions(&["stream"]) {
                    FailureKind::Streaming
                } else if mentions(&["network", "fetch"]) {
                    FailureKind::Network
                } else if mentions(&["decode"]) {
                    FailureKind::Decode
                } else if mentions(&["format", "codec"]) {
                    FailureKind::Format
                } else {
                    FailureKind::Source
                }
            }
        }
    }

    /// Human-readable message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::Format => "This video format is not supported on this device.",
            FailureKind::Network => "A network error interrupted the video download.",
            FailureKind::Decode => "The video could not be decoded.",
            FailureKind::Source => "The video source is invalid or unavailable.",
            FailureKind::Streaming => "Video streaming was interrupted.",
            FailureKind::Aborted => "Video loading was aborted.",
            FailureKind::ExpiredLink => "This temporary video link has expired.",
            FailureKind::Resolution => "The video could not be found.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Format => "format",
            FailureKind::Network => "network",
            FailureKind::Decode => "decode",
            FailureKind::Source => "source",
            FailureKind::Streaming => "streaming",
            FailureKind::Aborted => "aborted",
            FailureKind::ExpiredLink => "expired_link",
            FailureKind::Resolution => "resolution",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details exposed while a player is errored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub kind: FailureKind,
    /// User-facing message.
    pub message: String,
    /// Technical detail (native error code and message, location).
    pub detail: Option<String>,
}

impl PlaybackFailure {
    pub fn new(kind: FailureKind, detail: Option<String>) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            detail,
        }
    }

    /// Failure reported by the native element.
    pub fn from_media_error(
        code: MediaErrorCode,
        message: Option<&str>,
        session_local: bool,
    ) -> Self {
        let kind = FailureKind::classify(code, message, session_local);
        let detail = match message {
            Some(message) if !message.is_empty() => format!("{}: {}", code, message),
            _ => code.to_string(),
        };
        Self::new(kind, Some(detail))
    }

    /// The resolver produced no playable URL for `location`.
    pub fn resolution(location: &str) -> Self {
        Self::new(
            FailureKind::Resolution,
            Some(format!("no playable URL for {}", location)),
        )
    }
}

impl fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}

// ============================================================================
// API errors
// ============================================================================

/// Errors returned by orchestrator operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// `retry` called while the player is not errored.
    #[error("Retry is only available from the errored state (current: {0})")]
    NotErrored(PlaybackState),

    /// The player has been unmounted.
    #[error("Player has been unmounted")]
    Unmounted,

    /// Player configuration is invalid.
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    /// The element refused to start playback (autoplay policy, detached element).
    #[error("Play request rejected: {0}")]
    PlayRejected(String),

    /// Host bridge error.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if the operation can succeed when attempted again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::PlayRejected(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
