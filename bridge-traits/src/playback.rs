//! Native Media Element Abstraction
//!
//! The playback orchestrator drives a host-owned media element (an HTML
//! `<video>` on the web) through this trait. Element events flow back into the
//! orchestrator as [`MediaEvent`] values forwarded by the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{error::Result, platform::PlatformSendSync};

/// How eagerly the element should fetch media data once a source is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    None,
    #[default]
    Metadata,
    Auto,
}

/// Presentation attributes bound onto the element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttributes {
    pub autoplay: bool,
    pub muted: bool,
    pub looped: bool,
    pub controls: bool,
    pub plays_inline: bool,
    pub preload: Preload,
}

impl Default for MediaAttributes {
    fn default() -> Self {
        Self {
            autoplay: false,
            muted: true,
            looped: true,
            controls: false,
            plays_inline: true,
            preload: Preload::Metadata,
        }
    }
}

/// Error codes reported by native media elements (`MediaError.code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorCode {
    /// Fetching was aborted by the user agent (1)
    Aborted,
    /// A network error interrupted fetching (2)
    Network,
    /// The media could not be decoded (3)
    Decode,
    /// The source is unsupported or could not be loaded (4)
    SourceNotSupported,
    /// Any other code
    Unknown(u16),
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::SourceNotSupported,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Aborted => 1,
            Self::Network => 2,
            Self::Decode => 3,
            Self::SourceNotSupported => 4,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "MEDIA_ERR_ABORTED"),
            Self::Network => write!(f, "MEDIA_ERR_NETWORK"),
            Self::Decode => write!(f, "MEDIA_ERR_DECODE"),
            Self::SourceNotSupported => write!(f, "MEDIA_ERR_SRC_NOT_SUPPORTED"),
            Self::Unknown(code) => write!(f, "MEDIA_ERR_{}", code),
        }
    }
}

/// Events emitted by the native element and forwarded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaEvent {
    /// `loadstart`
    LoadStart,
    /// `loadeddata`: enough data buffered to render the current frame
    LoadedData,
    /// `play`
    Play,
    /// `pause`
    Pause,
    /// `error`
    Error {
        code: MediaErrorCode,
        message: Option<String>,
    },
}

/// Host-owned media element.
///
/// Methods are synchronous: they mirror property writes and method calls on
/// the native element. `play` may be rejected by the platform (autoplay policy,
/// detached element) which is reported as `Err`.
pub trait MediaElement: PlatformSendSync {
    /// Bind `url` as the element's source.
    fn set_source(&self, url: &str);

    /// Detach the current source, stopping any network activity.
    fn clear_source(&self);

    /// Currently bound source, if any.
    fn current_source(&self) -> Option<String>;

    /// Set or clear the poster image.
    fn set_poster(&self, poster: Option<&str>);

    /// Apply presentation attributes.
    fn apply_attributes(&self, attributes: &MediaAttributes);

    /// Begin (re)loading the bound source.
    fn load(&self);

    /// Start playback.
    fn play(&self) -> Result<()>;

    /// Pause playback.
    fn pause(&self);

    /// Seek to `position` from the start of the media.
    fn seek(&self, position: Duration);
}
