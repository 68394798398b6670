//! Playback states and the observable player snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlaybackFailure;

/// Lifecycle of one bound media element.
///
/// ```text
/// idle ─▶ resolving ─▶ loading ─▶ ready ─▶ playing ⇄ paused
///   any ─▶ errored ─(retry)─▶ resolving
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Resolving,
    Loading,
    Ready,
    Playing,
    Paused,
    Errored,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Resolving => "resolving",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Errored => "errored",
        }
    }

    /// A source is bound and buffered enough to play.
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused
        )
    }

    /// Waiting on the resolver or the element; hosts show a spinner.
    pub fn is_loading(&self) -> bool {
        matches!(self, PlaybackState::Resolving | PlaybackState::Loading)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What triggered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Immediate,
    Hover,
    Visibility,
    Tap,
    ShouldPlay,
    Retry,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Immediate => "immediate",
            Trigger::Hover => "hover",
            Trigger::Visibility => "visibility",
            Trigger::Tap => "tap",
            Trigger::ShouldPlay => "should_play",
            Trigger::Retry => "retry",
        };
        f.write_str(name)
    }
}

/// Render-ready view of a player, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    /// URL currently bound to the element.
    pub source: Option<String>,
    /// Present while errored.
    pub failure: Option<PlaybackFailure>,
    /// Poster overlay should be shown (fades out once ready).
    pub poster_visible: bool,
    /// Touch hosts: show the tap-to-play control.
    pub tap_to_play: bool,
    pub hovering: bool,
    pub visible: bool,
    pub should_play: bool,
    pub tapped: bool,
    pub unmounted: bool,
}

impl PlayerSnapshot {
    /// Errored players always offer a manual retry.
    pub fn show_retry(&self) -> bool {
        self.state == PlaybackState::Errored
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }
}
