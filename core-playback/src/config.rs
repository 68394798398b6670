//! # Player Configuration
//!
//! Per-player options. Workspace-wide defaults come from
//! [`PlayerDefaults`](core_runtime::config::PlayerDefaults).

use bridge_traits::MediaAttributes;
use core_runtime::config::PlayerDefaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

/// When the player starts resolving its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Resolve as soon as the player mounts.
    Immediate,
    /// Resolve when the element scrolls into view.
    #[default]
    Lazy,
    /// Resolve only on hover, tap or a parent play request.
    OnInteraction,
}

fn default_visibility_debounce() -> Duration {
    PlayerDefaults::default().visibility_debounce()
}

fn default_hover_delay() -> Duration {
    PlayerDefaults::default().hover_delay()
}

/// Options for one [`PlaybackOrchestrator`](crate::PlaybackOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Location string handed to the resolver.
    pub location: String,

    /// Still image shown until playback is ready.
    #[serde(default)]
    pub poster: Option<String>,

    #[serde(default)]
    pub load: LoadStrategy,

    /// Pointer devices: play while hovered.
    #[serde(default)]
    pub play_on_hover: bool,

    /// Play whenever the element is in view.
    #[serde(default)]
    pub play_when_visible: bool,

    /// Keep the playback position when hover ends.
    #[serde(default)]
    pub preview_mode: bool,

    /// Touch host: tap-to-play and visibility replace hover.
    #[serde(default)]
    pub touch_device: bool,

    #[serde(default = "default_visibility_debounce")]
    pub visibility_debounce: Duration,

    #[serde(default = "default_hover_delay")]
    pub hover_delay: Duration,

    #[serde(default)]
    pub attributes: MediaAttributes,

    /// Release the resolver's local handle for `location` on unmount.
    #[serde(default)]
    pub release_local_on_unmount: bool,
}

impl PlayerConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self::from_defaults(location, &PlayerDefaults::default())
    }

    /// Build a config seeded from workspace-wide defaults.
    pub fn from_defaults(location: impl Into<String>, defaults: &PlayerDefaults) -> Self {
        Self {
            location: location.into(),
            poster: None,
            load: LoadStrategy::default(),
            play_on_hover: false,
            play_when_visible: false,
            preview_mode: defaults.preview_mode,
            touch_device: defaults.touch_device,
            visibility_debounce: defaults.visibility_debounce(),
            hover_delay: defaults.hover_delay(),
            attributes: MediaAttributes::default(),
            release_local_on_unmount: defaults.release_local_on_unmount,
        }
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn with_load(mut self, load: LoadStrategy) -> Self {
        self.load = load;
        self
    }

    pub fn with_play_on_hover(mut self, enabled: bool) -> Self {
        self.play_on_hover = enabled;
        self
    }

    pub fn with_play_when_visible(mut self, enabled: bool) -> Self {
        self.play_when_visible = enabled;
        self
    }

    pub fn with_preview_mode(mut self, enabled: bool) -> Self {
        self.preview_mode = enabled;
        self
    }

    pub fn with_touch_device(mut self, touch: bool) -> Self {
        self.touch_device = touch;
        self
    }

    pub fn with_visibility_debounce(mut self, debounce: Duration) -> Self {
        self.visibility_debounce = debounce;
        self
    }

    pub fn with_attributes(mut self, attributes: MediaAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_release_on_unmount(mut self, release: bool) -> Self {
        self.release_local_on_unmount = release;
        self
    }

    /// Visibility changes start a resolution.
    pub fn loads_on_visibility(&self) -> bool {
        self.load == LoadStrategy::Lazy
            || self.play_when_visible
            || (self.touch_device && self.play_on_hover)
    }

    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "location cannot be empty".to_string(),
            ));
        }
        if self.visibility_debounce > MAX_DEBOUNCE || self.hover_delay > MAX_DEBOUNCE {
            return Err(PlaybackError::InvalidConfig(
                "debounce delays cannot exceed 10 seconds".to_string(),
            ));
        }
        Ok(())
    }
}
