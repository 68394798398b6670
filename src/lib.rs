//! Umbrella crate for the vidshelf video core.
//!
//! Hosts depend on `vidshelf-workspace` and pick a feature instead of wiring
//! the individual crates:
//!
//! - `desktop-shims` (default): [`service`] with the desktop bridges
//! - `playback`: [`service`] plus direct access to [`playback`]
//! - `resolver-only`: just the URL [`resolver`], for hosts that drive their
//!   own media elements

#[cfg(any(feature = "desktop-shims", feature = "playback"))]
pub use core_service as service;

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "resolver-only")]
pub use core_resolver as resolver;
