//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the video core crates:
//! - Logging and tracing setup
//! - Configuration (bridges plus serializable settings)
//! - Event bus
//!
//! Every other core crate depends on this one for its error conventions,
//! event types, and settings.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
