//! Core service façade and bootstrap helpers.
//!
//! [`VideoCore`] is the composition root: it owns the process-wide
//! [`VideoUrlResolver`], the [`EventBus`] and the player defaults, and hands
//! out one [`PlaybackOrchestrator`] per host media element. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`]; other hosts inject their
//! own bridges through [`CoreConfig::builder`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::MediaElement;
use core_playback::{PlaybackOrchestrator, PlayerConfig};
use core_resolver::{ResolverConfig, VideoUrlResolver};
use core_runtime::config::{CoreConfig, CoreSettings};
use core_runtime::events::{EventBus, EventStream};
use tracing::info;

pub use core_runtime::config::CoreConfigBuilder;

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share the resolver cache and event bus.
#[derive(Clone)]
pub struct VideoCore {
    config: Arc<CoreConfig>,
    resolver: VideoUrlResolver,
    event_bus: EventBus,
}

impl VideoCore {
    /// Create the core from a built configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let resolver = VideoUrlResolver::builder(
            Arc::clone(&config.record_store),
            Arc::clone(&config.blob_store),
            Arc::clone(&config.object_urls),
        )
        .config(ResolverConfig::from(&config.settings.resolver))
        .clock(Arc::clone(&config.clock))
        .event_bus(event_bus.clone())
        .build();

        info!(
            max_entries = config.settings.resolver.max_entries,
            refresh_cooldown_ms = config.settings.resolver.refresh_cooldown_ms,
            "Video core initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            resolver,
            event_bus,
        })
    }

    /// Build the configuration from `builder` and create the core.
    pub fn bootstrap(builder: CoreConfigBuilder) -> Result<Self> {
        Self::new(builder.build()?)
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.config.settings
    }

    pub fn resolver(&self) -> &VideoUrlResolver {
        &self.resolver
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Stream of every core event (resolver and playback).
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub async fn resolve(&self, location: &str) -> String {
        self.resolver.resolve(location).await
    }

    pub async fn force_refresh(&self, location: &str) -> String {
        self.resolver.force_refresh(location).await
    }

    pub fn clear_cache(&self) {
        self.resolver.clear_cache();
    }

    /// Player options for `location` seeded from the configured defaults.
    pub fn player_config(&self, location: impl Into<String>) -> PlayerConfig {
        PlayerConfig::from_defaults(location, &self.config.settings.player)
    }

    /// Create and mount an orchestrator for `element`.
    ///
    /// Must be called from within a Tokio runtime when the player loads
    /// immediately.
    pub fn create_player(
        &self,
        element: Arc<dyn MediaElement>,
        config: PlayerConfig,
    ) -> Result<PlaybackOrchestrator> {
        let player = PlaybackOrchestrator::builder(self.resolver.clone(), element, config)
            .event_bus(self.event_bus.clone())
            .build()?;
        player.mount();
        Ok(player)
    }
}

impl std::fmt::Debug for VideoCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoCore")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts backed by a hosted REST media
/// table.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop("https://project.example", "anon-key")?;
/// let stream = core.events();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
) -> Result<VideoCore> {
    VideoCore::bootstrap(CoreConfig::builder().rest_backend(base_url, api_key))
}
