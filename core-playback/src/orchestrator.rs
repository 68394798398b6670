//! # Playback Orchestrator
//!
//! One orchestrator drives one host media element. Host signals (hover,
//! viewport visibility, taps, a parent's play request, native element events)
//! are fed in through plain method calls; the orchestrator decides when to
//! resolve the location, binds the resolved URL and keeps play/pause in line
//! with the current intent.
//!
//! ## Intent
//!
//! Play/pause is never toggled incrementally. Every signal updates a flag and
//! the desired state is re-derived from all flags:
//!
//! - pointer hosts: `hovering && play_on_hover`, `visible && play_when_visible`
//! - touch hosts: taps, and visibility when `play_on_hover` or `play_when_visible`
//! - any host: `should_play`, `attributes.autoplay`
//!
//! ## Timers
//!
//! Hover and visibility signals are debounced independently through a keyed
//! [`Debouncer`]; unmounting cancels both. Resolutions already in flight are
//! not cancelled, their result is discarded instead.

use bridge_traits::{MediaElement, MediaEvent};
use core_async::debounce::Debouncer;
use core_async::task;
use core_resolver::location::is_session_local_url;
use core_resolver::{RefreshNotification, SubscriptionId, SubscriptionScope, VideoUrlResolver};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::strip_query;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{LoadStrategy, PlayerConfig};
use crate::error::{PlaybackError, PlaybackFailure, Result};
use crate::state::{PlaybackState, PlayerSnapshot, Trigger};

/// Invoked with the bound URL once the element has buffered enough to play.
pub type ReadyCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKey {
    Hover,
    Visibility,
}

/// Element call decided under the state lock and performed after it.
#[derive(Debug, Clone, Copy)]
enum PlaybackAction {
    Play,
    Pause,
}

enum Binding {
    Load(String),
    Failed(PlaybackFailure),
    Discard,
}

#[derive(Debug, Default)]
struct Machine {
    state: PlaybackState,
    source: Option<String>,
    failure: Option<PlaybackFailure>,
    hovering: bool,
    visible: bool,
    should_play: bool,
    tapped: bool,
    user_paused: bool,
    poster_visible: bool,
    unmounted: bool,
    /// Bumped for every resolution; stale results compare unequal.
    epoch: u64,
}

impl Machine {
    fn wants_playback(&self, config: &PlayerConfig) -> bool {
        if self.user_paused {
            return false;
        }
        let visible_intent = self.visible
            && (config.play_when_visible || (config.touch_device && config.play_on_hover));
        let hover_intent = !config.touch_device && self.hovering && config.play_on_hover;

        self.should_play
            || self.tapped
            || config.attributes.autoplay
            || visible_intent
            || hover_intent
    }

    fn snapshot(&self, config: &PlayerConfig) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state,
            source: self.source.clone(),
            failure: self.failure.clone(),
            poster_visible: self.poster_visible,
            tap_to_play: config.touch_device
                && !self.unmounted
                && !matches!(self.state, PlaybackState::Playing | PlaybackState::Errored),
            hovering: self.hovering,
            visible: self.visible,
            should_play: self.should_play,
            tapped: self.tapped,
            unmounted: self.unmounted,
        }
    }
}

struct Inner {
    id: String,
    config: PlayerConfig,
    resolver: VideoUrlResolver,
    element: Arc<dyn MediaElement>,
    event_bus: Option<EventBus>,
    on_ready: Option<ReadyCallback>,
    machine: Mutex<Machine>,
    snapshots: watch::Sender<PlayerSnapshot>,
    timers: Debouncer<TimerKey>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Inner {
    /// Apply `f` to the state machine, publish the new snapshot and report a
    /// state change.
    fn update<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        let mut machine = self.machine.lock();
        let from = machine.state;
        let result = f(&mut machine);
        let to = machine.state;
        let snapshot = machine.snapshot(&self.config);
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        drop(machine);

        if from != to {
            debug!(player_id = %self.id, from = %from, to = %to, "Playback state changed");
            self.emit(PlaybackEvent::StateChanged {
                player_id: self.id.clone(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        result
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }

    fn state(&self) -> PlaybackState {
        self.machine.lock().state
    }

    fn is_unmounted(&self) -> bool {
        self.machine.lock().unmounted
    }

    /// Move to `resolving` if `trigger` may start a resolution now.
    fn begin_resolution(&self, trigger: Trigger) -> Option<u64> {
        self.update(|m| {
            if m.unmounted {
                return None;
            }
            let allowed = match trigger {
                Trigger::Retry => m.state == PlaybackState::Errored,
                _ => m.state == PlaybackState::Idle,
            };
            if !allowed {
                return None;
            }
            m.state = PlaybackState::Resolving;
            m.failure = None;
            m.source = None;
            m.epoch += 1;
            Some(m.epoch)
        })
    }

    #[instrument(skip_all, fields(player_id = %self.id, trigger = %trigger))]
    async fn load(&self, trigger: Trigger) {
        let Some(ticket) = self.begin_resolution(trigger) else {
            trace!("Resolution not started; player is past idle");
            return;
        };

        let location = self.config.location.as_str();
        debug!(location = %strip_query(location), "Resolving video location");
        let url = if trigger == Trigger::Retry {
            self.element.clear_source();
            self.resolver.force_refresh(location).await
        } else {
            self.resolver.resolve(location).await
        };

        let binding = self.update(|m| {
            if m.unmounted || m.epoch != ticket || m.state != PlaybackState::Resolving {
                return Binding::Discard;
            }
            if url.is_empty() {
                let failure = PlaybackFailure::resolution(location);
                m.state = PlaybackState::Errored;
                m.failure = Some(failure.clone());
                m.poster_visible = self.config.poster.is_some();
                return Binding::Failed(failure);
            }
            m.state = PlaybackState::Loading;
            m.source = Some(url.clone());
            Binding::Load(url.clone())
        });

        match binding {
            Binding::Load(url) => {
                self.element.set_source(&url);
                self.element.load();
            }
            Binding::Failed(failure) => self.report_failure(&failure),
            Binding::Discard => debug!("Discarding resolution result for a stale or unmounted player"),
        }
    }

    fn fail(&self, failure: PlaybackFailure) {
        let failed = self.update(|m| {
            if m.unmounted {
                return false;
            }
            m.state = PlaybackState::Errored;
            m.failure = Some(failure.clone());
            m.poster_visible = self.config.poster.is_some();
            true
        });
        if failed {
            self.report_failure(&failure);
        }
    }

    fn report_failure(&self, failure: &PlaybackFailure) {
        warn!(player_id = %self.id, kind = %failure.kind, "{}", failure);
        self.emit(PlaybackEvent::Errored {
            player_id: self.id.clone(),
            kind: failure.kind.to_string(),
            message: failure.to_string(),
        });
    }

    /// Re-derive play/pause from the current intent flags.
    fn sync_playback(&self) {
        let action = self.update(|m| {
            if m.unmounted {
                return None;
            }
            let wants = m.wants_playback(&self.config);
            match m.state {
                PlaybackState::Ready | PlaybackState::Paused if wants => Some(PlaybackAction::Play),
                PlaybackState::Playing if !wants => {
                    m.state = PlaybackState::Paused;
                    Some(PlaybackAction::Pause)
                }
                _ => None,
            }
        });

        match action {
            Some(PlaybackAction::Play) => match self.element.play() {
                Ok(()) => self.update(|m| {
                    if matches!(m.state, PlaybackState::Ready | PlaybackState::Paused) {
                        m.state = PlaybackState::Playing;
                        m.poster_visible = false;
                    }
                }),
                Err(err) => {
                    warn!(player_id = %self.id, error = %err, "Element rejected play request");
                    self.emit(PlaybackEvent::PlayRejected {
                        player_id: self.id.clone(),
                        reason: err.to_string(),
                    });
                }
            },
            Some(PlaybackAction::Pause) => self.element.pause(),
            None => {}
        }
    }

    async fn hover_settled(&self) {
        if !self.machine.lock().hovering {
            return;
        }
        self.load(Trigger::Hover).await;
        self.sync_playback();
    }

    async fn visibility_settled(&self, visible: bool) {
        let applied = self.update(|m| {
            if m.unmounted {
                return false;
            }
            if visible && !m.visible {
                m.user_paused = false;
            }
            m.visible = visible;
            true
        });
        if !applied {
            return;
        }
        if visible && self.config.loads_on_visibility() {
            self.load(Trigger::Visibility).await;
        }
        self.sync_playback();
    }

    async fn interaction(&self, trigger: Trigger) {
        self.load(trigger).await;
        self.sync_playback();
    }

    fn on_loaded_data(&self) {
        let ready = self.update(|m| {
            if m.unmounted || m.state != PlaybackState::Loading {
                return None;
            }
            m.state = PlaybackState::Ready;
            if !self.config.touch_device {
                m.poster_visible = false;
            }
            m.source.clone()
        });

        if let Some(source) = ready {
            if let Some(on_ready) = &self.on_ready {
                on_ready(&source);
            }
            self.sync_playback();
        }
    }

    /// A background refresh produced a fresher URL for our location.
    fn rebind(&self, notification: &RefreshNotification) {
        let rebound = self.update(|m| {
            if m.unmounted || m.state != PlaybackState::Loading {
                return false;
            }
            m.source = Some(notification.refreshed.clone());
            true
        });
        if rebound {
            info!(
                player_id = %self.id,
                source = %notification.source,
                "Rebinding element to refreshed URL"
            );
            self.element.set_source(&notification.refreshed);
            self.element.load();
        }
    }
}

/// Drives one media element through the playback state machine.
///
/// Cheap to clone; clones control the same player. Trigger methods spawn
/// work on the current Tokio runtime and must be called from within one.
#[derive(Clone)]
pub struct PlaybackOrchestrator {
    inner: Arc<Inner>,
}

/// Builder for [`PlaybackOrchestrator`].
pub struct PlaybackOrchestratorBuilder {
    resolver: VideoUrlResolver,
    element: Arc<dyn MediaElement>,
    config: PlayerConfig,
    player_id: Option<String>,
    event_bus: Option<EventBus>,
    on_ready: Option<ReadyCallback>,
}

impl PlaybackOrchestratorBuilder {
    /// Identifier used in logs and events (default: random UUID).
    pub fn player_id(mut self, id: impl Into<String>) -> Self {
        self.player_id = Some(id.into());
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<PlaybackOrchestrator> {
        self.config.validate()?;

        let machine = Machine {
            poster_visible: self.config.poster.is_some(),
            ..Machine::default()
        };
        let (snapshots, _) = watch::channel(machine.snapshot(&self.config));

        Ok(PlaybackOrchestrator {
            inner: Arc::new(Inner {
                id: self
                    .player_id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                timers: Debouncer::new(self.config.visibility_debounce),
                config: self.config,
                resolver: self.resolver,
                element: self.element,
                event_bus: self.event_bus,
                on_ready: self.on_ready,
                machine: Mutex::new(machine),
                snapshots,
                subscription: Mutex::new(None),
            }),
        })
    }
}

impl PlaybackOrchestrator {
    pub fn builder(
        resolver: VideoUrlResolver,
        element: Arc<dyn MediaElement>,
        config: PlayerConfig,
    ) -> PlaybackOrchestratorBuilder {
        PlaybackOrchestratorBuilder {
            resolver,
            element,
            config,
            player_id: None,
            event_bus: None,
            on_ready: None,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<PlayerSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Bind attributes and poster, listen for refreshed URLs and start an
    /// immediate load when configured.
    pub fn mount(&self) {
        let inner = &self.inner;
        inner.element.apply_attributes(&inner.config.attributes);
        inner.element.set_poster(inner.config.poster.as_deref());

        let weak: Weak<Inner> = Arc::downgrade(inner);
        let id = inner.resolver.subscribe(
            SubscriptionScope::location(inner.config.location.clone()),
            move |notification| {
                if let Some(inner) = weak.upgrade() {
                    inner.rebind(notification);
                }
            },
        );
        if let Some(previous) = inner.subscription.lock().replace(id) {
            inner.resolver.unsubscribe(previous);
        }

        if inner.config.load == LoadStrategy::Immediate {
            self.spawn_interaction(Trigger::Immediate);
        }
    }

    /// Pointer entered the element.
    pub fn hover_start(&self) {
        let inner = &self.inner;
        if inner.config.touch_device {
            trace!(player_id = %inner.id, "Ignoring hover on touch device");
            return;
        }
        let hovering = inner.update(|m| {
            if m.unmounted {
                return false;
            }
            m.hovering = true;
            m.user_paused = false;
            true
        });
        if !hovering || !inner.config.play_on_hover {
            return;
        }

        let weak = Arc::downgrade(inner);
        inner
            .timers
            .schedule_after(TimerKey::Hover, inner.config.hover_delay, async move {
                if let Some(inner) = weak.upgrade() {
                    inner.hover_settled().await;
                }
            });
    }

    /// Pointer left the element. Pauses hover playback and, outside preview
    /// mode, seeks back to the start.
    pub fn hover_end(&self) {
        let inner = &self.inner;
        inner.timers.cancel(&TimerKey::Hover);
        let changed = inner.update(|m| {
            let changed = m.hovering && !m.unmounted;
            m.hovering = false;
            changed
        });
        if !changed {
            return;
        }
        inner.sync_playback();
        // Rewinds even when the element had already paused on its own.
        let rewind = !inner.config.preview_mode
            && matches!(inner.state(), PlaybackState::Playing | PlaybackState::Paused);
        if rewind {
            inner.element.seek(Duration::ZERO);
        }
    }

    /// Viewport visibility changed. Applied after the visibility debounce;
    /// only the last change inside the window counts.
    pub fn set_visible(&self, visible: bool) {
        let inner = &self.inner;
        if inner.is_unmounted() {
            return;
        }
        let weak = Arc::downgrade(inner);
        inner.timers.schedule(TimerKey::Visibility, async move {
            if let Some(inner) = weak.upgrade() {
                inner.visibility_settled(visible).await;
            }
        });
    }

    /// Tap or click on the element: toggles playback, loading first if needed.
    pub fn tap(&self) {
        let start = self.inner.update(|m| {
            if m.unmounted {
                return None;
            }
            if m.state == PlaybackState::Playing {
                m.tapped = false;
                m.user_paused = true;
                Some(false)
            } else {
                m.tapped = true;
                m.user_paused = false;
                Some(true)
            }
        });
        match start {
            Some(true) => self.spawn_interaction(Trigger::Tap),
            Some(false) => {
                self.inner.sync_playback();
            }
            None => {}
        }
    }

    /// Parent-driven play request (synchronized gallery autoplay).
    pub fn set_should_play(&self, should_play: bool) {
        let applied = self.inner.update(|m| {
            if m.unmounted {
                return false;
            }
            if should_play && !m.should_play {
                m.user_paused = false;
            }
            m.should_play = should_play;
            true
        });
        if !applied {
            return;
        }
        if should_play {
            self.spawn_interaction(Trigger::ShouldPlay);
        } else {
            self.inner.sync_playback();
        }
    }

    /// Feed an event reported by the native element.
    pub fn handle_media_event(&self, event: MediaEvent) {
        let inner = &self.inner;
        match event {
            MediaEvent::LoadStart => trace!(player_id = %inner.id, "Element load started"),
            MediaEvent::LoadedData => inner.on_loaded_data(),
            MediaEvent::Play => inner.update(|m| {
                if !m.unmounted
                    && matches!(m.state, PlaybackState::Ready | PlaybackState::Paused)
                {
                    m.state = PlaybackState::Playing;
                    m.poster_visible = false;
                }
            }),
            MediaEvent::Pause => inner.update(|m| {
                if !m.unmounted && m.state == PlaybackState::Playing {
                    m.state = PlaybackState::Paused;
                }
            }),
            MediaEvent::Error { code, message } => {
                let session_local = inner
                    .machine
                    .lock()
                    .source
                    .as_deref()
                    .is_some_and(is_session_local_url);
                inner.fail(PlaybackFailure::from_media_error(
                    code,
                    message.as_deref(),
                    session_local,
                ));
            }
        }
    }

    /// Leave the errored state: clear the failure, force-refresh the location
    /// and bind the result.
    pub async fn retry(&self) -> Result<()> {
        let inner = &self.inner;
        let state = {
            let machine = inner.machine.lock();
            if machine.unmounted {
                return Err(PlaybackError::Unmounted);
            }
            machine.state
        };
        if state != PlaybackState::Errored {
            return Err(PlaybackError::NotErrored(state));
        }

        info!(player_id = %inner.id, "Retrying playback");
        inner.emit(PlaybackEvent::RetryRequested {
            player_id: inner.id.clone(),
        });
        inner.load(Trigger::Retry).await;
        inner.sync_playback();
        Ok(())
    }

    /// Detach from the element. Pending timers are cancelled and results of
    /// in-flight resolutions are discarded.
    pub fn unmount(&self) {
        let inner = &self.inner;
        let first = inner.update(|m| !std::mem::replace(&mut m.unmounted, true));
        if !first {
            return;
        }

        inner.timers.cancel_all();
        if let Some(id) = inner.subscription.lock().take() {
            inner.resolver.unsubscribe(id);
        }
        inner.element.pause();
        inner.element.clear_source();
        if inner.config.release_local_on_unmount {
            inner.resolver.release(&inner.config.location);
        }
        debug!(player_id = %inner.id, "Player unmounted");
    }

    fn spawn_interaction(&self, trigger: Trigger) {
        let inner = Arc::clone(&self.inner);
        task::spawn(async move {
            inner.interaction(trigger).await;
        });
    }
}

impl fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("player_id", &self.inner.id)
            .field("location", &strip_query(&self.inner.config.location))
            .field("state", &self.state())
            .finish()
    }
}
