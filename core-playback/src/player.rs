//! # Player
//!
//! Async driver around [`PlaybackSession`].
//!
//! The session lives behind a mutex that is never held across an `.await`:
//! a play request takes the lock to decide, releases it while the content
//! provider works, and takes it again to apply the result. Whatever happened
//! in between is reconciled by the request token.
//!
//! Two things arrive from outside the caller's operations:
//!
//! - **Ended notifications.** The output reports finished sources on a
//!   channel. They are applied by [`Player::pump_events`], which every public
//!   operation and every progress tick calls first, so the state machine is
//!   never re-entered from an output callback.
//! - **Progress ticks.** While PLAYING the player keeps exactly one frame
//!   requested from the injected [`FrameScheduler`]. Each tick publishes a
//!   `PositionChanged` event, completes the item once the clock passes its
//!   end, and asks for the next frame only if playback is still running;
//!   leaving PLAYING cancels the outstanding frame.
//!
//! Dropping a [`Player::request_play`] future while its content is in
//! flight abandons that request, so the item can be requested again.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{MediaItem, PlayOutcome, Player, PlayerConfig};
//!
//! let player = Player::new(&core_config, PlayerConfig::default())?;
//! let mut events = player.subscribe();
//!
//! let item = MediaItem::generated("station-1", "Morning Jazz", "smooth jazz intro");
//! match player.request_play(&item).await? {
//!     PlayOutcome::Playing => println!("now playing"),
//!     PlayOutcome::Failed(message) => eprintln!("{message}"),
//!     _ => {}
//! }
//! ```

use bridge_traits::{AudioOutput, FrameHandle, FrameScheduler, PlaybackStatus, SourceId};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, Receiver};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, instrument, trace};

use crate::config::PlayerConfig;
use crate::content::ContentResolver;
use crate::controller::GraphController;
use crate::decoder::PcmDecoder;
use crate::error::{PlaybackError, Result};
use crate::session::{Completion, PlaybackSession, RequestDecision};
use crate::track::{MediaItem, PlaybackTrack};

/// Result of [`Player::request_play`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Content was acquired and started, or a finished item was replayed.
    Playing,
    Paused,
    Resumed,
    /// The item's content is already being fetched.
    Ignored,
    /// The request failed; carries the user-facing message.
    Failed(String),
    /// Another request replaced this one while its content was in flight.
    Superseded,
}

/// Playback driver. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    session: Mutex<PlaybackSession>,
    resolver: ContentResolver,
    output: Arc<dyn AudioOutput>,
    scheduler: Arc<dyn FrameScheduler>,
    events: EventBus,
    ended_rx: Mutex<UnboundedReceiver<SourceId>>,
    frame: Mutex<FrameSlot>,
}

/// Outstanding progress frame. `epoch` identifies the request so a callback
/// that raced its own cancellation can tell it is stale.
#[derive(Debug, Default)]
struct FrameSlot {
    handle: Option<FrameHandle>,
    epoch: u64,
}

impl Player {
    /// Build a player from validated bridges.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidConfig`] when `player_config` is out of range.
    pub fn new(config: &CoreConfig, player_config: PlayerConfig) -> Result<Self> {
        Self::with_event_bus(config, player_config, EventBus::new(config.event_buffer_size))
    }

    /// Like [`Player::new`], publishing on an existing bus.
    pub fn with_event_bus(
        config: &CoreConfig,
        player_config: PlayerConfig,
        events: EventBus,
    ) -> Result<Self> {
        player_config.validate()?;

        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let controller = GraphController::new(
            config.audio_output.clone(),
            config.clock.clone(),
            ended_tx,
            player_config.initial_volume,
        );
        let session = PlaybackSession::new(controller, &player_config);

        let mut resolver = ContentResolver::new(
            config.content_provider.clone(),
            PcmDecoder::new(player_config.sample_rate),
            player_config.default_voice.clone(),
        );
        if config.features.enable_uploads {
            match (&config.media_fetcher, &config.media_decoder) {
                (Some(fetcher), Some(decoder)) => {
                    resolver = resolver.with_uploads(fetcher.clone(), decoder.clone());
                }
                _ => {
                    return Err(PlaybackError::InvalidConfig(
                        "uploads enabled without a media fetcher and decoder".to_string(),
                    ))
                }
            }
        }

        info!(
            sample_rate = player_config.sample_rate,
            volume = player_config.initial_volume,
            voice = %player_config.default_voice,
            uploads = resolver.uploads_enabled(),
            "Player initialized"
        );

        Ok(Self {
            inner: Arc::new(PlayerInner {
                session: Mutex::new(session),
                resolver,
                output: config.audio_output.clone(),
                scheduler: config.frame_scheduler.clone(),
                events,
                ended_rx: Mutex::new(ended_rx),
                frame: Mutex::new(FrameSlot::default()),
            }),
        })
    }

    // ========================================================================
    // Playback Control
    // ========================================================================

    /// Play, pause, resume or replay `item` depending on the current state.
    ///
    /// Requesting the item that is playing pauses it; requesting it while
    /// paused resumes it; requesting it while its content is pending does
    /// nothing. Any other item replaces the current one and its content is
    /// fetched. Provider failures are not errors here: they move the player
    /// to ERROR and come back as [`PlayOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// [`PlaybackError::OutputSuspended`] when the output is blocked. Nothing
    /// changes; call [`Player::resume_output`] from a user gesture and retry.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn request_play(&self, item: &MediaItem) -> Result<PlayOutcome> {
        self.inner.pump_events();

        let token = match self.inner.with_session(|s| s.request(item))? {
            RequestDecision::Fetch { token } => token,
            RequestDecision::Ignored => return Ok(PlayOutcome::Ignored),
            RequestDecision::Paused => return Ok(PlayOutcome::Paused),
            RequestDecision::Resumed => return Ok(PlayOutcome::Resumed),
            RequestDecision::Replayed => return Ok(PlayOutcome::Playing),
        };

        let guard = PendingRequest {
            inner: &self.inner,
            token: Some(token),
        };
        let result = self.inner.resolver.resolve(item).await;
        guard.disarm();

        let outcome = match self
            .inner
            .with_session(|s| s.complete_request(token, &item.id, result))
        {
            Completion::Playing => PlayOutcome::Playing,
            Completion::Failed(message) => PlayOutcome::Failed(message),
            Completion::Stale => PlayOutcome::Superseded,
        };
        debug!(token, ?outcome, "Play request finished");
        Ok(outcome)
    }

    /// Pause if playing. Returns whether anything changed.
    pub fn pause(&self) -> bool {
        self.inner.pump_events();
        self.inner.with_session(PlaybackSession::pause)
    }

    /// Resume if paused. Returns whether anything changed.
    pub fn resume(&self) -> Result<bool> {
        self.inner.pump_events();
        self.inner.with_session(PlaybackSession::resume)
    }

    /// Stop playback or abandon a pending request. Never counts as
    /// completion.
    pub fn stop(&self) -> bool {
        self.inner.pump_events();
        self.inner.with_session(PlaybackSession::stop)
    }

    /// Set the session volume (`0.0..=1.0`, clamped). Applies to the live
    /// source immediately.
    pub fn set_volume(&self, level: f32) -> f32 {
        self.inner.pump_events();
        self.inner.with_session(|s| s.set_volume(level))
    }

    /// Mute, or restore the last audible volume.
    pub fn toggle_mute(&self) -> f32 {
        self.inner.pump_events();
        self.inner.with_session(PlaybackSession::toggle_mute)
    }

    /// Resume a suspended output context. Call from a user gesture handler.
    #[instrument(skip(self))]
    pub async fn resume_output(&self) -> Result<()> {
        self.inner.output.resume().await.map_err(PlaybackError::from)?;
        debug!(state = ?self.inner.output.state(), "Output resumed");
        Ok(())
    }

    /// Apply queued ended notifications. Returns how many completed the
    /// current item.
    pub fn pump_events(&self) -> usize {
        self.inner.pump_events()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn status(&self) -> PlaybackStatus {
        self.inner.pump_events();
        self.inner.session.lock().status()
    }

    pub fn current_track(&self) -> Option<PlaybackTrack> {
        self.inner.pump_events();
        self.inner.session.lock().current_track().cloned()
    }

    pub fn current_item_id(&self) -> Option<String> {
        self.inner.pump_events();
        self.inner.session.lock().current_item_id().map(str::to_string)
    }

    /// Seconds into the current track.
    pub fn position(&self) -> f64 {
        self.inner.pump_events();
        self.inner.session.lock().position()
    }

    /// Position over duration, in `[0, 1]`; 0 when nothing has a duration.
    pub fn progress_fraction(&self) -> f64 {
        self.inner.pump_events();
        self.inner.session.lock().progress_fraction()
    }

    pub fn volume(&self) -> f32 {
        self.inner.session.lock().volume()
    }

    /// Message of the last failed request, cleared by the next request.
    pub fn last_error(&self) -> Option<String> {
        self.inner.pump_events();
        self.inner.session.lock().last_error().map(str::to_string)
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("session", &*self.inner.session.lock())
            .field("resolver", &self.inner.resolver)
            .field("frame", &*self.inner.frame.lock())
            .finish()
    }
}

impl PlayerInner {
    /// Run `f` on the session, then publish its events and bring the
    /// progress loop in line with the new status.
    fn with_session<R>(self: &Arc<Self>, f: impl FnOnce(&mut PlaybackSession) -> R) -> R {
        let (result, events) = {
            let mut session = self.session.lock();
            let result = f(&mut session);
            (result, session.take_events())
        };
        self.publish(events);
        self.sync_progress_loop();
        result
    }

    fn publish(&self, events: Vec<CoreEvent>) {
        for event in events {
            trace!(event = event.description(), "Publishing event");
            self.events.emit(event).ok();
        }
    }

    fn pump_events(self: &Arc<Self>) -> usize {
        let ended: Vec<SourceId> = {
            let mut rx = self.ended_rx.lock();
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };
        if ended.is_empty() {
            return 0;
        }

        self.with_session(|s| {
            ended
                .into_iter()
                .filter(|id| s.on_source_ended(*id))
                .count()
        })
    }

    /// Keep one frame requested while PLAYING and none otherwise.
    fn sync_progress_loop(self: &Arc<Self>) {
        let playing = self.session.lock().status() == PlaybackStatus::Playing;
        let mut frame = self.frame.lock();

        match (playing, frame.handle) {
            (true, None) => {
                frame.epoch += 1;
                let epoch = frame.epoch;
                let weak: Weak<Self> = Arc::downgrade(self);
                let handle = self.scheduler.request_frame(Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.tick(epoch);
                    }
                }));
                trace!(%handle, "Progress frame requested");
                frame.handle = Some(handle);
            }
            (false, Some(handle)) => {
                self.scheduler.cancel_frame(handle);
                trace!(%handle, "Progress frame cancelled");
                frame.handle = None;
            }
            _ => {}
        }
    }

    fn tick(self: &Arc<Self>, epoch: u64) {
        {
            let mut frame = self.frame.lock();
            if frame.epoch != epoch || frame.handle.is_none() {
                return;
            }
            frame.handle = None;
        }
        self.pump_events();

        let event = self.session.lock().position_event();
        if let Some(event) = event {
            self.events.emit(event).ok();
        }
        self.with_session(PlaybackSession::complete_if_elapsed);
    }
}

/// Abandons a request whose future is dropped while the content is in
/// flight, so the item is not left pending forever.
struct PendingRequest<'a> {
    inner: &'a Arc<PlayerInner>,
    token: Option<u64>,
}

impl PendingRequest<'_> {
    fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.inner.with_session(|s| s.abandon(token));
        }
    }
}
