//! # Playback Session
//!
//! The playback state machine. Every mutation goes through one of the
//! transition methods below; each returns what happened and queues the
//! matching [`CoreEvent`]s, which the owner drains with
//! [`PlaybackSession::take_events`] and publishes.
//!
//! ```text
//!             request(new item)
//!   ┌──────┐ ─────────────────> ┌──────────────────┐  content ok  ┌─────────┐
//!   │ IDLE │                    │ AWAITING_CONTENT │ ───────────> │ PLAYING │
//!   └──────┘ <───────────────── └──────────────────┘              └─────────┘
//!      ^  ^        stop()                │ content err              │  ^
//!      │  │                              v                   pause  │  │ resume
//!      │  │                          ┌───────┐                      v  │
//!      │  │                          │ ERROR │                   ┌────────┐
//!      │  │                          └───────┘                   │ PAUSED │
//!      │  └─── source ended ─── PLAYING                          └────────┘
//!      └────── stop() ───────── PLAYING / PAUSED
//! ```
//!
//! Content requests are identified by a monotonically increasing token.
//! A result is applied only when its token is still the pending one, so a
//! slow answer for an item the user already left can never overwrite the
//! current track.

use bridge_traits::{PlaybackStatus, SourceId};
use core_runtime::events::{ContentEvent, CoreEvent, PlaybackEvent};
use std::mem;
use tracing::{debug, error, info, warn};

use crate::config::PlayerConfig;
use crate::content::ResolvedContent;
use crate::controller::GraphController;
use crate::error::{PlaybackError, Result, OUTPUT_SUSPENDED_MESSAGE};
use crate::track::{MediaItem, PlaybackTrack};

/// What a play request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    /// Content must be acquired; report the result with this token.
    Fetch { token: u64 },
    /// The same item is already being fetched.
    Ignored,
    Paused,
    Resumed,
    /// A finished item was started again from the beginning.
    Replayed,
}

/// Outcome of applying a content result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Playing,
    /// The request failed; carries the user-facing message.
    Failed(String),
    /// The token was no longer pending; nothing changed.
    Stale,
}

/// Mutable playback state.
pub struct PlaybackSession {
    status: PlaybackStatus,
    current_item: Option<MediaItem>,
    track: Option<PlaybackTrack>,
    /// Meaningful only while PAUSED.
    paused_offset: f64,
    pending_token: Option<u64>,
    next_token: u64,
    last_error: Option<String>,
    last_audible_volume: f32,
    failure_message: String,
    default_voice: String,
    controller: GraphController,
    outbox: Vec<CoreEvent>,
}

impl PlaybackSession {
    pub fn new(controller: GraphController, config: &PlayerConfig) -> Self {
        let initial = controller.volume();
        Self {
            status: PlaybackStatus::Idle,
            current_item: None,
            track: None,
            paused_offset: 0.0,
            pending_token: None,
            next_token: 1,
            last_error: None,
            last_audible_volume: if initial > 0.0 {
                initial
            } else {
                config.unmute_volume
            },
            failure_message: config.failure_message.clone(),
            default_voice: config.default_voice.clone(),
            controller,
            outbox: Vec::new(),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Handle a play request for `item`.
    ///
    /// The same item toggles between PLAYING and PAUSED, is ignored while
    /// its content is pending, and replays from the start once finished.
    /// Anything else abandons the current item and asks for new content.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::OutputSuspended`] when the request would start audio
    /// while the output is blocked. The session is left untouched.
    pub fn request(&mut self, item: &MediaItem) -> Result<RequestDecision> {
        if self.is_current(&item.id) {
            match self.status {
                PlaybackStatus::AwaitingContent => {
                    debug!(item_id = %item.id, "Content already pending, ignoring request");
                    return Ok(RequestDecision::Ignored);
                }
                PlaybackStatus::Playing => {
                    self.pause();
                    return Ok(RequestDecision::Paused);
                }
                PlaybackStatus::Paused => {
                    self.resume()?;
                    return Ok(RequestDecision::Resumed);
                }
                PlaybackStatus::Idle if self.buffer().is_some() => {
                    self.replay()?;
                    return Ok(RequestDecision::Replayed);
                }
                PlaybackStatus::Idle | PlaybackStatus::Error => {}
            }
        }

        self.controller.ensure_output_running()?;
        self.halt_current();

        let token = self.next_token;
        self.next_token += 1;
        self.pending_token = Some(token);
        self.paused_offset = 0.0;
        self.last_error = None;
        self.track = Some(PlaybackTrack::pending(item));
        self.current_item = Some(item.clone());

        info!(item_id = %item.id, token, source = item.source.label(), "Requesting content");
        self.transition(PlaybackStatus::AwaitingContent);
        self.outbox.push(CoreEvent::Content(ContentEvent::Requested {
            item_id: item.id.clone(),
            token,
            source: item.source.label().to_string(),
        }));

        Ok(RequestDecision::Fetch { token })
    }

    /// Apply the result of the content request identified by `token`.
    pub fn complete_request(
        &mut self,
        token: u64,
        item_id: &str,
        result: Result<ResolvedContent>,
    ) -> Completion {
        if self.pending_token != Some(token) {
            warn!(item_id, token, pending = ?self.pending_token, "Discarding stale content result");
            self.outbox.push(CoreEvent::Content(ContentEvent::Discarded {
                item_id: item_id.to_string(),
                token,
                reason: "superseded".to_string(),
            }));
            return Completion::Stale;
        }
        self.pending_token = None;

        let content = match result {
            Ok(content) => content,
            Err(e) => return Completion::Failed(self.fail(&e)),
        };

        let Some(item) = self.current_item.clone() else {
            let err = PlaybackError::Internal("pending request without a current item".to_string());
            return Completion::Failed(self.fail(&err));
        };

        let artist = item.artist_label(&self.default_voice);
        let track = PlaybackTrack::ready(&item, artist, content.buffer.clone()).with_script(content.script);
        let duration_ms = millis(track.duration_secs);
        self.outbox.push(CoreEvent::Content(ContentEvent::Ready {
            item_id: item.id.clone(),
            token,
            duration_ms,
        }));
        self.track = Some(track);

        if let Err(e) = self
            .controller
            .ensure_output_running()
            .and_then(|_| self.controller.play(&content.buffer, 0.0))
        {
            return Completion::Failed(self.fail(&e));
        }

        info!(item_id = %item.id, duration_ms, "Playback started");
        self.transition(PlaybackStatus::Playing);
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Started {
            item_id: item.id.clone(),
            title: item.title.clone(),
            duration_ms,
        }));
        Completion::Playing
    }

    /// Apply an ended notification from the output.
    ///
    /// Only the live source completes the item; notifications from stopped
    /// or replaced sources are ignored. Returns `true` on completion.
    pub fn on_source_ended(&mut self, id: SourceId) -> bool {
        if !self.controller.acknowledge_ended(id) {
            return false;
        }
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        self.complete();
        true
    }

    /// Complete the playing item once its elapsed time reaches the duration,
    /// whether or not the output reported the end. Returns `true` on
    /// completion.
    pub fn complete_if_elapsed(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        let Some(id) = self.controller.release_finished() else {
            return false;
        };
        debug!(%id, "Source reached its end without an ended notification");
        self.complete();
        true
    }

    /// Abandon the request identified by `token` if it is still pending.
    ///
    /// Used when the caller gave up on a request before its content came
    /// back; any newer request is left alone.
    pub fn abandon(&mut self, token: u64) -> bool {
        if self.pending_token != Some(token) {
            return false;
        }
        warn!(token, item_id = ?self.current_item_id(), "Content request dropped before completion");
        self.stop()
    }

    /// Pause the playing item. No-op outside PLAYING.
    pub fn pause(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }

        self.paused_offset = self.controller.stop();
        debug!(offset = self.paused_offset, "Paused");
        self.transition(PlaybackStatus::Paused);
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Paused {
            item_id: self.current_item_id().unwrap_or_default().to_string(),
            position_ms: millis(self.paused_offset),
        }));
        true
    }

    /// Resume the paused item from its offset. No-op outside PAUSED.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::OutputSuspended`] with the session untouched, or the
    /// output's start failure after the session moved to ERROR.
    pub fn resume(&mut self) -> Result<bool> {
        if self.status != PlaybackStatus::Paused {
            return Ok(false);
        }
        self.controller.ensure_output_running()?;

        let offset = self.paused_offset;
        self.start_from(offset)?;
        debug!(offset, "Resumed");
        self.transition(PlaybackStatus::Playing);
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Resumed {
            item_id: self.current_item_id().unwrap_or_default().to_string(),
            position_ms: millis(offset),
        }));
        Ok(true)
    }

    /// Stop playback or abandon a pending request.
    ///
    /// Stopping never counts as completion. A stopped item keeps its decoded
    /// track so requesting it again replays from the start. No-op in IDLE
    /// and ERROR.
    pub fn stop(&mut self) -> bool {
        if self.status.is_active() {
            self.halt_current();
            self.transition(PlaybackStatus::Idle);
            return true;
        }
        if self.status != PlaybackStatus::AwaitingContent {
            return false;
        }

        debug!(token = ?self.pending_token, "Abandoning pending content request");
        self.pending_token = None;
        self.track = None;
        self.current_item = None;
        self.transition(PlaybackStatus::Idle);
        true
    }

    // ========================================================================
    // Volume
    // ========================================================================

    /// Set the session volume; returns the clamped level.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        let applied = self.controller.set_volume(level);
        if applied > 0.0 {
            self.last_audible_volume = applied;
        }
        self.outbox
            .push(CoreEvent::Playback(PlaybackEvent::VolumeChanged {
                volume_percent: (applied * 100.0).round() as u8,
                muted: applied == 0.0,
            }));
        applied
    }

    /// Mute, or restore the last audible volume.
    pub fn toggle_mute(&mut self) -> f32 {
        let target = if self.controller.volume() > 0.0 {
            0.0
        } else {
            self.last_audible_volume
        };
        self.set_volume(target)
    }

    pub fn volume(&self) -> f32 {
        self.controller.volume()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current_item_id(&self) -> Option<&str> {
        self.current_item.as_ref().map(|item| item.id.as_str())
    }

    pub fn current_track(&self) -> Option<&PlaybackTrack> {
        self.track.as_ref()
    }

    /// Seconds into the current track.
    pub fn position(&self) -> f64 {
        match self.status {
            PlaybackStatus::Playing => self.controller.elapsed().unwrap_or(0.0),
            PlaybackStatus::Paused => self.paused_offset,
            _ => 0.0,
        }
    }

    /// Position as a fraction of the duration, in `[0, 1]`. 0 for a pending
    /// or empty track.
    pub fn progress_fraction(&self) -> f64 {
        let duration = self.track.as_ref().map_or(0.0, |t| t.duration_secs);
        if duration.is_nan() || duration <= 0.0 {
            return 0.0;
        }
        (self.position() / duration).clamp(0.0, 1.0)
    }

    /// Progress update for the playing track; `None` outside PLAYING.
    pub fn position_event(&self) -> Option<CoreEvent> {
        if self.status != PlaybackStatus::Playing {
            return None;
        }
        Some(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            item_id: self.current_item_id().unwrap_or_default().to_string(),
            position_ms: millis(self.position()),
            duration_ms: millis(self.track.as_ref().map_or(0.0, |t| t.duration_secs)),
        }))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending_token(&self) -> Option<u64> {
        self.pending_token
    }

    /// Drain queued events in the order they happened.
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn is_current(&self, item_id: &str) -> bool {
        self.current_item_id() == Some(item_id)
    }

    fn buffer(&self) -> Option<&bridge_traits::SampleBuffer> {
        self.track.as_ref().and_then(|t| t.buffer.as_ref())
    }

    fn replay(&mut self) -> Result<()> {
        self.controller.ensure_output_running()?;
        self.start_from(0.0)?;

        let (item_id, title) = self
            .current_item
            .as_ref()
            .map(|item| (item.id.clone(), item.title.clone()))
            .unwrap_or_default();
        let duration_ms = millis(self.track.as_ref().map_or(0.0, |t| t.duration_secs));
        info!(item_id = %item_id, "Replaying from the start");
        self.transition(PlaybackStatus::Playing);
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Started {
            item_id,
            title,
            duration_ms,
        }));
        Ok(())
    }

    /// Start the current buffer at `offset`, failing the session when the
    /// output refuses.
    fn start_from(&mut self, offset: f64) -> Result<()> {
        let Some(buffer) = self.buffer().cloned() else {
            let err = PlaybackError::Internal("no decoded buffer to play".to_string());
            self.fail(&err);
            return Err(err);
        };
        if let Err(e) = self.controller.play(&buffer, offset) {
            self.fail(&e);
            return Err(e);
        }
        Ok(())
    }

    fn complete(&mut self) {
        self.paused_offset = 0.0;
        let item_id = self.current_item_id().unwrap_or_default().to_string();
        info!(item_id = %item_id, "Playback completed");
        self.transition(PlaybackStatus::Idle);
        self.outbox
            .push(CoreEvent::Playback(PlaybackEvent::Completed { item_id }));
    }

    /// Stop whatever is audible or paused and publish `Stopped` for it.
    fn halt_current(&mut self) {
        let position = match self.status {
            PlaybackStatus::Playing => self.controller.stop(),
            PlaybackStatus::Paused => {
                self.controller.stop();
                self.paused_offset
            }
            _ => {
                self.controller.stop();
                return;
            }
        };
        self.paused_offset = 0.0;

        let item_id = self.current_item_id().unwrap_or_default().to_string();
        debug!(item_id = %item_id, position, "Stopped");
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Stopped {
            item_id,
            position_ms: millis(position),
        }));
    }

    /// Move to ERROR, dropping the current item. Returns the user message.
    fn fail(&mut self, err: &PlaybackError) -> String {
        error!(error = %err, item_id = ?self.current_item_id(), "Playback request failed");

        self.controller.stop();
        let item_id = self.current_item.take().map(|item| item.id);
        self.track = None;
        self.paused_offset = 0.0;
        self.pending_token = None;

        let message = if err.requires_user_gesture() {
            OUTPUT_SUSPENDED_MESSAGE.to_string()
        } else {
            self.failure_message.clone()
        };
        self.last_error = Some(message.clone());

        self.transition(PlaybackStatus::Error);
        self.outbox.push(CoreEvent::Playback(PlaybackEvent::Error {
            item_id,
            message: message.clone(),
            recoverable: err.is_transient(),
        }));
        message
    }

    fn transition(&mut self, to: PlaybackStatus) {
        let from = self.status;
        if from == to {
            return;
        }
        self.status = to;
        debug!(%from, %to, "Status changed");
        self.outbox
            .push(CoreEvent::Playback(PlaybackEvent::StatusChanged {
                from,
                to,
                item_id: self.current_item_id().map(str::to_string),
            }));
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("status", &self.status)
            .field("current_item", &self.current_item_id())
            .field("paused_offset", &self.paused_offset)
            .field("pending_token", &self.pending_token)
            .field("last_error", &self.last_error)
            .field("controller", &self.controller)
            .finish()
    }
}

/// Seconds to whole milliseconds for event payloads.
fn millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        AudioOutput, EndedCallback, MonotonicClock, OutputState, SampleBuffer, SourceRequest,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Clock(Mutex<f64>);

    impl MonotonicClock for Clock {
        fn now_secs(&self) -> f64 {
            *self.0.lock()
        }
    }

    struct Output {
        state: Mutex<OutputState>,
        starts: Mutex<Vec<SourceRequest>>,
    }

    #[async_trait::async_trait]
    impl AudioOutput for Output {
        fn state(&self) -> OutputState {
            *self.state.lock()
        }

        async fn resume(&self) -> BridgeResult<()> {
            Ok(())
        }

        fn start(&self, request: SourceRequest, _on_ended: EndedCallback) -> BridgeResult<()> {
            self.starts.lock().push(request);
            Ok(())
        }

        fn stop(&self, _source: SourceId) -> BridgeResult<()> {
            Ok(())
        }

        fn set_gain(&self, _source: SourceId, _gain: f32) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct Harness {
        session: PlaybackSession,
        clock: Arc<Clock>,
        output: Arc<Output>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(Clock::default());
            let output = Arc::new(Output {
                state: Mutex::new(OutputState::Running),
                starts: Mutex::default(),
            });
            let (tx, _rx) = mpsc::unbounded_channel();
            let config = PlayerConfig::default();
            let controller = GraphController::new(output.clone(), clock.clone(), tx, config.initial_volume);
            Self {
                session: PlaybackSession::new(controller, &config),
                clock,
                output,
            }
        }

        fn advance(&self, secs: f64) {
            *self.clock.0.lock() += secs;
        }

        fn live(&self) -> SourceId {
            self.session.controller.live_source().unwrap()
        }

        fn play_ready(&mut self, item: &MediaItem, secs: usize) -> u64 {
            let RequestDecision::Fetch { token } = self.session.request(item).unwrap() else {
                panic!("expected a fetch");
            };
            let content = ResolvedContent {
                buffer: SampleBuffer::mono(vec![0.0; secs * 100], 100),
                script: None,
            };
            assert_eq!(
                self.session.complete_request(token, &item.id, Ok(content)),
                Completion::Playing
            );
            token
        }
    }

    fn station(id: &str) -> MediaItem {
        MediaItem::generated(id, format!("Station {id}"), "ambient")
    }

    fn statuses(events: &[CoreEvent]) -> Vec<PlaybackStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::Playback(PlaybackEvent::StatusChanged { to, .. }) => Some(*to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn request_creates_pending_track() {
        let mut h = Harness::new();
        let decision = h.session.request(&station("a")).unwrap();

        assert_eq!(decision, RequestDecision::Fetch { token: 1 });
        assert_eq!(h.session.status(), PlaybackStatus::AwaitingContent);
        let track = h.session.current_track().unwrap();
        assert_eq!(track.title, crate::track::LOADING_TITLE);
        assert!(!track.is_ready());
        assert_eq!(h.session.progress_fraction(), 0.0);

        let events = h.session.take_events();
        assert_eq!(statuses(&events), vec![PlaybackStatus::AwaitingContent]);
        assert!(matches!(
            events.last(),
            Some(CoreEvent::Content(ContentEvent::Requested { token: 1, .. }))
        ));
    }

    #[test]
    fn repeated_request_while_pending_is_ignored() {
        let mut h = Harness::new();
        h.session.request(&station("a")).unwrap();
        assert_eq!(h.session.request(&station("a")).unwrap(), RequestDecision::Ignored);
        assert_eq!(h.session.pending_token(), Some(1));
    }

    #[test]
    fn ready_content_starts_playback() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);

        assert_eq!(h.session.status(), PlaybackStatus::Playing);
        let track = h.session.current_track().unwrap();
        assert_eq!(track.title, "Station a");
        assert_eq!(track.artist, "AI Host (Puck)");
        assert_eq!(track.duration_secs, 3.0);
        assert_eq!(h.output.starts.lock().len(), 1);
    }

    #[test]
    fn toggling_the_same_item_pauses_and_resumes() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        h.advance(1.5);

        assert_eq!(h.session.request(&station("a")).unwrap(), RequestDecision::Paused);
        assert_eq!(h.session.position(), 1.5);
        assert_eq!(h.session.progress_fraction(), 0.5);

        h.advance(30.0);
        assert_eq!(h.session.request(&station("a")).unwrap(), RequestDecision::Resumed);
        assert_eq!(h.session.position(), 1.5);
        assert_eq!(h.output.starts.lock()[1].offset_secs, 1.5);
    }

    #[test]
    fn stale_result_is_discarded() {
        let mut h = Harness::new();
        let RequestDecision::Fetch { token: first } = h.session.request(&station("a")).unwrap() else {
            panic!("expected a fetch");
        };
        h.session.request(&station("b")).unwrap();
        h.session.take_events();

        let content = ResolvedContent {
            buffer: SampleBuffer::mono(vec![0.0; 10], 10),
            script: None,
        };
        assert_eq!(h.session.complete_request(first, "a", Ok(content)), Completion::Stale);
        assert_eq!(h.session.status(), PlaybackStatus::AwaitingContent);
        assert_eq!(h.session.current_item_id(), Some("b"));
        assert!(!h.session.current_track().unwrap().is_ready());
        assert!(matches!(
            h.session.take_events().as_slice(),
            [CoreEvent::Content(ContentEvent::Discarded { token, .. })] if *token == first
        ));
    }

    #[test]
    fn failure_clears_item_and_records_message() {
        let mut h = Harness::new();
        let RequestDecision::Fetch { token } = h.session.request(&station("a")).unwrap() else {
            panic!("expected a fetch");
        };

        let completion = h.session.complete_request(
            token,
            "a",
            Err(PlaybackError::ContentUnavailable("No audio data received".into())),
        );

        let message = crate::error::DEFAULT_FAILURE_MESSAGE.to_string();
        assert_eq!(completion, Completion::Failed(message.clone()));
        assert_eq!(h.session.status(), PlaybackStatus::Error);
        assert_eq!(h.session.current_item_id(), None);
        assert!(h.session.current_track().is_none());
        assert_eq!(h.session.last_error(), Some(message.as_str()));

        // Retrying the same item fetches again and clears the error.
        assert!(matches!(
            h.session.request(&station("a")).unwrap(),
            RequestDecision::Fetch { token: 2 }
        ));
        assert_eq!(h.session.last_error(), None);
    }

    #[test]
    fn natural_completion_returns_to_idle_and_allows_replay() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        let live = h.live();
        h.session.take_events();

        assert!(h.session.on_source_ended(live));
        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert_eq!(h.session.position(), 0.0);
        assert!(h
            .session
            .take_events()
            .iter()
            .any(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Completed { .. }))));

        assert_eq!(h.session.request(&station("a")).unwrap(), RequestDecision::Replayed);
        assert_eq!(h.session.status(), PlaybackStatus::Playing);
        assert_eq!(h.output.starts.lock()[1].offset_secs, 0.0);
    }

    #[test]
    fn stop_is_not_completion() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        let live = h.live();
        h.session.take_events();

        assert!(h.session.stop());
        assert!(!h.session.on_source_ended(live));

        let events = h.session.take_events();
        assert!(events
            .iter()
            .all(|e| !matches!(e, CoreEvent::Playback(PlaybackEvent::Completed { .. }))));
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Stopped { .. }))));
        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert!(!h.session.stop());
    }

    #[test]
    fn stop_while_pending_drops_the_request() {
        let mut h = Harness::new();
        h.session.request(&station("a")).unwrap();
        assert!(h.session.stop());

        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert_eq!(h.session.pending_token(), None);
        assert!(h.session.current_track().is_none());
    }

    #[test]
    fn elapsed_past_duration_completes_once() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        let live = h.live();
        h.session.take_events();

        h.advance(2.9);
        assert!(!h.session.complete_if_elapsed());
        assert_eq!(h.session.status(), PlaybackStatus::Playing);

        h.advance(7.0);
        assert!(h.session.complete_if_elapsed());
        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert_eq!(h.session.position(), 0.0);

        // The output's late report for the same source changes nothing.
        assert!(!h.session.on_source_ended(live));
        assert!(!h.session.complete_if_elapsed());
        let completions = h
            .session
            .take_events()
            .iter()
            .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Completed { .. })))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn paused_item_never_completes_on_elapsed_time() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        h.advance(1.0);
        assert!(h.session.pause());

        h.advance(10.0);
        assert!(!h.session.complete_if_elapsed());
        assert_eq!(h.session.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn abandon_only_drops_the_matching_request() {
        let mut h = Harness::new();
        let RequestDecision::Fetch { token: first } = h.session.request(&station("a")).unwrap()
        else {
            panic!("expected a fetch");
        };
        let RequestDecision::Fetch { token: second } = h.session.request(&station("b")).unwrap()
        else {
            panic!("expected a fetch");
        };

        assert!(!h.session.abandon(first));
        assert_eq!(h.session.status(), PlaybackStatus::AwaitingContent);
        assert_eq!(h.session.pending_token(), Some(second));

        assert!(h.session.abandon(second));
        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert_eq!(h.session.pending_token(), None);
        assert!(matches!(
            h.session.request(&station("b")).unwrap(),
            RequestDecision::Fetch { .. }
        ));
    }

    #[test]
    fn switching_items_stops_the_live_source() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 3);
        h.session.take_events();

        h.session.request(&station("b")).unwrap();
        assert_eq!(h.session.controller.live_source(), None);
        let events = h.session.take_events();
        assert!(matches!(
            events.first(),
            Some(CoreEvent::Playback(PlaybackEvent::Stopped { item_id, .. })) if item_id == "a"
        ));
    }

    #[test]
    fn suspended_output_rejects_without_state_change() {
        let mut h = Harness::new();
        *h.output.state.lock() = OutputState::Suspended;

        let err = h.session.request(&station("a")).unwrap_err();
        assert!(err.requires_user_gesture());
        assert_eq!(h.session.status(), PlaybackStatus::Idle);
        assert!(h.session.take_events().is_empty());
    }

    #[test]
    fn output_suspended_on_arrival_fails_with_gesture_message() {
        let mut h = Harness::new();
        let RequestDecision::Fetch { token } = h.session.request(&station("a")).unwrap() else {
            panic!("expected a fetch");
        };
        *h.output.state.lock() = OutputState::Suspended;

        let content = ResolvedContent {
            buffer: SampleBuffer::mono(vec![0.0; 10], 10),
            script: None,
        };
        let completion = h.session.complete_request(token, "a", Ok(content));
        assert_eq!(completion, Completion::Failed(OUTPUT_SUSPENDED_MESSAGE.to_string()));
        assert_eq!(h.session.status(), PlaybackStatus::Error);
    }

    #[test]
    fn toggle_mute_restores_last_audible_volume() {
        let mut h = Harness::new();
        assert_eq!(h.session.set_volume(0.5), 0.5);
        assert_eq!(h.session.toggle_mute(), 0.0);
        assert_eq!(h.session.toggle_mute(), 0.5);

        h.session.set_volume(0.0);
        assert_eq!(h.session.toggle_mute(), 0.5);
    }

    #[test]
    fn zero_duration_track_has_zero_progress() {
        let mut h = Harness::new();
        h.play_ready(&station("a"), 0);
        assert_eq!(h.session.progress_fraction(), 0.0);
        assert!(!h.session.progress_fraction().is_nan());
    }

    #[test]
    fn millis_rounds_and_guards() {
        assert_eq!(millis(1.5), 1500);
        assert_eq!(millis(-2.0), 0);
        assert_eq!(millis(f64::NAN), 0);
    }
}
