//! # Graph Controller
//!
//! Owns the output context and at most one live source.
//!
//! Elapsed time is measured on the injected [`MonotonicClock`]: starting a
//! source at offset `o` records `start_instant = now - o`, so elapsed is
//! always `now - start_instant` and pausing is just "stop and remember the
//! elapsed value". Every started source gets a fresh [`SourceId`]. The
//! output reports the end of a source through a channel; only the id of the
//! still-live source counts as natural completion.

use bridge_traits::{AudioOutput, MonotonicClock, OutputState, SampleBuffer, SourceId, SourceRequest};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::error::{PlaybackError, Result};

#[derive(Debug, Clone, Copy)]
struct LiveSource {
    id: SourceId,
    start_instant: f64,
    duration: f64,
}

/// Single-source audio graph driver.
pub struct GraphController {
    output: Arc<dyn AudioOutput>,
    clock: Arc<dyn MonotonicClock>,
    ended_tx: UnboundedSender<SourceId>,
    volume: f32,
    next_source: u64,
    live: Option<LiveSource>,
}

impl GraphController {
    /// `ended_tx` receives the id of every source the output reports as
    /// finished.
    pub fn new(
        output: Arc<dyn AudioOutput>,
        clock: Arc<dyn MonotonicClock>,
        ended_tx: UnboundedSender<SourceId>,
        volume: f32,
    ) -> Self {
        Self {
            output,
            clock,
            ended_tx,
            volume: clamp_unit(volume),
            next_source: 1,
            live: None,
        }
    }

    /// Start `buffer` from `offset_secs`, replacing any live source.
    ///
    /// The offset is clamped into `[0, duration]`. When nothing remains to
    /// play (empty buffer, offset at the end) the source completes at once
    /// without touching the output.
    pub fn play(&mut self, buffer: &SampleBuffer, offset_secs: f64) -> Result<SourceId> {
        self.stop();

        let duration = buffer.duration_secs();
        let offset = clamp_offset(offset_secs, duration);
        let id = SourceId::new(self.next_source);
        self.next_source += 1;
        let now = self.clock.now_secs();

        if offset >= duration {
            debug!(%id, duration, "Nothing left to play, completing immediately");
            self.live = Some(LiveSource {
                id,
                start_instant: now - duration,
                duration,
            });
            // The receiver lives as long as the player; a closed channel
            // means the player is gone and nobody cares about completion.
            let _ = self.ended_tx.send(id);
            return Ok(id);
        }

        let request = SourceRequest {
            id,
            buffer: buffer.clone(),
            offset_secs: offset,
            gain: self.volume,
        };
        let tx = self.ended_tx.clone();
        self.output
            .start(
                request,
                Box::new(move |ended| {
                    let _ = tx.send(ended);
                }),
            )
            .map_err(|e| PlaybackError::AudioDevice(format!("failed to start source: {e}")))?;

        debug!(%id, offset, duration, gain = self.volume, "Source started");
        self.live = Some(LiveSource {
            id,
            start_instant: now - offset,
            duration,
        });
        Ok(id)
    }

    /// Halt the live source and return how far it got, in seconds.
    ///
    /// Returns 0 when nothing is live. Output failures are logged; the source
    /// is considered gone either way.
    pub fn stop(&mut self) -> f64 {
        let Some(live) = self.live.take() else {
            return 0.0;
        };

        let elapsed = self.elapsed_for(&live);
        if let Err(e) = self.output.stop(live.id) {
            warn!(id = %live.id, error = %e, "Output failed to stop source");
        }
        debug!(id = %live.id, elapsed, "Source stopped");
        elapsed
    }

    /// Release the live source once the clock has passed its end.
    ///
    /// Covers outputs that never report the end (a device that died
    /// mid-track). A late ended notification for the id is ignored.
    pub fn release_finished(&mut self) -> Option<SourceId> {
        let live = self.live?;
        if self.elapsed_for(&live) < live.duration {
            return None;
        }
        self.live = None;
        if let Err(e) = self.output.stop(live.id) {
            warn!(id = %live.id, error = %e, "Output failed to stop finished source");
        }
        Some(live.id)
    }

    /// Set the session volume and apply it to the live source in place.
    /// Returns the clamped level.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        self.volume = clamp_unit(level);
        if let Some(live) = &self.live {
            if let Err(e) = self.output.set_gain(live.id, self.volume) {
                warn!(id = %live.id, error = %e, "Output failed to apply gain");
            }
        }
        self.volume
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Seconds into the live source, capped at its duration.
    pub fn elapsed(&self) -> Option<f64> {
        self.live.as_ref().map(|live| self.elapsed_for(live))
    }

    pub fn live_source(&self) -> Option<SourceId> {
        self.live.map(|live| live.id)
    }

    /// Accept an ended notification.
    ///
    /// Returns `true` only for the live source, which is then released.
    /// Ids of stopped or replaced sources are ignored.
    pub fn acknowledge_ended(&mut self, id: SourceId) -> bool {
        match self.live {
            Some(live) if live.id == id => {
                self.live = None;
                true
            }
            _ => {
                trace!(%id, "Ignoring ended notification from inactive source");
                false
            }
        }
    }

    /// Fail when the output context cannot start sources right now.
    ///
    /// Never resumes the context itself; that needs a user gesture.
    pub fn ensure_output_running(&self) -> Result<()> {
        match self.output.state() {
            OutputState::Running => Ok(()),
            OutputState::Suspended => Err(PlaybackError::OutputSuspended),
            OutputState::Closed => Err(PlaybackError::AudioDevice(
                "audio output context is closed".to_string(),
            )),
        }
    }

    fn elapsed_for(&self, live: &LiveSource) -> f64 {
        clamp_offset(self.clock.now_secs() - live.start_instant, live.duration)
    }
}

impl std::fmt::Debug for GraphController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphController")
            .field("volume", &self.volume)
            .field("live", &self.live)
            .finish()
    }
}

fn clamp_offset(offset: f64, duration: f64) -> f64 {
    if !offset.is_finite() || offset <= 0.0 {
        return 0.0;
    }
    offset.min(duration.max(0.0))
}

fn clamp_unit(level: f32) -> f32 {
    if level.is_nan() {
        return 0.0;
    }
    level.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::EndedCallback;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Clock(Mutex<f64>);

    impl Clock {
        fn advance(&self, secs: f64) {
            *self.0.lock() += secs;
        }
    }

    impl MonotonicClock for Clock {
        fn now_secs(&self) -> f64 {
            *self.0.lock()
        }
    }

    struct Output {
        state: Mutex<OutputState>,
        started: Mutex<Vec<(SourceId, f64, f32)>>,
        stopped: Mutex<Vec<SourceId>>,
        gains: Mutex<Vec<(SourceId, f32)>>,
        callbacks: Mutex<Vec<(SourceId, EndedCallback)>>,
        fail_start: bool,
    }

    impl Output {
        fn new() -> Self {
            Self {
                state: Mutex::new(OutputState::Running),
                started: Mutex::default(),
                stopped: Mutex::default(),
                gains: Mutex::default(),
                callbacks: Mutex::default(),
                fail_start: false,
            }
        }

        fn finish(&self, id: SourceId) {
            let mut callbacks = self.callbacks.lock();
            let pos = callbacks.iter().position(|(cid, _)| *cid == id).unwrap();
            let (_, callback) = callbacks.remove(pos);
            callback(id);
        }
    }

    #[async_trait::async_trait]
    impl AudioOutput for Output {
        fn state(&self) -> OutputState {
            *self.state.lock()
        }

        async fn resume(&self) -> BridgeResult<()> {
            *self.state.lock() = OutputState::Running;
            Ok(())
        }

        fn start(&self, request: SourceRequest, on_ended: EndedCallback) -> BridgeResult<()> {
            if self.fail_start {
                return Err(bridge_traits::BridgeError::OperationFailed("no device".into()));
            }
            self.started
                .lock()
                .push((request.id, request.offset_secs, request.gain));
            self.callbacks.lock().push((request.id, on_ended));
            Ok(())
        }

        fn stop(&self, source: SourceId) -> BridgeResult<()> {
            self.stopped.lock().push(source);
            Ok(())
        }

        fn set_gain(&self, source: SourceId, gain: f32) -> BridgeResult<()> {
            self.gains.lock().push((source, gain));
            Ok(())
        }
    }

    fn setup(
        output: Output,
    ) -> (
        GraphController,
        Arc<Output>,
        Arc<Clock>,
        mpsc::UnboundedReceiver<SourceId>,
    ) {
        let output = Arc::new(output);
        let clock = Arc::new(Clock::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = GraphController::new(output.clone(), clock.clone(), tx, 0.8);
        (controller, output, clock, rx)
    }

    fn three_seconds() -> SampleBuffer {
        SampleBuffer::mono(vec![0.0; 300], 100)
    }

    #[test]
    fn elapsed_tracks_clock_and_caps_at_duration() {
        let (mut controller, _, clock, _) = setup(Output::new());
        controller.play(&three_seconds(), 0.0).unwrap();

        clock.advance(1.25);
        assert_eq!(controller.elapsed(), Some(1.25));
        clock.advance(10.0);
        assert_eq!(controller.elapsed(), Some(3.0));
    }

    #[test]
    fn stop_then_play_from_offset_continues_timeline() {
        let (mut controller, output, clock, _) = setup(Output::new());
        controller.play(&three_seconds(), 0.0).unwrap();
        clock.advance(1.5);

        let offset = controller.stop();
        assert_eq!(offset, 1.5);
        assert_eq!(controller.elapsed(), None);

        clock.advance(20.0);
        controller.play(&three_seconds(), offset).unwrap();
        assert_eq!(controller.elapsed(), Some(1.5));

        let started = output.started.lock();
        assert_eq!(started[1].1, 1.5);
    }

    #[test]
    fn play_replaces_live_source_with_fresh_id() {
        let (mut controller, output, _, _) = setup(Output::new());
        let first = controller.play(&three_seconds(), 0.0).unwrap();
        let second = controller.play(&three_seconds(), 0.0).unwrap();

        assert_ne!(first, second);
        assert_eq!(output.stopped.lock().as_slice(), &[first]);
        assert_eq!(controller.live_source(), Some(second));
    }

    #[test]
    fn only_live_source_counts_as_ended() {
        let (mut controller, output, _, mut rx) = setup(Output::new());
        let first = controller.play(&three_seconds(), 0.0).unwrap();
        let second = controller.play(&three_seconds(), 0.0).unwrap();

        output.finish(first);
        output.finish(second);
        assert_eq!(rx.try_recv().unwrap(), first);
        assert_eq!(rx.try_recv().unwrap(), second);

        assert!(!controller.acknowledge_ended(first));
        assert!(controller.acknowledge_ended(second));
        assert!(!controller.acknowledge_ended(second));
        assert_eq!(controller.live_source(), None);
    }

    #[test]
    fn empty_buffer_completes_immediately_without_output() {
        let (mut controller, output, _, mut rx) = setup(Output::new());
        let id = controller.play(&SampleBuffer::empty(24_000), 0.0).unwrap();

        assert!(output.started.lock().is_empty());
        assert_eq!(rx.try_recv().unwrap(), id);
        assert_eq!(controller.elapsed(), Some(0.0));
        assert!(controller.acknowledge_ended(id));
    }

    #[test]
    fn offsets_are_clamped() {
        let (mut controller, output, _, _) = setup(Output::new());
        controller.play(&three_seconds(), -4.0).unwrap();
        controller.play(&three_seconds(), f64::NAN).unwrap();
        assert!(output.started.lock().iter().all(|(_, offset, _)| *offset == 0.0));

        let (mut controller, _, _, mut rx) = setup(Output::new());
        let id = controller.play(&three_seconds(), 99.0).unwrap();
        assert_eq!(rx.try_recv().unwrap(), id);
    }

    #[test]
    fn volume_is_clamped_and_applied_in_place() {
        let (mut controller, output, _, _) = setup(Output::new());
        let id = controller.play(&three_seconds(), 0.0).unwrap();
        assert_eq!(output.started.lock()[0].2, 0.8);

        assert_eq!(controller.set_volume(1.7), 1.0);
        assert_eq!(controller.set_volume(f32::NAN), 0.0);
        assert_eq!(controller.set_volume(0.3), 0.3);

        let gains = output.gains.lock();
        assert_eq!(gains.last(), Some(&(id, 0.3)));
        assert_eq!(output.started.lock().len(), 1);
    }

    #[test]
    fn stop_with_nothing_live_returns_zero() {
        let (mut controller, output, _, _) = setup(Output::new());
        assert_eq!(controller.stop(), 0.0);
        assert!(output.stopped.lock().is_empty());
    }

    #[test]
    fn start_failure_leaves_nothing_live() {
        let mut failing = Output::new();
        failing.fail_start = true;
        let (mut controller, _, _, _) = setup(failing);

        let err = controller.play(&three_seconds(), 0.0).unwrap_err();
        assert!(matches!(err, PlaybackError::AudioDevice(_)));
        assert_eq!(controller.live_source(), None);
    }

    #[test]
    fn suspended_and_closed_outputs_are_reported() {
        let (controller, output, _, _) = setup(Output::new());
        assert!(controller.ensure_output_running().is_ok());

        *output.state.lock() = OutputState::Suspended;
        assert!(matches!(
            controller.ensure_output_running(),
            Err(PlaybackError::OutputSuspended)
        ));

        *output.state.lock() = OutputState::Closed;
        assert!(matches!(
            controller.ensure_output_running(),
            Err(PlaybackError::AudioDevice(_))
        ));
    }
}
