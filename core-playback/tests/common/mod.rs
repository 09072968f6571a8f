//! Deterministic fakes for driving a `Player` in tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioOutput, ContentProvider, EndedCallback, FrameCallback, FrameHandle, FrameScheduler,
    GeneratedContent, GenerationRequest, MonotonicClock, OutputState, SourceId, SourceRequest,
};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

// ============================================================================
// Clock
// ============================================================================

#[derive(Default)]
pub struct ManualClock(Mutex<f64>);

impl ManualClock {
    pub fn advance(&self, secs: f64) {
        *self.0.lock() += secs;
    }
}

impl MonotonicClock for ManualClock {
    fn now_secs(&self) -> f64 {
        *self.0.lock()
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone)]
pub struct Started {
    pub id: SourceId,
    pub offset_secs: f64,
    pub gain: f32,
    pub duration_secs: f64,
}

pub struct FakeOutput {
    state: Mutex<OutputState>,
    started: Mutex<Vec<Started>>,
    stopped: Mutex<Vec<SourceId>>,
    gains: Mutex<Vec<(SourceId, f32)>>,
    pending: Mutex<HashMap<SourceId, EndedCallback>>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OutputState::Running),
            started: Mutex::default(),
            stopped: Mutex::default(),
            gains: Mutex::default(),
            pending: Mutex::default(),
        }
    }

    pub fn set_state(&self, state: OutputState) {
        *self.state.lock() = state;
    }

    pub fn started(&self) -> Vec<Started> {
        self.started.lock().clone()
    }

    pub fn stopped(&self) -> Vec<SourceId> {
        self.stopped.lock().clone()
    }

    pub fn gains(&self) -> Vec<(SourceId, f32)> {
        self.gains.lock().clone()
    }

    pub fn last_started(&self) -> Option<SourceId> {
        self.started.lock().last().map(|s| s.id)
    }

    /// Fire the ended callback of `id` as if the buffer ran out.
    pub fn finish(&self, id: SourceId) {
        let callback = self.pending.lock().remove(&id);
        if let Some(callback) = callback {
            callback(id);
        }
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    fn state(&self) -> OutputState {
        *self.state.lock()
    }

    async fn resume(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if *state == OutputState::Closed {
            return Err(bridge_traits::BridgeError::OperationFailed("closed".into()));
        }
        *state = OutputState::Running;
        Ok(())
    }

    fn start(&self, request: SourceRequest, on_ended: EndedCallback) -> BridgeResult<()> {
        self.started.lock().push(Started {
            id: request.id,
            offset_secs: request.offset_secs,
            gain: request.gain,
            duration_secs: request.buffer.duration_secs(),
        });
        self.pending.lock().insert(request.id, on_ended);
        Ok(())
    }

    /// Stopping fires `onended` like Web Audio does.
    fn stop(&self, source: SourceId) -> BridgeResult<()> {
        self.stopped.lock().push(source);
        self.finish(source);
        Ok(())
    }

    fn set_gain(&self, source: SourceId, gain: f32) -> BridgeResult<()> {
        self.gains.lock().push((source, gain));
        Ok(())
    }
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Default)]
pub struct ManualScheduler {
    next: Mutex<u64>,
    queue: Mutex<Vec<(FrameHandle, FrameCallback)>>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every frame queued so far. Frames requested by those callbacks
    /// wait for the next call.
    pub fn run_pending(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.lock());
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let mut next = self.next.lock();
        *next += 1;
        let handle = FrameHandle::new(*next);
        self.queue.lock().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.lock().retain(|(h, _)| *h != handle);
    }
}

// ============================================================================
// Content Provider
// ============================================================================

/// Provider whose answers are held until [`GatedProvider::release`] is
/// called for the item.
pub struct GatedProvider {
    calls: AtomicUsize,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    audio: Option<String>,
}

impl GatedProvider {
    pub fn new(audio: Option<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gates: Mutex::default(),
            audio,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Let the call for `item_id` return, now or whenever it arrives.
    pub fn release(&self, item_id: &str) {
        self.gate(item_id).notify_one();
    }

    fn gate(&self, item_id: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .entry(item_id.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl ContentProvider for GatedProvider {
    async fn generate(&self, request: &GenerationRequest) -> BridgeResult<GeneratedContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate(&request.item_id);
        gate.notified().await;
        Ok(GeneratedContent {
            script: format!("Welcome to {}", request.item_id),
            audio_base64: self.audio.clone(),
        })
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// 3 seconds of silence at 24 kHz, base64 encoded.
pub fn three_second_payload() -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(vec![0u8; 24_000 * 2 * 3])
}

pub struct Rig {
    pub clock: Arc<ManualClock>,
    pub output: Arc<FakeOutput>,
    pub scheduler: Arc<ManualScheduler>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::default()),
            output: Arc::new(FakeOutput::new()),
            scheduler: Arc::new(ManualScheduler::default()),
        }
    }

    pub fn config(&self, provider: Arc<dyn ContentProvider>) -> CoreConfig {
        CoreConfig::builder()
            .audio_output(self.output.clone())
            .clock(self.clock.clone())
            .frame_scheduler(self.scheduler.clone())
            .content_provider(provider)
            .build()
            .expect("valid core config")
    }
}
