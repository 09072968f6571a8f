//! Browser clocks.

use bridge_traits::{error::Result as BridgeResult, MonotonicClock};
use web_sys::{AudioContext, Performance};

use crate::error::{window, WasmError};
use crate::output::WebAudioOutput;

/// Timeline of the audio context that plays the sources.
///
/// Elapsed playback follows the hardware clock exactly, including while the
/// context is suspended (the clock stops too).
#[derive(Clone)]
pub struct AudioContextClock {
    context: AudioContext,
}

impl AudioContextClock {
    pub fn new(output: &WebAudioOutput) -> Self {
        Self {
            context: output.context().clone(),
        }
    }

    pub fn from_context(context: AudioContext) -> Self {
        Self { context }
    }
}

impl MonotonicClock for AudioContextClock {
    fn now_secs(&self) -> f64 {
        self.context.current_time()
    }
}

/// `performance.now()` in seconds, for hosts without a shared context.
#[derive(Clone)]
pub struct PerformanceClock {
    performance: Performance,
}

impl PerformanceClock {
    pub fn new() -> BridgeResult<Self> {
        let performance = window()?
            .performance()
            .ok_or_else(|| WasmError::Unavailable("performance".to_string()))?;
        Ok(Self { performance })
    }
}

impl MonotonicClock for PerformanceClock {
    fn now_secs(&self) -> f64 {
        self.performance.now() / 1000.0
    }
}
