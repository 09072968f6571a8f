//! # cpal Audio Output
//!
//! [`AudioOutput`] on the default output device.
//!
//! `cpal::Stream` cannot move between threads, so a dedicated thread opens
//! the stream, keeps it alive, and drops it on shutdown. Everything else
//! talks to the audio callback through the shared [`Mixer`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    AudioOutput, EndedCallback, OutputState, SourceId, SourceRequest,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, error, info};

use crate::mixer::Mixer;

/// Output on the host's default device.
pub struct CpalAudioOutput {
    mixer: Arc<Mutex<Mixer>>,
    failed: Arc<AtomicBool>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    sample_rate: u32,
    channels: u16,
}

impl CpalAudioOutput {
    /// Open the default output device and start its stream.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotAvailable`] when there is no usable output device.
    pub fn new() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let failed = Arc::new(AtomicBool::new(false));
        let thread_failed = failed.clone();

        thread::Builder::new()
            .name("ncor-audio-output".to_string())
            .spawn(move || match open_stream(thread_failed) {
                Ok((stream, mixer, rate, channels)) => {
                    if ready_tx.send(Ok((mixer, rate, channels))).is_err() {
                        return;
                    }
                    // Blocks until shutdown is sent or the sender is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    debug!("Audio output stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let (mixer, sample_rate, channels) = ready_rx.recv().map_err(|_| {
            BridgeError::NotAvailable("audio output thread exited".to_string())
        })??;

        info!(sample_rate, channels, "Audio output opened");
        Ok(Self {
            mixer,
            failed,
            shutdown: Mutex::new(Some(shutdown_tx)),
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

type Opened = (Stream, Arc<Mutex<Mixer>>, u32, u16);

fn open_stream(failed: Arc<AtomicBool>) -> Result<Opened> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| BridgeError::NotAvailable("no output device".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| BridgeError::NotAvailable(format!("output config: {e}")))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, channels)));
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer.clone(), failed)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer.clone(), failed)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer.clone(), failed)?,
        format => {
            return Err(BridgeError::UnsupportedFormat(format!(
                "device sample format {format:?}"
            )))
        }
    };
    stream
        .play()
        .map_err(|e| BridgeError::OperationFailed(format!("failed to start stream: {e}")))?;

    Ok((stream, mixer, sample_rate, channels))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
    failed: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let ended = mixer.lock().render(data, |sample: f32| T::from_sample(sample));
                if let Some((id, on_ended)) = ended {
                    on_ended(id);
                }
            },
            move |err| {
                error!(error = %err, "Audio output stream error");
                failed.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| BridgeError::OperationFailed(format!("failed to build stream: {e}")))
}

#[async_trait]
impl AudioOutput for CpalAudioOutput {
    fn state(&self) -> OutputState {
        if self.failed.load(Ordering::SeqCst) || self.shutdown.lock().is_none() {
            OutputState::Closed
        } else {
            OutputState::Running
        }
    }

    /// Desktop output is never held back by a gesture policy.
    async fn resume(&self) -> Result<()> {
        match self.state() {
            OutputState::Closed => Err(BridgeError::NotAvailable(
                "audio output stream is closed".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn start(&self, request: SourceRequest, on_ended: EndedCallback) -> Result<()> {
        if self.state() == OutputState::Closed {
            return Err(BridgeError::NotAvailable(
                "audio output stream is closed".to_string(),
            ));
        }
        debug!(id = %request.id, offset = request.offset_secs, "Starting source");
        self.mixer.lock().start(request, on_ended);
        Ok(())
    }

    fn stop(&self, source: SourceId) -> Result<()> {
        self.mixer.lock().stop(source);
        Ok(())
    }

    fn set_gain(&self, source: SourceId, gain: f32) -> Result<()> {
        self.mixer.lock().set_gain(source, gain.clamp(0.0, 1.0));
        Ok(())
    }
}

impl Drop for CpalAudioOutput {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for CpalAudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalAudioOutput")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("live", &self.mixer.lock().live())
            .finish()
    }
}
