//! Single-voice renderer used by the native output callback.
//!
//! Holds at most one source. Each render call converts the source's frame
//! rate and channel layout to the device's, applies gain, and reports the
//! source once it runs out of frames.

use bridge_traits::{EndedCallback, SampleBuffer, SourceId, SourceRequest};

struct Voice {
    id: SourceId,
    buffer: SampleBuffer,
    /// Position in source frames.
    cursor: f64,
    /// Source frames consumed per device frame.
    step: f64,
    gain: f32,
    on_ended: Option<EndedCallback>,
}

/// Device-side mixing state shared with the audio thread.
pub(crate) struct Mixer {
    device_rate: u32,
    device_channels: u16,
    voice: Option<Voice>,
}

impl Mixer {
    pub(crate) fn new(device_rate: u32, device_channels: u16) -> Self {
        Self {
            device_rate: device_rate.max(1),
            device_channels: device_channels.max(1),
            voice: None,
        }
    }

    /// Replace the current voice. The replaced voice does not report ended.
    pub(crate) fn start(&mut self, request: SourceRequest, on_ended: EndedCallback) {
        let source_rate = request.buffer.sample_rate().max(1) as f64;
        self.voice = Some(Voice {
            id: request.id,
            cursor: request.buffer.frame_at(request.offset_secs) as f64,
            step: source_rate / self.device_rate as f64,
            gain: request.gain,
            buffer: request.buffer,
            on_ended: Some(on_ended),
        });
    }

    /// Drop the voice if it is `id`. Returns whether it was.
    pub(crate) fn stop(&mut self, id: SourceId) -> bool {
        match &self.voice {
            Some(voice) if voice.id == id => {
                self.voice = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_gain(&mut self, id: SourceId, gain: f32) -> bool {
        match &mut self.voice {
            Some(voice) if voice.id == id => {
                voice.gain = gain;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn live(&self) -> Option<SourceId> {
        self.voice.as_ref().map(|voice| voice.id)
    }

    /// Fill `out` (interleaved, device layout) and return the ended
    /// notification of a voice that ran out during this call. The caller
    /// invokes it after releasing the mixer.
    pub(crate) fn render<T>(
        &mut self,
        out: &mut [T],
        convert: impl Fn(f32) -> T,
    ) -> Option<(SourceId, EndedCallback)> {
        let device_channels = self.device_channels as usize;
        let Some(voice) = self.voice.as_mut() else {
            out.iter_mut().for_each(|s| *s = convert(0.0));
            return None;
        };

        let source_channels = voice.buffer.channels().max(1) as usize;
        let frames = voice.buffer.frames();
        let samples = voice.buffer.samples();
        let mut finished = false;

        for frame in out.chunks_mut(device_channels) {
            let index = voice.cursor as usize;
            if index >= frames {
                finished = true;
                frame.iter_mut().for_each(|s| *s = convert(0.0));
                continue;
            }
            let base = index * source_channels;
            for (channel, slot) in frame.iter_mut().enumerate() {
                let sample = samples[base + channel % source_channels];
                *slot = convert(sample * voice.gain);
            }
            voice.cursor += voice.step;
        }

        if !finished {
            return None;
        }
        let voice = self.voice.take()?;
        voice.on_ended.map(|callback| (voice.id, callback))
    }
}
