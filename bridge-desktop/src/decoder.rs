//! # Symphonia Media Decoder
//!
//! Decodes uploaded media (mp3, aac, flac, vorbis, wav, ...) fully into
//! memory as interleaved f32 samples.
//!
//! Decoding is CPU bound, so it runs on the blocking pool. Corrupt packets
//! are skipped; only a long run of consecutive failures aborts the decode.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    MediaDecoder, SampleBuffer,
};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

/// Consecutive bad packets tolerated before giving up.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// [`MediaDecoder`] backed by Symphonia's default codec registry.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaMediaDecoder {
    extension_hint: Option<String>,
}

impl SymphoniaMediaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with a file extension hint first (e.g. `"mp3"`). Container
    /// sniffing still applies when the hint is wrong.
    pub fn with_extension_hint(extension: impl Into<String>) -> Self {
        Self {
            extension_hint: Some(extension.into()),
        }
    }
}

#[async_trait]
impl MediaDecoder for SymphoniaMediaDecoder {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn decode(&self, data: Bytes) -> Result<SampleBuffer> {
        let hint = self.extension_hint.clone();
        tokio::task::spawn_blocking(move || decode_all(data, hint.as_deref()))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("decode task failed: {e}")))?
    }
}

/// Decode the whole payload synchronously.
pub fn decode_all(data: Bytes, extension: Option<&str>) -> Result<SampleBuffer> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let stream = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BridgeError::UnsupportedFormat(format!("probe failed: {e}")))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| BridgeError::UnsupportedFormat("no audio track".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    // Some codecs (AAC in MP4) only report channels after the first packet.
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BridgeError::UnsupportedFormat(format!("no decoder: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut scratch: Option<InterleavedBuffer<f32>> = None;
    let mut consecutive_errors = 0;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(BridgeError::OperationFailed(
                    "track list changed mid-stream".to_string(),
                ));
            }
            Err(e) => {
                return Err(BridgeError::OperationFailed(format!("read failed: {e}")));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                let spec = *decoded.spec();
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }
                let decoded_channels = spec.channels.count() as u16;
                if channels != decoded_channels {
                    debug!(from = channels, to = decoded_channels, "Channel count updated from decoded audio");
                    channels = decoded_channels;
                }

                let needed = decoded.capacity() * spec.channels.count();
                if scratch.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                    scratch = Some(InterleavedBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buffer) = scratch.as_mut() {
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
            }
            Err(err @ (SymphoniaError::DecodeError(_) | SymphoniaError::IoError(_))) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(BridgeError::OperationFailed(format!(
                        "{consecutive_errors} consecutive bad packets, last: {err}"
                    )));
                }
                warn!(attempt = consecutive_errors, error = %err, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(BridgeError::OperationFailed(format!("decode failed: {e}")));
            }
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(BridgeError::UnsupportedFormat(
            "stream did not report a sample rate or channel layout".to_string(),
        ));
    }

    debug!(
        samples = samples.len(),
        sample_rate, channels, "Upload decoded to interleaved samples"
    );
    Ok(SampleBuffer::interleaved(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PCM16 WAV file.
    fn wav(channels: u16, sample_rate: u32, frames: &[i16]) -> Bytes {
        let data_len = (frames.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in frames {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        Bytes::from(out)
    }

    #[test]
    fn decodes_stereo_wav() {
        let frames: Vec<i16> = (0..8000).flat_map(|_| [16_384i16, -16_384]).collect();
        let buffer = decode_all(wav(2, 8000, &frames), Some("wav")).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.frames(), 8000);
        assert_eq!(buffer.duration_secs(), 1.0);
        assert!((buffer.samples()[0] - 0.5).abs() < 1e-3);
        assert!((buffer.samples()[1] + 0.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn decodes_without_hint_on_blocking_pool() {
        let buffer = SymphoniaMediaDecoder::new()
            .decode(wav(1, 24_000, &[0; 2400]))
            .await
            .unwrap();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.duration_secs(), 0.1);
    }

    #[tokio::test]
    async fn garbage_is_unsupported() {
        let err = SymphoniaMediaDecoder::with_extension_hint("mp3")
            .decode(Bytes::from_static(b"definitely not audio"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
    }
}
