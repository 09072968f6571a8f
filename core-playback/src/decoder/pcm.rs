use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use bridge_traits::SampleBuffer;
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};

/// Sample rate of generated speech payloads.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

/// Divisor mapping i16 onto `[-1.0, 1.0)`.
const I16_SCALE: f32 = 32_768.0;

/// Standard alphabet, padding optional, non-zero trailing bits tolerated.
/// Matches what browsers accept in `atob`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoder for base64 raw PCM16 LE mono payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmDecoder {
    sample_rate: u32,
}

impl Default for PcmDecoder {
    fn default() -> Self {
        Self::new(PCM_SAMPLE_RATE)
    }
}

impl PcmDecoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode a base64 payload.
    ///
    /// ASCII whitespace (line wrapping) is ignored. An empty payload yields
    /// an empty buffer.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Decode`] when the text is not valid base64.
    pub fn decode(&self, payload: &str) -> Result<SampleBuffer> {
        let compact = strip_whitespace(payload);
        let bytes = LENIENT_BASE64
            .decode(compact.as_bytes())
            .map_err(|e| PlaybackError::Decode(format!("invalid base64 payload: {e}")))?;

        let buffer = self.decode_bytes(&bytes);
        debug!(
            bytes = bytes.len(),
            samples = buffer.len(),
            duration_secs = buffer.duration_secs(),
            "Decoded PCM payload"
        );
        Ok(buffer)
    }

    /// Interpret already-decoded bytes as PCM16 LE mono.
    pub fn decode_bytes(&self, bytes: &[u8]) -> SampleBuffer {
        if bytes.len() % 2 != 0 {
            warn!(bytes = bytes.len(), "Dropping trailing odd byte from PCM payload");
        }
        SampleBuffer::mono(pcm16le_to_f32(bytes), self.sample_rate)
    }
}

/// Convert PCM16 LE bytes to normalized floats. A trailing odd byte is ignored.
pub fn pcm16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / I16_SCALE)
        .collect()
}

fn strip_whitespace(payload: &str) -> Cow<'_, str> {
    if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(
            payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        )
    } else {
        Cow::Borrowed(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn encode_samples(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    #[test]
    fn four_zero_bytes_give_two_silent_samples() {
        let buffer = PcmDecoder::default().decode("AAAAAA==").unwrap();
        assert_eq!(buffer.samples(), &[0.0, 0.0]);
        assert_eq!(buffer.sample_rate(), PCM_SAMPLE_RATE);
        assert_eq!(buffer.channels(), 1);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        // "AAAA" is three zero bytes.
        let buffer = PcmDecoder::default().decode("AAAA").unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.samples()[0], 0.0);
    }

    #[test]
    fn empty_payload_is_empty_buffer() {
        let buffer = PcmDecoder::default().decode("").unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_secs(), 0.0);
    }

    #[test]
    fn samples_are_normalized_little_endian() {
        let payload = encode_samples(&[i16::MIN, -16_384, 0, 16_384, i16::MAX]);
        let buffer = PcmDecoder::default().decode(&payload).unwrap();

        let samples = buffer.samples();
        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], -0.5);
        assert_eq!(samples[2], 0.0);
        assert_eq!(samples[3], 0.5);
        assert!(samples[4] < 1.0 && samples[4] > 0.9999);
    }

    #[test]
    fn every_sample_stays_in_range() {
        let raw: Vec<i16> = (i16::MIN..=i16::MAX).step_by(97).collect();
        let buffer = PcmDecoder::default().decode(&encode_samples(&raw)).unwrap();

        assert_eq!(buffer.len(), raw.len());
        assert!(buffer.samples().iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn whitespace_and_missing_padding_are_tolerated() {
        let padded = encode_samples(&[1000, -1000]);
        assert!(padded.ends_with("=="));
        let unpadded = padded.trim_end_matches('=');
        let wrapped = format!("{}\n{}\r\n", &unpadded[..4], &unpadded[4..]);

        let reference = PcmDecoder::default().decode(&padded).unwrap();
        assert_eq!(PcmDecoder::default().decode(unpadded).unwrap(), reference);
        assert_eq!(PcmDecoder::default().decode(&wrapped).unwrap(), reference);
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let err = PcmDecoder::default().decode("not*base64!").unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }

    #[test]
    fn duration_follows_configured_rate() {
        let payload = STANDARD.encode(vec![0u8; 48_000 * 2]);
        let default = PcmDecoder::default().decode(&payload).unwrap();
        assert!((default.duration_secs() - 2.0).abs() < 1e-9);

        let custom = PcmDecoder::new(48_000).decode(&payload).unwrap();
        assert!((custom.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn raw_conversion_ignores_odd_byte() {
        assert_eq!(pcm16le_to_f32(&[0x00, 0x40, 0xff]), vec![0.5]);
        assert!(pcm16le_to_f32(&[]).is_empty());
    }
}
