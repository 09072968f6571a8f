//! # Playback Error Types
//!
//! Error taxonomy for decoding, content acquisition and output control.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Message shown to the user for any failed play request.
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Failed to play content. Please check API Key or file format.";

/// Message shown when the environment blocks audio until a user gesture.
pub const OUTPUT_SUSPENDED_MESSAGE: &str = "Audio is blocked until you interact with the page. Tap play again to start.";

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Content Errors
    // ========================================================================
    /// Payload could not be decoded into samples.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The provider or fetcher answered without any audio.
    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    /// Generation or network failure reported by the provider.
    #[error("Content provider failed: {0}")]
    Provider(String),

    // ========================================================================
    // Output Errors
    // ========================================================================
    /// The output context is suspended and needs a user gesture to resume.
    #[error("Audio output is suspended")]
    OutputSuspended,

    /// The output failed to start, stop or re-gain a source.
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    // ========================================================================
    // Plumbing
    // ========================================================================
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` when repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Provider(_)
                | PlaybackError::OutputSuspended
                | PlaybackError::Bridge(BridgeError::Io(_))
        )
    }

    /// Returns `true` when the host must resume the output from a user
    /// gesture before retrying.
    pub fn requires_user_gesture(&self) -> bool {
        matches!(
            self,
            PlaybackError::OutputSuspended | PlaybackError::Bridge(BridgeError::OutputSuspended)
        )
    }

    /// Message suitable for display. Details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        if self.requires_user_gesture() {
            OUTPUT_SUSPENDED_MESSAGE
        } else {
            DEFAULT_FAILURE_MESSAGE
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_output_needs_a_gesture() {
        assert!(PlaybackError::OutputSuspended.requires_user_gesture());
        assert!(PlaybackError::Bridge(BridgeError::OutputSuspended).requires_user_gesture());
        assert!(!PlaybackError::Decode("bad".into()).requires_user_gesture());
        assert_eq!(
            PlaybackError::OutputSuspended.user_message(),
            OUTPUT_SUSPENDED_MESSAGE
        );
    }

    #[test]
    fn content_failures_share_one_user_message() {
        for err in [
            PlaybackError::Decode("bad base64".into()),
            PlaybackError::ContentUnavailable("no audio".into()),
            PlaybackError::Provider("quota".into()),
        ] {
            assert_eq!(err.user_message(), DEFAULT_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn transient_classification() {
        assert!(PlaybackError::Provider("timeout".into()).is_transient());
        assert!(!PlaybackError::Decode("bad".into()).is_transient());
        assert!(!PlaybackError::ContentUnavailable("none".into()).is_transient());
    }

    #[test]
    fn bridge_errors_convert() {
        let err: PlaybackError = BridgeError::OperationFailed("boom".into()).into();
        assert!(matches!(err, PlaybackError::Bridge(_)));
        assert!(err.to_string().contains("boom"));
    }
}
