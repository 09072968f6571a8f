//! # Player Configuration
//!
//! Tunables for the playback core. Hosts usually deserialize this from their
//! settings file; every field has a default.

use crate::decoder::PCM_SAMPLE_RATE;
use crate::error::{PlaybackError, Result, DEFAULT_FAILURE_MESSAGE};
use serde::{Deserialize, Serialize};

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Sample rate of generated PCM payloads. The payload carries no header,
    /// so this is a contract with the content provider.
    ///
    /// Default: 24000.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Volume at construction, `0.0..=1.0`.
    ///
    /// Default: 0.8.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Volume restored by `toggle_mute` when no audible level was set before
    /// muting.
    ///
    /// Default: 0.8.
    #[serde(default = "default_unmute_volume")]
    pub unmute_volume: f32,

    /// Voice used for generated items that do not name one.
    ///
    /// Default: "Puck".
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Message recorded on failed play requests.
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            initial_volume: default_initial_volume(),
            unmute_volume: default_unmute_volume(),
            default_voice: default_voice(),
            failure_message: default_failure_message(),
        }
    }
}

impl PlayerConfig {
    pub fn with_default_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    pub fn with_initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PlaybackError::InvalidConfig(
                "sample_rate must be > 0".to_string(),
            ));
        }

        for (name, value) in [
            ("initial_volume", self.initial_volume),
            ("unmute_volume", self.unmute_volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if self.unmute_volume == 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "unmute_volume must be audible".to_string(),
            ));
        }

        if self.default_voice.trim().is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "default_voice cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_sample_rate() -> u32 {
    PCM_SAMPLE_RATE
}

fn default_initial_volume() -> f32 {
    0.8
}

fn default_unmute_volume() -> f32 {
    0.8
}

fn default_voice() -> String {
    "Puck".to_string()
}

fn default_failure_message() -> String {
    DEFAULT_FAILURE_MESSAGE.to_string()
}
