//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges into a running [`Player`].
//! Desktop apps typically enable the `desktop-shims` feature (defaults from
//! `bridge-desktop`, plus `native-audio` for cpal output), whereas
//! WebAssembly builds enable the `wasm` feature and rely on the bridges from
//! `bridge-wasm`. The content provider is always supplied by the host.

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{
    format_time, MediaItem, PlayOutcome, PlaybackStatus, PlaybackTrack, Player, PlayerConfig,
    SourceKind,
};
pub use core_runtime::config::{CoreConfig, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventStream, PlaybackEvent};

use std::sync::Arc;

use bridge_traits::ContentProvider;
use core_runtime::events::Receiver;
use tracing::info;

#[cfg(feature = "wasm")]
pub use bridge_wasm::WebBridgeConfig;
#[cfg(feature = "wasm")]
use bridge_wasm::{build_web_bridges, WebBridgeSet};

/// Elapsed and total labels for the current track, as `m:ss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLabels {
    pub elapsed: String,
    pub total: String,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    player: Player,
}

impl CoreService {
    /// Validate `config`, then build the player on top of it.
    pub fn new(config: CoreConfig, player_config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        let player = Player::new(&config, player_config)?;
        info!(
            uploads = config.features.enable_uploads,
            "Core service ready"
        );
        Ok(Self {
            config: Arc::new(config),
            player,
        })
    }

    /// Configuration the service was built from.
    pub fn config(&self) -> Arc<CoreConfig> {
        Arc::clone(&self.config)
    }

    /// Direct access to the player for operations not mirrored here.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Play, pause, or resume `item` depending on what is current.
    pub async fn play(&self, item: &MediaItem) -> Result<PlayOutcome> {
        Ok(self.player.request_play(item).await?)
    }

    pub fn pause(&self) -> bool {
        self.player.pause()
    }

    pub fn resume(&self) -> Result<bool> {
        Ok(self.player.resume()?)
    }

    pub fn stop(&self) -> bool {
        self.player.stop()
    }

    pub fn set_volume(&self, level: f32) -> f32 {
        self.player.set_volume(level)
    }

    pub fn toggle_mute(&self) -> f32 {
        self.player.toggle_mute()
    }

    /// Call from a user gesture after a play request failed with a
    /// suspended output.
    pub async fn unlock_audio(&self) -> Result<()> {
        Ok(self.player.resume_output().await?)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.player.status()
    }

    pub fn current_track(&self) -> Option<PlaybackTrack> {
        self.player.current_track()
    }

    pub fn progress_fraction(&self) -> f64 {
        self.player.progress_fraction()
    }

    pub fn progress_labels(&self) -> ProgressLabels {
        let total = self
            .player
            .current_track()
            .map(|track| track.duration_secs)
            .unwrap_or(0.0);
        ProgressLabels {
            elapsed: format_time(self.player.position()),
            total: format_time(total),
        }
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.player.subscribe()
    }
}

/// Build a service on the desktop defaults from `bridge-desktop`.
///
/// Must run inside a tokio runtime; the frame scheduler binds to it.
/// Without the `native-audio` feature an `audio_output` has to be injected
/// through [`CoreConfig::builder`] instead.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    provider: Arc<dyn ContentProvider>,
    enable_uploads: bool,
    player_config: PlayerConfig,
) -> Result<CoreService> {
    let config = CoreConfig::builder()
        .content_provider(provider)
        .enable_uploads(enable_uploads)
        .build()?;
    CoreService::new(config, player_config)
}

/// Convenience bootstrapper for WebAssembly hosts.
///
/// ```
/// # #[cfg(feature = "wasm")]
/// # fn example(provider: std::sync::Arc<dyn bridge_traits::ContentProvider>) -> core_service::Result<()> {
/// use core_service::{bootstrap_wasm, PlayerConfig, WebBridgeConfig};
///
/// let core = bootstrap_wasm(provider, WebBridgeConfig::new(), PlayerConfig::default())?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "wasm")]
pub fn bootstrap_wasm(
    provider: Arc<dyn ContentProvider>,
    bridges: WebBridgeConfig,
    player_config: PlayerConfig,
) -> Result<CoreService> {
    let enable_uploads = bridges.enable_uploads;
    let set = build_web_bridges(bridges)
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    let config = core_config_from(set, provider, enable_uploads)?;
    CoreService::new(config, player_config)
}

#[cfg(feature = "wasm")]
fn core_config_from(
    set: WebBridgeSet,
    provider: Arc<dyn ContentProvider>,
    enable_uploads: bool,
) -> Result<CoreConfig> {
    let mut builder = CoreConfig::builder()
        .audio_output(set.audio_output)
        .clock(set.clock)
        .frame_scheduler(set.frame_scheduler)
        .content_provider(provider)
        .enable_uploads(enable_uploads);
    if let Some(fetcher) = set.media_fetcher {
        builder = builder.media_fetcher(fetcher);
    }
    if let Some(decoder) = set.media_decoder {
        builder = builder.media_decoder(decoder);
    }
    Ok(builder.build()?)
}
