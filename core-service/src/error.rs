use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// The output needs a user gesture before anything can play.
    pub fn requires_user_gesture(&self) -> bool {
        matches!(self, CoreError::Playback(e) if e.requires_user_gesture())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
