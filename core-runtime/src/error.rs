use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors raised while configuring and bootstrapping the runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Default bridge failed to initialize: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn missing(capability: &str, message: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
