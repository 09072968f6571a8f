//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback crates:
//! - Logging and tracing setup
//! - Bridge configuration with fail-fast validation
//! - Broadcast event bus for playback and content lifecycle events
//!
//! ## Overview
//!
//! Nothing in here knows how audio is decoded or played. It wires host
//! capabilities together and gives every other crate one place to log to
//! and one bus to publish on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
