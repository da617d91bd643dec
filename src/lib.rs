//! speakgate - serialized single-flight text-to-speech
//!
//! Speaks one utterance at a time through the platform speech engine.
//! Concurrent callers queue behind a single gate, and any playback can be
//! cut short with a cancellation token.

pub mod config;
pub mod error;
pub mod platform;
pub mod speech;

pub use error::{Result, SpeakError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "speakgate";
