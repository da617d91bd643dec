//! Speech backends

// Native TTS backend using the tts crate (cross-platform)
pub mod native;

// Silent word-timed backend for headless runs and tests
pub mod simulated;

pub use native::{NativeBackend, NativeEngine};
pub use simulated::{SimulatedBackend, SimulatedEngine, SimulatedStats};
