//! Speech synthesis system

pub mod backends;
pub mod engine;
pub mod facade;
pub mod options;
pub mod renderer;
pub mod request;

pub use engine::{create_backend, BackendKind, FinishSignal, SpeechBackend, SynthesisEngine};
pub use facade::Speaker;
pub use options::{Locale, SpeechOptions};
pub use renderer::{RenderCall, RenderState, Renderer, SpeakOutcome};
pub use request::SpeechRequest;
