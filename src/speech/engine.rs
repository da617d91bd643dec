//! Synthesis engine abstraction
//!
//! A [`SpeechBackend`] enumerates voices and hands out engines. Each render
//! call gets its own [`SynthesisEngine`], plays exactly one request on it and
//! releases it when done; engines are never shared between calls.

use super::options::Locale;
use super::request::SpeechRequest;
use crate::config::Config;
use crate::{Result, SpeakError};
use log::info;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Single-resolution completion signal for one render call
///
/// Engines hold clones of this as their "utterance finished" listener. The
/// first [`fire`](FinishSignal::fire) wins; later fires, and any fire after
/// [`disarm`](FinishSignal::disarm), are no-ops.
#[derive(Debug, Clone)]
pub struct FinishSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl FinishSignal {
    /// Create a signal and the receiver the render call awaits
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let signal = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (signal, rx)
    }

    /// Resolve the render call. Returns false if already resolved or disarmed.
    pub fn fire(&self) -> bool {
        match self.lock().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Drop the sender so stale listeners can no longer resolve anything
    pub fn disarm(&self) {
        self.lock().take();
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Number of live listener handles, including this one
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.slot)
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        // Fired from platform threads; a panicking listener must not wedge it
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A synthesis engine owned by a single render call
///
/// Dropping the engine releases its platform resources.
pub trait SynthesisEngine: Send + Sync {
    /// Voices this engine can speak with
    fn voices(&self) -> Result<Vec<Locale>>;

    /// Whether the engine fires its finish listener on its own.
    /// When false the renderer polls [`is_speaking`](Self::is_speaking).
    fn reports_completion(&self) -> bool;

    /// Register `signal` as the finish listener and start playback
    fn play(&mut self, request: &SpeechRequest, signal: FinishSignal) -> Result<()>;

    fn is_speaking(&self) -> Result<bool>;

    /// Stop playback at the nearest word boundary the platform honors
    fn stop(&mut self) -> Result<()>;

    /// Unregister the finish listener
    fn detach(&mut self) -> Result<()>;
}

/// Source of engines and the installed voice catalog
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a fresh engine for one render call
    fn create_engine(&self) -> Result<Box<dyn SynthesisEngine>>;

    /// Currently installed voices
    fn voices(&self) -> Result<Vec<Locale>>;
}

/// Which backend to speak through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Platform speech via the `tts` crate
    Native,
    /// Silent, word-timed engine for headless runs
    Simulated,
}

impl FromStr for BackendKind {
    type Err = SpeakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "simulated" => Ok(BackendKind::Simulated),
            other => Err(SpeakError::Config(format!(
                "Unknown speech backend '{}' (expected 'native' or 'simulated')",
                other
            ))),
        }
    }
}

/// Create the backend selected by configuration
pub fn create_backend(config: &Config) -> Result<Arc<dyn SpeechBackend>> {
    use super::backends::native::NativeBackend;
    use super::backends::simulated::SimulatedBackend;

    let kind = config.backend()?;
    info!("Creating {:?} speech backend", kind);

    match kind {
        BackendKind::Native => Ok(Arc::new(NativeBackend::new()?)),
        BackendKind::Simulated => Ok(Arc::new(SimulatedBackend::new(
            config.simulated_word_time(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_fires_once() {
        let (signal, mut rx) = FinishSignal::channel();
        let listener = signal.clone();

        assert!(listener.fire());
        assert!(!listener.fire());
        assert!(!signal.fire());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_disarmed_signal_is_inert() {
        let (signal, mut rx) = FinishSignal::channel();
        let listener = signal.clone();

        signal.disarm();
        assert!(!signal.is_armed());
        assert!(!listener.fire());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_holders() {
        let (signal, _rx) = FinishSignal::channel();
        assert_eq!(signal.holders(), 1);
        let listener = signal.clone();
        assert_eq!(signal.holders(), 2);
        drop(listener);
        assert_eq!(signal.holders(), 1);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("native".parse::<BackendKind>().unwrap(), BackendKind::Native);
        assert_eq!(" Simulated ".parse::<BackendKind>().unwrap(), BackendKind::Simulated);
        assert!("espeak".parse::<BackendKind>().is_err());
    }
}
