//! Speech facade
//!
//! Validates requests and serializes them through a single-slot gate, so at
//! most one playback is in flight per [`Speaker`]. Waiters are served in
//! arrival order.

use super::engine::{create_backend, SpeechBackend};
use super::options::{validate_text, Locale, SpeechOptions};
use super::renderer::{Renderer, SpeakOutcome};
use crate::config::Config;
use crate::{Result, SpeakError};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Entry point for speaking text
pub struct Speaker {
    renderer: Renderer,
    /// Capacity one; a permit is held for the whole render, cleanup included
    gate: Semaphore,
}

impl Speaker {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            gate: Semaphore::new(1),
        }
    }

    /// Speaker over the backend and settings named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = create_backend(config)?;
        let fallback = config
            .default_language()
            .or_else(crate::platform::system_language);
        info!(
            "Speaker using {} backend, fallback language {:?}",
            backend.name(),
            fallback
        );

        let renderer = Renderer::new(backend)
            .with_poll_interval(config.poll_interval())
            .with_fallback_language(fallback);
        Ok(Self::new(renderer))
    }

    pub fn backend(&self) -> &Arc<dyn SpeechBackend> {
        self.renderer.backend()
    }

    /// Whether a playback currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Speak `text`, waiting for any playback in flight to finish first
    ///
    /// Invalid input is rejected before the gate and before any engine is
    /// created. A cancellation that fires while waiting for the gate resolves
    /// as [`SpeakOutcome::Cancelled`] without reaching the platform.
    pub async fn speak(
        &self,
        text: &str,
        options: &SpeechOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<SpeakOutcome> {
        validate_text(text)?;
        options.validate()?;

        let never = CancellationToken::new();
        let cancel = cancel.unwrap_or(&never);

        let _permit = tokio::select! {
            permit = self.gate.acquire() => permit
                .map_err(|e| SpeakError::Other(format!("Speech gate closed: {}", e)))?,
            _ = cancel.cancelled() => {
                debug!("Cancelled while waiting for the speech gate");
                return Ok(SpeakOutcome::Cancelled);
            }
        };

        self.renderer.render(text, options, cancel).await
    }

    /// Speak `text` with default options
    pub async fn speak_text(
        &self,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<SpeakOutcome> {
        self.speak(text, &SpeechOptions::default(), cancel).await
    }

    /// Voices currently installed on the platform
    pub fn list_voices(&self) -> Result<Vec<Locale>> {
        self.renderer.backend().voices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::backends::simulated::SimulatedBackend;
    use std::time::Duration;

    fn speaker(word_ms: u64) -> (Speaker, Arc<crate::speech::backends::simulated::SimulatedStats>) {
        let backend = SimulatedBackend::new(Duration::from_millis(word_ms));
        let stats = backend.stats();
        let renderer = Renderer::new(Arc::new(backend)).with_fallback_language(None);
        (Speaker::new(renderer), stats)
    }

    #[tokio::test]
    async fn test_speak_hello() {
        let (speaker, stats) = speaker(5);
        let outcome = speaker.speak_text("Hello", None).await.unwrap();

        assert_eq!(outcome, SpeakOutcome::Finished);
        assert_eq!(stats.utterances(), vec!["Hello".to_string()]);
        assert!(!speaker.is_busy());
    }

    #[tokio::test]
    async fn test_empty_text_never_reaches_platform() {
        let (speaker, stats) = speaker(5);
        let err = speaker.speak_text("", None).await.unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(stats.created(), 0);
        assert!(!speaker.is_busy());
    }

    #[tokio::test]
    async fn test_out_of_range_pitch_never_reaches_platform() {
        let (speaker, stats) = speaker(5);
        let options = SpeechOptions::new().with_pitch(3.0);
        let err = speaker.speak("Test", &options, None).await.unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(stats.created(), 0);
    }

    #[tokio::test]
    async fn test_gate_released_after_cancel() {
        let (speaker, stats) = speaker(20);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = speaker.speak_text("Hello", Some(&cancel)).await.unwrap();
        assert_eq!(outcome, SpeakOutcome::Cancelled);
        assert!(!speaker.is_busy());

        let outcome = speaker.speak_text("Again", None).await.unwrap();
        assert_eq!(outcome, SpeakOutcome::Finished);
        assert_eq!(stats.utterances(), vec!["Again".to_string()]);
    }

    #[test]
    fn test_list_voices() {
        let (speaker, _) = speaker(5);
        let voices = speaker.list_voices().unwrap();
        assert!(voices.iter().any(|v| v.tag() == "en-US"));
    }
}
