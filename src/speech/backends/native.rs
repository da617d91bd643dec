//! Native TTS backend using the tts crate
//!
//! This backend uses the `tts` crate which provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - WinRT on Windows
//!
//! Every render call gets its own `Tts` instance. The instance, and the
//! utterance-end callback registered on it, are dropped together when the
//! call releases its engine.

use crate::speech::engine::{FinishSignal, SpeechBackend, SynthesisEngine};
use crate::speech::options::{normalize, scale_pitch, Locale};
use crate::speech::request::SpeechRequest;
use crate::{Result, SpeakError};
use log::{debug, error, warn};
use tts::{Features, Tts as TtsCrate, UtteranceId, Voice};

/// Backend handing out one `tts` instance per render call
pub struct NativeBackend {
    _private: (),
}

impl NativeBackend {
    /// Verify the platform speech service is reachable
    pub fn new() -> Result<Self> {
        debug!("Checking native TTS backend");
        let engine = NativeEngine::new()?;
        debug!(
            "Native TTS available, utterance callbacks: {}",
            engine.features.utterance_callbacks
        );
        Ok(Self { _private: () })
    }
}

impl SpeechBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn create_engine(&self) -> Result<Box<dyn SynthesisEngine>> {
        Ok(Box::new(NativeEngine::new()?))
    }

    fn voices(&self) -> Result<Vec<Locale>> {
        NativeEngine::new()?.voices()
    }
}

/// Native TTS engine for a single utterance
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// What the platform backend can do
    features: Features,

    /// Whether our utterance-end callback is registered
    listening: bool,
}

impl NativeEngine {
    pub fn new() -> Result<Self> {
        let tts = TtsCrate::default()
            .map_err(|e| SpeakError::Platform(format!("Failed to initialize TTS: {}", e)))?;
        let features = tts.supported_features();

        Ok(Self {
            tts,
            features,
            listening: false,
        })
    }

    /// Apply voice, pitch, volume and the fixed rate to the instance
    fn configure(&mut self, request: &SpeechRequest) -> Result<()> {
        let params = request.params();

        if let Some(locale) = &params.voice {
            if self.features.voice {
                match self.find_voice(locale)? {
                    Some(voice) => self
                        .tts
                        .set_voice(&voice)
                        .map_err(|e| SpeakError::Platform(format!("Failed to set voice: {}", e)))?,
                    None => warn!("Voice {} disappeared before playback", locale),
                }
            } else {
                warn!("Voice selection not supported on this platform");
            }
        }

        if let Some(pitch) = params.pitch {
            if self.features.pitch {
                let native = scale_pitch(
                    pitch,
                    self.tts.min_pitch(),
                    self.tts.normal_pitch(),
                    self.tts.max_pitch(),
                );
                self.tts
                    .set_pitch(native)
                    .map_err(|e| SpeakError::Platform(format!("Failed to set pitch: {}", e)))?;
            } else {
                warn!("Pitch control not supported on this platform");
            }
        }

        if let Some(volume) = params.volume {
            if self.features.volume {
                let native = normalize(self.tts.min_volume(), self.tts.max_volume(), volume);
                self.tts
                    .set_volume(native)
                    .map_err(|e| SpeakError::Platform(format!("Failed to set volume: {}", e)))?;
            } else {
                warn!("Volume control not supported on this platform");
            }
        }

        if self.features.rate {
            let native = normalize(
                self.tts.min_rate(),
                self.tts.max_rate(),
                params.rate_fraction,
            );
            self.tts
                .set_rate(native)
                .map_err(|e| SpeakError::Platform(format!("Failed to set rate: {}", e)))?;
        }

        Ok(())
    }

    fn find_voice(&self, locale: &Locale) -> Result<Option<Voice>> {
        let voices = self
            .tts
            .voices()
            .map_err(|e| SpeakError::Platform(format!("Failed to get voices: {}", e)))?;
        Ok(voices.into_iter().find(|v| v.id() == locale.id()))
    }
}

/// Refuse platforms that cannot tell us when an utterance ends
///
/// Without utterance callbacks or a speaking-state query, completion could
/// only be guessed and the engine would be dropped mid-utterance.
fn check_completion_support(utterance_callbacks: bool, is_speaking: bool) -> Result<()> {
    if utterance_callbacks || is_speaking {
        return Ok(());
    }
    Err(SpeakError::Platform(
        "Platform reports neither utterance end nor speaking state".to_string(),
    ))
}

fn voice_to_locale(voice: &Voice) -> Locale {
    let tag = Locale::from_tag(&voice.language().to_string());
    Locale::new(
        tag.language(),
        tag.country().map(str::to_string),
        voice.name(),
        voice.id(),
    )
}

impl SynthesisEngine for NativeEngine {
    fn voices(&self) -> Result<Vec<Locale>> {
        if !self.features.voice {
            return Ok(Vec::new());
        }

        let voices = self
            .tts
            .voices()
            .map_err(|e| SpeakError::Platform(format!("Failed to get voices: {}", e)))?;
        Ok(voices.iter().map(voice_to_locale).collect())
    }

    fn reports_completion(&self) -> bool {
        self.features.utterance_callbacks
    }

    fn play(&mut self, request: &SpeechRequest, signal: FinishSignal) -> Result<()> {
        check_completion_support(self.features.utterance_callbacks, self.features.is_speaking)?;
        self.configure(request)?;

        // This instance only ever plays one utterance, so any end event is ours
        if self.features.utterance_callbacks {
            self.tts
                .on_utterance_end(Some(Box::new(move |id: UtteranceId| {
                    debug!("Utterance {:?} ended", id);
                    signal.fire();
                })))
                .map_err(|e| {
                    SpeakError::Platform(format!("Failed to register utterance callback: {}", e))
                })?;
            self.listening = true;
        }

        debug!("Speaking: {}", request.text());
        let id = self.tts.speak(request.text(), true).map_err(|e| {
            error!("Failed to speak: {}", e);
            SpeakError::Platform(format!("Speak failed: {}", e))
        })?;
        debug!("Queued utterance {:?}", id);

        Ok(())
    }

    fn is_speaking(&self) -> Result<bool> {
        if !self.features.is_speaking {
            return Ok(false);
        }
        self.tts
            .is_speaking()
            .map_err(|e| SpeakError::Platform(format!("Failed to query speaking state: {}", e)))
    }

    fn stop(&mut self) -> Result<()> {
        if !self.features.stop {
            warn!("Stopping speech not supported on this platform");
            return Ok(());
        }

        debug!("Stopping speech");
        self.tts.stop().map_err(|e| {
            error!("Failed to stop speech: {}", e);
            SpeakError::Platform(format!("Stop failed: {}", e))
        })?;

        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        if !self.listening {
            return Ok(());
        }

        self.listening = false;
        self.tts
            .on_utterance_end(None)
            .map_err(|e| SpeakError::Platform(format!("Failed to clear utterance callback: {}", e)))
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!("Failed to detach native engine listener: {}", e);
        }
    }
}
