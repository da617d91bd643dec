//! Per-request speech options and the voice locale type

use crate::{Result, SpeakError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PITCH_MIN: f32 = 0.0;
pub const PITCH_DEFAULT: f32 = 1.0;
pub const PITCH_MAX: f32 = 2.0;

pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;

/// Fixed playback rate, as a fraction of the engine's rate range
pub const RATE_FRACTION: f32 = 0.55;

/// An installed voice
///
/// Produced by voice enumeration. Callers pick one and pass it back in
/// [`SpeechOptions`]; the renderer matches it against the engine's voices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    language: String,
    country: Option<String>,
    name: String,
    id: String,
}

impl Locale {
    pub fn new(
        language: impl Into<String>,
        country: Option<String>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            country,
            name: name.into(),
            id: id.into(),
        }
    }

    /// Build a locale from a language tag such as `en-US` or `pt_BR`
    ///
    /// The tag doubles as name and id; useful when a caller only knows the
    /// language it wants.
    pub fn from_tag(tag: &str) -> Self {
        let mut parts = tag.split(|c| c == '-' || c == '_');
        let language = parts.next().unwrap_or_default().to_lowercase();
        let country = parts
            .next()
            .filter(|c| !c.is_empty())
            .map(|c| c.to_uppercase());
        Self {
            language,
            country,
            name: tag.to_string(),
            id: tag.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform-specific voice identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Language tag, `language` or `language-COUNTRY`
    pub fn tag(&self) -> String {
        match &self.country {
            Some(country) => format!("{}-{}", self.language, country),
            None => self.language.clone(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.tag())
    }
}

/// Caller-supplied configuration for one speak request
///
/// Absent fields mean "use the platform default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechOptions {
    pub locale: Option<Locale>,
    /// Pitch multiplier in `[PITCH_MIN, PITCH_MAX]`, 1.0 is normal
    pub pitch: Option<f32>,
    /// Volume in `[VOLUME_MIN, VOLUME_MAX]`
    pub volume: Option<f32>,
}

impl SpeechOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Check pitch and volume against their declared ranges
    ///
    /// NaN is out of every range.
    pub fn validate(&self) -> Result<()> {
        if let Some(volume) = self.volume {
            if !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
                return Err(SpeakError::InvalidInput(format!(
                    "Volume must be >= {} and <= {} (got {})",
                    VOLUME_MIN, VOLUME_MAX, volume
                )));
            }
        }

        if let Some(pitch) = self.pitch {
            if !(PITCH_MIN..=PITCH_MAX).contains(&pitch) {
                return Err(SpeakError::InvalidInput(format!(
                    "Pitch must be >= {} and <= {} (got {})",
                    PITCH_MIN, PITCH_MAX, pitch
                )));
            }
        }

        Ok(())
    }
}

/// Reject text that cannot be spoken
pub fn validate_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(SpeakError::InvalidInput(
            "Text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Map a fraction in `[0, 1]` onto `[min, max]`
pub fn normalize(min: f32, max: f32, fraction: f32) -> f32 {
    min + (max - min) * fraction
}

/// Map a caller pitch onto an engine's native pitch range
///
/// Caller pitch is piecewise linear around [`PITCH_DEFAULT`] so that 1.0
/// always lands on the engine's normal pitch, whatever its range.
pub fn scale_pitch(pitch: f32, min: f32, normal: f32, max: f32) -> f32 {
    if pitch <= PITCH_DEFAULT {
        normalize(min, normal, (pitch - PITCH_MIN) / (PITCH_DEFAULT - PITCH_MIN))
    } else {
        normalize(normal, max, (pitch - PITCH_DEFAULT) / (PITCH_MAX - PITCH_DEFAULT))
    }
}
