//! Platform-bound speech requests

use super::options::{Locale, SpeechOptions, RATE_FRACTION};
use log::debug;
use std::time::Duration;

/// Engine parameters realized from caller options
///
/// Rate and delays are fixed; only voice, pitch and volume come from the
/// caller. Pitch and volume stay in caller ranges, engines map them onto
/// their native ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub voice: Option<Locale>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub rate_fraction: f32,
    pub pre_delay: Duration,
    pub post_delay: Duration,
}

/// One utterance, built fresh per render call and consumed by one playback
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    text: String,
    params: EngineParams,
}

impl SpeechRequest {
    /// Build a request, resolving the requested locale against `voices`
    ///
    /// `fallback_language` is used when no locale was requested or the
    /// requested one is not installed. When neither resolves, the engine
    /// default voice is used.
    pub fn build(
        text: &str,
        options: &SpeechOptions,
        voices: &[Locale],
        fallback_language: Option<&str>,
    ) -> Self {
        let voice = resolve_voice(voices, options.locale.as_ref(), fallback_language);
        debug!(
            "Built speech request: {} chars, voice {:?}",
            text.len(),
            voice.as_ref().map(|v| v.id())
        );

        Self {
            text: text.to_string(),
            params: EngineParams {
                voice,
                pitch: options.pitch,
                volume: options.volume,
                rate_fraction: RATE_FRACTION,
                pre_delay: Duration::ZERO,
                post_delay: Duration::ZERO,
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }
}

/// Pick an installed voice for a request
///
/// Tries the requested locale (by id, then full tag, then language), then
/// the fallback language (by full tag, then language).
pub fn resolve_voice(
    voices: &[Locale],
    requested: Option<&Locale>,
    fallback_language: Option<&str>,
) -> Option<Locale> {
    if let Some(locale) = requested {
        if let Some(voice) = voices.iter().find(|v| v.id() == locale.id()) {
            return Some(voice.clone());
        }
        if let Some(voice) = find_by_tag(voices, &locale.tag()) {
            return Some(voice);
        }
        debug!("Requested voice {} not installed, falling back", locale);
    }

    fallback_language.and_then(|tag| find_by_tag(voices, tag))
}

fn find_by_tag(voices: &[Locale], tag: &str) -> Option<Locale> {
    let wanted = Locale::from_tag(tag);

    voices
        .iter()
        .find(|v| v.tag().eq_ignore_ascii_case(&wanted.tag()))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.language().eq_ignore_ascii_case(wanted.language()))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Locale> {
        vec![
            Locale::new("en", Some("GB".into()), "Daniel", "voice.en-GB.daniel"),
            Locale::new("en", Some("US".into()), "Samantha", "voice.en-US.samantha"),
            Locale::new("fr", Some("FR".into()), "Thomas", "voice.fr-FR.thomas"),
        ]
    }

    #[test]
    fn test_fixed_engine_parameters() {
        let request = SpeechRequest::build("Hello", &SpeechOptions::default(), &[], None);
        assert_eq!(request.text(), "Hello");
        assert_eq!(request.params().rate_fraction, RATE_FRACTION);
        assert_eq!(request.params().pre_delay, Duration::ZERO);
        assert_eq!(request.params().post_delay, Duration::ZERO);
        assert_eq!(request.params().voice, None);
    }

    #[test]
    fn test_pitch_and_volume_carried() {
        let options = SpeechOptions::new().with_pitch(1.5).with_volume(0.25);
        let request = SpeechRequest::build("Hello", &options, &voices(), None);
        assert_eq!(request.params().pitch, Some(1.5));
        assert_eq!(request.params().volume, Some(0.25));
    }

    #[test]
    fn test_resolve_by_id() {
        let wanted = Locale::new("en", Some("US".into()), "Samantha", "voice.en-US.samantha");
        let voice = resolve_voice(&voices(), Some(&wanted), None).unwrap();
        assert_eq!(voice.name(), "Samantha");
    }

    #[test]
    fn test_resolve_by_tag_then_language() {
        let voice = resolve_voice(&voices(), Some(&Locale::from_tag("en-US")), None).unwrap();
        assert_eq!(voice.name(), "Samantha");

        let voice = resolve_voice(&voices(), Some(&Locale::from_tag("fr-CA")), None).unwrap();
        assert_eq!(voice.name(), "Thomas");
    }

    #[test]
    fn test_resolve_falls_back_to_system_language() {
        let missing = Locale::from_tag("ja-JP");
        let voice = resolve_voice(&voices(), Some(&missing), Some("en-GB")).unwrap();
        assert_eq!(voice.name(), "Daniel");

        let voice = resolve_voice(&voices(), None, Some("fr")).unwrap();
        assert_eq!(voice.name(), "Thomas");
    }

    #[test]
    fn test_unresolved_uses_engine_default() {
        assert_eq!(resolve_voice(&voices(), None, None), None);
        assert_eq!(resolve_voice(&voices(), None, Some("ja")), None);
        assert_eq!(resolve_voice(&[], Some(&Locale::from_tag("en")), Some("en")), None);
    }
}
