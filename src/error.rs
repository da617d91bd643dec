//! Error types for speakgate

use thiserror::Error;

/// Main error type for speakgate
///
/// Cancellation is deliberately absent: a cancelled playback is a normal
/// outcome and is reported through [`crate::speech::SpeakOutcome`].
#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Speech platform error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

impl SpeakError {
    /// True for errors raised by input validation, before any platform call
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SpeakError::InvalidInput(_))
    }

    /// True for errors raised by the speech engine itself
    pub fn is_platform(&self) -> bool {
        matches!(self, SpeakError::Platform(_))
    }
}

/// Result type alias for speakgate operations
pub type Result<T> = std::result::Result<T, SpeakError>;

impl From<String> for SpeakError {
    fn from(s: String) -> Self {
        SpeakError::Other(s)
    }
}

impl From<&str> for SpeakError {
    fn from(s: &str) -> Self {
        SpeakError::Other(s.to_string())
    }
}

impl From<tts::Error> for SpeakError {
    fn from(e: tts::Error) -> Self {
        SpeakError::Platform(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SpeakError::InvalidInput("empty".into()).is_invalid_input());
        assert!(!SpeakError::InvalidInput("empty".into()).is_platform());
        assert!(SpeakError::Platform("gone".into()).is_platform());
        assert!(!SpeakError::from("other").is_invalid_input());
    }

    #[test]
    fn test_display() {
        let e = SpeakError::InvalidInput("Text cannot be empty".into());
        assert_eq!(e.to_string(), "Invalid input: Text cannot be empty");
    }
}
