//! Speech processing errors

use thiserror::Error;

/// Errors reported by platform speech engines and their wrappers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    /// The platform does not offer this capability at all
    #[error("Not supported on this platform: {0}")]
    Unsupported(String),

    /// The engine is already running (platforms throw on a second start)
    #[error("Engine already started")]
    AlreadyStarted,

    /// Engine refused to start
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// Microphone could not be acquired
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Platform did not answer in time
    #[error("Speech operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SpeechError {
    /// Whether this error means the capability will never work here
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_error_message() {
        let err = SpeechError::Unsupported("webkitSpeechRecognition".to_string());
        assert_eq!(
            err.to_string(),
            "Not supported on this platform: webkitSpeechRecognition"
        );
    }

    #[test]
    fn already_started_error_message() {
        assert_eq!(SpeechError::AlreadyStarted.to_string(), "Engine already started");
    }

    #[test]
    fn microphone_error_message() {
        let err = SpeechError::MicrophoneUnavailable("permission denied".to_string());
        assert_eq!(err.to_string(), "Microphone unavailable: permission denied");
    }

    #[test]
    fn timeout_error_message() {
        let err = SpeechError::Timeout(4000);
        assert_eq!(err.to_string(), "Speech operation timed out after 4000ms");
    }

    #[test]
    fn permanence() {
        assert!(SpeechError::Unsupported("vad".to_string()).is_permanent());
        assert!(!SpeechError::StartFailed("busy".to_string()).is_permanent());
        assert!(!SpeechError::AlreadyStarted.is_permanent());
    }
}
