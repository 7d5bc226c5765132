//! Domain-level errors

use thiserror::Error;

use crate::entities::{DetectorState, RecognitionState};

/// Errors that can occur in the domain layer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A transcript contained no usable text
    #[error("Transcript is empty")]
    EmptyTranscript,

    /// Recognition state machine was asked to take an illegal step
    #[error("Invalid recognition transition: {from} -> {to}")]
    InvalidRecognitionTransition {
        from: RecognitionState,
        to: RecognitionState,
    },

    /// Detector state machine was asked to take an illegal step
    #[error("Invalid detector transition: {from} -> {to}")]
    InvalidDetectorTransition { from: DetectorState, to: DetectorState },

    /// Speak token could not be parsed
    #[error("Invalid speak token: {0}")]
    InvalidSpeakToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_message() {
        assert_eq!(DomainError::EmptyTranscript.to_string(), "Transcript is empty");
    }

    #[test]
    fn recognition_transition_message() {
        let err = DomainError::InvalidRecognitionTransition {
            from: RecognitionState::Idle,
            to: RecognitionState::Stopping,
        };
        assert_eq!(
            err.to_string(),
            "Invalid recognition transition: idle -> stopping"
        );
    }

    #[test]
    fn detector_transition_message() {
        let err = DomainError::InvalidDetectorTransition {
            from: DetectorState::Idle,
            to: DetectorState::Active,
        };
        assert_eq!(err.to_string(), "Invalid detector transition: idle -> active");
    }
}
