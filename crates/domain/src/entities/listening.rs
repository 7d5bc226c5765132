//! Listening state machines for recognition sessions and activity detectors

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Lifecycle of a speech-recognition session
///
/// ```text
/// Idle ──▶ Starting ──▶ Listening ──▶ Stopping ──▶ Idle
///            │  │            │
///            │  └──▶ Stopping (abort)
///            └──▶ Idle (failure)   └──▶ Idle (platform ended on its own)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionState {
    /// No session open
    #[default]
    Idle,
    /// Start requested, waiting for platform confirmation
    Starting,
    /// Platform confirmed it is capturing speech
    Listening,
    /// Stop or abort requested, waiting for the platform to end
    Stopping,
}

impl RecognitionState {
    /// Check whether moving to `next` is a legal step
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Listening | Self::Stopping | Self::Idle)
                | (Self::Listening, Self::Stopping | Self::Idle)
                | (Self::Stopping, Self::Idle)
        )
    }

    /// Move to `next`, rejecting illegal steps
    pub fn transition(self, next: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidRecognitionTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Whether the session currently owns (or is acquiring) the microphone
    #[must_use]
    pub const fn holds_microphone(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Listening => write!(f, "listening"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Lifecycle of a voice-activity detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorState {
    /// Microphone released
    #[default]
    Idle,
    /// Model loading / microphone being acquired
    Starting,
    /// Listening for speech onsets
    Active,
}

impl DetectorState {
    /// Check whether moving to `next` is a legal step
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Active | Self::Idle)
                | (Self::Active, Self::Idle)
        )
    }

    /// Move to `next`, rejecting illegal steps
    pub fn transition(self, next: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidDetectorTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Which activity detector is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Model-based voice activity detection
    Primary,
    /// Energy-threshold fallback for platforms without the model
    Energy,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Energy => write!(f, "energy"),
        }
    }
}

/// Outcome of enabling voice-detection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningMode {
    /// The primary detector is listening
    Primary,
    /// The primary detector failed; the energy detector is listening
    Energy,
    /// Speech synthesis holds the microphone; listening resumes afterwards
    Deferred,
    /// Neither detector (or recognition) is available on this platform
    Unavailable,
    /// Voice-detection mode is switched off
    Off,
}

impl ListeningMode {
    /// Whether passive listening is (or will be) running
    #[must_use]
    pub const fn is_listening(self) -> bool {
        !matches!(self, Self::Unavailable | Self::Off)
    }
}

impl fmt::Display for ListeningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Energy => write!(f, "energy"),
            Self::Deferred => write!(f, "deferred"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Off => write!(f, "off"),
        }
    }
}

impl From<DetectorKind> for ListeningMode {
    fn from(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Primary => Self::Primary,
            DetectorKind::Energy => Self::Energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_happy_path_is_legal() {
        let state = RecognitionState::Idle
            .transition(RecognitionState::Starting)
            .and_then(|s| s.transition(RecognitionState::Listening))
            .and_then(|s| s.transition(RecognitionState::Stopping))
            .and_then(|s| s.transition(RecognitionState::Idle));
        assert_eq!(state, Ok(RecognitionState::Idle));
    }

    #[test]
    fn recognition_abort_mid_start_is_legal() {
        assert!(RecognitionState::Starting.can_transition_to(RecognitionState::Stopping));
        assert!(RecognitionState::Starting.can_transition_to(RecognitionState::Idle));
    }

    #[test]
    fn recognition_cannot_stop_from_idle() {
        let err = RecognitionState::Idle
            .transition(RecognitionState::Stopping)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidRecognitionTransition { .. }
        ));
    }

    #[test]
    fn recognition_cannot_resume_listening_while_stopping() {
        assert!(!RecognitionState::Stopping.can_transition_to(RecognitionState::Listening));
    }

    #[test]
    fn only_idle_releases_microphone() {
        assert!(!RecognitionState::Idle.holds_microphone());
        assert!(RecognitionState::Starting.holds_microphone());
        assert!(RecognitionState::Listening.holds_microphone());
        assert!(RecognitionState::Stopping.holds_microphone());
    }

    #[test]
    fn detector_transitions() {
        assert!(DetectorState::Idle.can_transition_to(DetectorState::Starting));
        assert!(DetectorState::Starting.can_transition_to(DetectorState::Active));
        assert!(DetectorState::Starting.can_transition_to(DetectorState::Idle));
        assert!(DetectorState::Active.can_transition_to(DetectorState::Idle));
        assert!(!DetectorState::Idle.can_transition_to(DetectorState::Active));
        assert!(DetectorState::Active.transition(DetectorState::Starting).is_err());
    }

    #[test]
    fn listening_mode_display() {
        assert_eq!(ListeningMode::Energy.to_string(), "energy");
        assert_eq!(ListeningMode::Off.to_string(), "off");
    }

    #[test]
    fn listening_mode_from_kind() {
        assert_eq!(ListeningMode::from(DetectorKind::Energy), ListeningMode::Energy);
        assert!(ListeningMode::Deferred.is_listening());
        assert!(!ListeningMode::Unavailable.is_listening());
        assert!(!ListeningMode::Off.is_listening());
    }

    #[test]
    fn states_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&RecognitionState::Listening).unwrap(),
            "\"listening\""
        );
        assert_eq!(
            serde_json::to_string(&DetectorKind::Energy).unwrap(),
            "\"energy\""
        );
    }
}
