//! Types for speech processing
//!
//! Contains utterance descriptions, speak options and the events emitted by
//! the recognition and activity-detection wrappers.

use std::time::Duration;

use domain::{DetectorKind, Transcript};
use serde::{Deserialize, Serialize};

/// Per-call options for speech synthesis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakOptions {
    /// Voice name override
    #[serde(default)]
    pub voice: Option<String>,
    /// Language override (BCP-47)
    #[serde(default)]
    pub language: Option<String>,
    /// Speaking rate override
    #[serde(default)]
    pub rate: Option<f32>,
    /// Pitch (0.0 - 2.0)
    #[serde(default)]
    pub pitch: Option<f32>,
    /// Volume (0.0 - 1.0)
    #[serde(default)]
    pub volume: Option<f32>,
    /// Completion timeout override
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl SpeakOptions {
    /// Use a specific voice
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Speak in a specific language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Override the speaking rate
    #[must_use]
    pub const fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Override the completion timeout for this utterance
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully resolved utterance handed to the synthesis engine
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Voice name (platform default if `None`)
    pub voice: Option<String>,
    /// Language tag
    pub language: String,
    /// Speaking rate
    pub rate: f32,
    /// Pitch
    pub pitch: f32,
    /// Volume
    pub volume: f32,
}

/// Events published by a recognition session
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Platform confirmed listening
    Started,
    /// A finalized transcript
    Result(Transcript),
    /// Session reached idle
    Ended,
    /// Platform reported an error
    Error(String),
}

/// Events published by a voice-activity detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorEvent {
    /// Speech onset detected
    SpeechStart(DetectorKind),
    /// Speech offset detected
    SpeechEnd(DetectorKind),
    /// Detector reported a runtime error
    Error(DetectorKind, String),
}

impl DetectorEvent {
    /// Which detector emitted the event
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::SpeechStart(kind) | Self::SpeechEnd(kind) | Self::Error(kind, _) => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speak_options_builders() {
        let opts = SpeakOptions::default()
            .with_voice("Samantha")
            .with_language("en-GB")
            .with_rate(1.2)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(opts.voice.as_deref(), Some("Samantha"));
        assert_eq!(opts.language.as_deref(), Some("en-GB"));
        assert_eq!(opts.rate, Some(1.2));
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
        assert!(opts.pitch.is_none());
    }

    #[test]
    fn speak_options_deserialize_partial() {
        let opts: SpeakOptions = serde_json::from_str(r#"{"voice":"Anna"}"#).unwrap();
        assert_eq!(opts.voice.as_deref(), Some("Anna"));
        assert!(opts.timeout.is_none());
    }

    #[test]
    fn detector_event_kind() {
        assert_eq!(
            DetectorEvent::SpeechStart(DetectorKind::Energy).kind(),
            DetectorKind::Energy
        );
        assert_eq!(
            DetectorEvent::Error(DetectorKind::Primary, "boom".to_string()).kind(),
            DetectorKind::Primary
        );
    }
}
