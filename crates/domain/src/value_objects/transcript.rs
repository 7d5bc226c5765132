//! Finalized speech-recognition transcript

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A finalized utterance produced by a recognition session.
///
/// Interim results never become a `Transcript`; the text is always trimmed
/// and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    received_at: DateTime<Utc>,
}

impl Transcript {
    /// Create a transcript from raw recognizer text
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyTranscript);
        }
        Ok(Self {
            text: trimmed.to_string(),
            confidence: None,
            received_at: Utc::now(),
        })
    }

    /// Attach the recognizer's confidence score (clamped to 0.0 - 1.0)
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// The transcript text as spoken
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Confidence reported by the recognizer, if any
    pub const fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    /// When the transcript was produced
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Comparison form: lowercase, single spaces, no trailing punctuation
    pub fn normalized(&self) -> String {
        normalize(&self.text)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Normalize free text for matching and duplicate detection
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn trims_text() {
        let t = Transcript::new("  take photo  ").unwrap();
        assert_eq!(t.text(), "take photo");
    }

    #[test]
    fn rejects_blank_text() {
        assert_eq!(Transcript::new("   ").unwrap_err(), DomainError::EmptyTranscript);
        assert_eq!(Transcript::new("").unwrap_err(), DomainError::EmptyTranscript);
    }

    #[test]
    fn confidence_is_clamped() {
        let t = Transcript::new("hi").unwrap().with_confidence(1.7);
        assert_eq!(t.confidence(), Some(1.0));
    }

    #[test]
    fn normalized_strips_case_spacing_and_punctuation() {
        let t = Transcript::new("Take   Photo!").unwrap();
        assert_eq!(t.normalized(), "take photo");
    }

    #[test]
    fn display_shows_text() {
        let t = Transcript::new("Cheese").unwrap();
        assert_eq!(t.to_string(), "Cheese");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "[a-zA-Z0-9 .,!?]{0,64}") {
            let once = normalize(&input);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_ignores_case(input in "[a-zA-Z ]{1,32}") {
            prop_assert_eq!(normalize(&input.to_uppercase()), normalize(&input.to_lowercase()));
        }
    }
}
