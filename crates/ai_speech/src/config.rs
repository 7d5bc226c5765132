//! Configuration for speech engine wrappers

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Timing and voice settings for recognition and synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// BCP-47 language tag for recognition and synthesis
    #[serde(default = "default_language")]
    pub language: String,

    /// Force-abort a stopping recognition session after this many milliseconds
    #[serde(default = "default_stop_guard_ms")]
    pub stop_guard_ms: u64,

    /// Give up on a recognition start the platform never confirms
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// Cancel synthesis that never reports completion
    #[serde(default = "default_speak_timeout_ms")]
    pub speak_timeout_ms: u64,

    /// Preferred synthesis voice (platform default if unset)
    #[serde(default)]
    pub default_voice: Option<String>,

    /// Speaking rate (0.1 to 10.0)
    #[serde(default = "default_rate")]
    pub rate: f32,
}

fn default_language() -> String {
    "en-US".to_string()
}

const fn default_stop_guard_ms() -> u64 {
    4000
}

const fn default_start_timeout_ms() -> u64 {
    5000
}

const fn default_speak_timeout_ms() -> u64 {
    3000
}

const fn default_rate() -> f32 {
    1.0
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            stop_guard_ms: default_stop_guard_ms(),
            start_timeout_ms: default_start_timeout_ms(),
            speak_timeout_ms: default_speak_timeout_ms(),
            default_voice: None,
            rate: default_rate(),
        }
    }
}

impl SpeechConfig {
    /// Stop guard as a duration
    pub const fn stop_guard(&self) -> Duration {
        Duration::from_millis(self.stop_guard_ms)
    }

    /// Start confirmation timeout as a duration
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Synthesis completion timeout as a duration
    pub const fn speak_timeout(&self) -> Duration {
        Duration::from_millis(self.speak_timeout_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), SpeechError> {
        let invalid = |message: String| -> Result<(), SpeechError> {
            Err(SpeechError::Configuration(message))
        };

        if self.language.trim().is_empty() {
            return invalid("Language must not be empty".to_string());
        }

        if !(0.1..=10.0).contains(&self.rate) {
            return invalid(format!("Rate must be between 0.1 and 10.0, got {}", self.rate));
        }

        if self.stop_guard_ms == 0 {
            return invalid("Stop guard must be greater than 0".to_string());
        }

        if self.start_timeout_ms == 0 {
            return invalid("Start timeout must be greater than 0".to_string());
        }

        if self.speak_timeout_ms == 0 {
            return invalid("Speak timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SpeechConfig::default();

        assert_eq!(config.language, "en-US");
        assert_eq!(config.stop_guard_ms, 4000);
        assert_eq!(config.start_timeout_ms, 5000);
        assert_eq!(config.speak_timeout_ms, 3000);
        assert!(config.default_voice.is_none());
        assert!((config.rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn durations_match_millis() {
        let config = SpeechConfig::default();
        assert_eq!(config.stop_guard(), Duration::from_secs(4));
        assert_eq!(config.speak_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn default_config_validates() {
        assert!(SpeechConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_fails_with_invalid_rate() {
        let mut config = SpeechConfig {
            rate: 0.05,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.rate = 12.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_fails_with_zero_timeouts() {
        let mut config = SpeechConfig {
            stop_guard_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = SpeechConfig {
            speak_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_fails_with_blank_language() {
        let config = SpeechConfig {
            language: "  ".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "Configuration error: Language must not be empty");
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml = r#"
            language = "de-DE"
            stop_guard_ms = 2500
            speak_timeout_ms = 6000
            default_voice = "Anna"
        "#;

        let config: SpeechConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.language, "de-DE");
        assert_eq!(config.stop_guard_ms, 2500);
        assert_eq!(config.start_timeout_ms, 5000);
        assert_eq!(config.speak_timeout_ms, 6000);
        assert_eq!(config.default_voice.as_deref(), Some("Anna"));
    }
}
