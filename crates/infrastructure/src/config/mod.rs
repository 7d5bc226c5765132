//! Application configuration
//!
//! Layered with the `config` crate, later sources overriding earlier ones:
//! - built-in defaults (every field has one)
//! - `voice.toml` in the working directory, or an explicit file
//! - environment variables such as
//!   `SELFIE_VOICE_ORCHESTRATOR__DEDUP_WINDOW_MS=1500`

use std::collections::HashMap;
use std::path::Path;

use ai_speech::SpeechConfig;
use application::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::telemetry::TelemetryConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SELFIE_VOICE";

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "voice";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    /// A source could not be read or deserialized
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    /// A section failed validation
    #[error("Invalid {section} configuration: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },

    /// The effective configuration could not be rendered
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level configuration for the voice subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Recognition and synthesis guards
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Listening hand-over, echo and dedup timing
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Log output
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from `voice.toml` (if present) and the environment
    pub fn load() -> Result<Self, AppConfigError> {
        Self::load_from(None)
    }

    /// Load from an explicit file (required to exist) or `voice.toml`
    pub fn load_from(path: Option<&Path>) -> Result<Self, AppConfigError> {
        Self::build(path, None)
    }

    /// Shared loader; `env` replaces the process environment when given
    fn build(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, AppConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        debug!(
            language = %app.orchestrator.language,
            tts_enabled = app.orchestrator.tts_enabled,
            "Configuration loaded"
        );
        Ok(app)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), AppConfigError> {
        self.speech
            .validate()
            .map_err(|e| AppConfigError::Invalid {
                section: "speech",
                message: e.to_string(),
            })?;
        self.orchestrator
            .validate()
            .map_err(|message| AppConfigError::Invalid {
                section: "orchestrator",
                message,
            })?;
        self.telemetry
            .validate()
            .map_err(|message| AppConfigError::Invalid {
                section: "telemetry",
                message,
            })?;
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, AppConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_any_source() {
        let config = AppConfig::build(None, env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.speech.stop_guard_ms, 4000);
        assert_eq!(config.orchestrator.dedup_window_ms, 1200);
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
            [speech]
            speak_timeout_ms = 6000

            [orchestrator]
            language = "de-DE"
            post_tts_cooldown_ms = 700

            [telemetry]
            json = true
            "#,
        );

        let config = AppConfig::build(Some(file.path()), env(&[])).unwrap();

        assert_eq!(config.speech.speak_timeout_ms, 6000);
        assert_eq!(config.speech.stop_guard_ms, 4000);
        assert_eq!(config.orchestrator.language, "de-DE");
        assert_eq!(config.orchestrator.post_tts_cooldown_ms, 700);
        assert_eq!(config.orchestrator.resume_delay_ms, 400);
        assert!(config.telemetry.json);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config("[orchestrator]\ndedup_window_ms = 1500\n");

        let config = AppConfig::build(
            Some(file.path()),
            env(&[
                ("SELFIE_VOICE_ORCHESTRATOR__DEDUP_WINDOW_MS", "2000"),
                ("SELFIE_VOICE_ORCHESTRATOR__TTS_ENABLED", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.orchestrator.dedup_window_ms, 2000);
        assert!(!config.orchestrator.tts_enabled);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let result = AppConfig::build(Some(&missing), env(&[]));

        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }

    #[test]
    fn invalid_section_is_rejected() {
        let file = write_config("[orchestrator]\nhistory_len = 0\n");

        let result = AppConfig::build(Some(file.path()), env(&[]));

        assert!(matches!(
            result,
            Err(AppConfigError::Invalid {
                section: "orchestrator",
                ..
            })
        ));
    }

    #[test]
    fn rendered_toml_reloads_identically() {
        let mut config = AppConfig::default();
        config.orchestrator.language = "fr-FR".to_string();
        config.speech.stop_guard_ms = 2500;

        let rendered = config.to_toml().unwrap();
        let file = write_config(&rendered);
        let reloaded = AppConfig::build(Some(file.path()), env(&[])).unwrap();

        assert_eq!(reloaded, config);
    }
}
