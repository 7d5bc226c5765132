//! Orchestrator timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delays and windows used by the speech orchestrator
///
/// The defaults are tuned for browser-grade engines; platforms with faster or
/// slower audio routing may need different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Settle delay before resuming a detector that was merely enabled
    #[serde(default = "default_resume_delay_ms")]
    pub resume_delay_ms: u64,

    /// Settle delay before resuming a detector that was actively running
    #[serde(default = "default_resume_delay_active_ms")]
    pub resume_delay_active_ms: u64,

    /// Identical transcripts within this window are dispatched once
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Detector speech onsets are ignored this long after playback ends
    #[serde(default = "default_post_tts_cooldown_ms")]
    pub post_tts_cooldown_ms: u64,

    /// Delay between a recognition session ending and detector restart
    #[serde(default = "default_recognition_restart_delay_ms")]
    pub recognition_restart_delay_ms: u64,

    /// Default reply window for `expect_short_reply`
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Conversation turns kept for the intent resolver
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// BCP-47 language tag
    #[serde(default = "default_language")]
    pub language: String,

    /// Whether spoken output starts enabled
    #[serde(default = "default_tts_enabled")]
    pub tts_enabled: bool,
}

const fn default_resume_delay_ms() -> u64 {
    400
}

const fn default_resume_delay_active_ms() -> u64 {
    800
}

const fn default_dedup_window_ms() -> u64 {
    1200
}

const fn default_post_tts_cooldown_ms() -> u64 {
    500
}

const fn default_recognition_restart_delay_ms() -> u64 {
    400
}

const fn default_reply_timeout_ms() -> u64 {
    4500
}

const fn default_history_len() -> usize {
    10
}

fn default_language() -> String {
    "en-US".to_string()
}

const fn default_tts_enabled() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            resume_delay_ms: default_resume_delay_ms(),
            resume_delay_active_ms: default_resume_delay_active_ms(),
            dedup_window_ms: default_dedup_window_ms(),
            post_tts_cooldown_ms: default_post_tts_cooldown_ms(),
            recognition_restart_delay_ms: default_recognition_restart_delay_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
            history_len: default_history_len(),
            language: default_language(),
            tts_enabled: default_tts_enabled(),
        }
    }
}

impl OrchestratorConfig {
    pub(super) const fn resume_delay(&self, detector_was_running: bool) -> Duration {
        if detector_was_running {
            Duration::from_millis(self.resume_delay_active_ms)
        } else {
            Duration::from_millis(self.resume_delay_ms)
        }
    }

    pub(super) const fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub(super) const fn post_tts_cooldown(&self) -> Duration {
        Duration::from_millis(self.post_tts_cooldown_ms)
    }

    pub(super) const fn recognition_restart_delay(&self) -> Duration {
        Duration::from_millis(self.recognition_restart_delay_ms)
    }

    /// Default reply window as a duration
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("Language must not be empty".to_string());
        }

        if self.reply_timeout_ms == 0 {
            return Err("Reply timeout must be greater than 0".to_string());
        }

        if self.resume_delay_active_ms < self.resume_delay_ms {
            return Err(format!(
                "Active resume delay ({}ms) must not be shorter than the idle resume delay ({}ms)",
                self.resume_delay_active_ms, self.resume_delay_ms
            ));
        }

        if self.history_len == 0 {
            return Err("History length must be at least 1".to_string());
        }

        Ok(())
    }
}
