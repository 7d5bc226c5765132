//! Events published by the orchestrator

use domain::ListeningMode;
use serde::Serialize;

/// Why a transcript was not dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Arrived while synthesis was speaking or about to speak
    Echo,
    /// Repeated the previous transcript within the dedup window
    Duplicate,
}

/// Observable orchestrator activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Recognition confirmed listening
    RecognitionStarted,
    /// Recognition returned to idle
    RecognitionEnded,
    /// Recognition reported an error
    RecognitionError {
        /// Platform reason
        reason: String,
    },
    /// Spoken output was switched on or off
    TtsEnabledChanged {
        /// New value
        enabled: bool,
    },
    /// Voice-detection mode changed
    ListeningModeChanged {
        /// New mode
        mode: ListeningMode,
    },
    /// A transcript was dropped
    TranscriptIgnored {
        /// Transcript text
        text: String,
        /// Why
        reason: IgnoreReason,
    },
    /// A short-reply window elapsed unanswered
    ReplyWindowClosed,
}

/// What `process_transcript` did with a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    /// Dropped as self-echo
    IgnoredEcho,
    /// Dropped as a platform double-fire
    Duplicate,
    /// Dispatched to the named commands
    Commands(Vec<String>),
    /// Handed to the intent resolver
    Forwarded,
    /// Nothing matched and no resolver is configured
    Unhandled,
}

impl TranscriptOutcome {
    /// Whether the transcript reached a handler or the resolver
    pub const fn was_dispatched(&self) -> bool {
        matches!(self, Self::Commands(_) | Self::Forwarded)
    }
}
