//! Capability and state snapshots surfaced to the UI layer

use serde::{Deserialize, Serialize};

/// Which speech features the platform supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceCapabilities {
    /// Speech-to-text is available
    pub recognition: bool,
    /// Text-to-speech is available
    pub tts: bool,
}

impl VoiceCapabilities {
    /// Whether any voice feature can be offered at all
    #[must_use]
    pub const fn any(&self) -> bool {
        self.recognition || self.tts
    }
}

/// Point-in-time view of the voice subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateSnapshot {
    /// Voice-detection mode is wanted by the user
    pub listening: bool,
    /// Spoken guidance is enabled
    pub tts_enabled: bool,
    /// BCP-47 language tag used for recognition and synthesis
    pub language: String,
}
