//! Domain entities - Listening state machines and subsystem snapshots

mod capabilities;
mod listening;

pub use capabilities::{VoiceCapabilities, VoiceStateSnapshot};
pub use listening::{DetectorKind, DetectorState, ListeningMode, RecognitionState};
