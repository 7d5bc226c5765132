//! Application services - Use case implementations

mod speech_orchestrator;

pub use speech_orchestrator::{
    IgnoreReason, OrchestratorConfig, OrchestratorEvent, SpeechOrchestrator,
    SpeechOrchestratorBuilder, TranscriptOutcome, VoiceComponents,
};
