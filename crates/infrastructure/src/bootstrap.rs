//! Wiring of the voice stack
//!
//! Builds the orchestrator on top of the in-process simulated engines, with
//! the canned intent and scripted tool adapters attached. Hosts with real
//! platform engines assemble [`VoiceComponents`] themselves.

use std::sync::Arc;

use ai_speech::{
    RecognitionSession, SimulatedActivityEngine, SimulatedRecognitionEngine,
    SimulatedSynthesisEngine, SynthesisGate, VoiceDetector,
};
use application::{SpeechOrchestrator, VoiceComponents};
use domain::DetectorKind;
use tracing::info;

use crate::adapters::{CannedIntentAdapter, ScriptedToolAdapter};
use crate::config::AppConfig;

/// Orchestrator plus handles to the engines driving it
#[derive(Debug, Clone)]
pub struct SimulatedVoiceStack {
    /// Scriptable speech-to-text engine
    pub recognizer: Arc<SimulatedRecognitionEngine>,
    /// Scriptable text-to-speech engine
    pub synthesizer: Arc<SimulatedSynthesisEngine>,
    /// Model-based voice activity engine
    pub primary: Arc<SimulatedActivityEngine>,
    /// Energy-threshold voice activity engine
    pub energy: Arc<SimulatedActivityEngine>,
    /// Tool executor attached to the orchestrator
    pub tools: Arc<ScriptedToolAdapter>,
    /// The assembled orchestrator
    pub orchestrator: SpeechOrchestrator,
}

impl SimulatedVoiceStack {
    /// Assemble the stack from configuration
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(config: &AppConfig) -> Self {
        let recognizer = Arc::new(SimulatedRecognitionEngine::new());
        let synthesizer = Arc::new(SimulatedSynthesisEngine::new());
        let primary = Arc::new(SimulatedActivityEngine::new("silero"));
        let energy = Arc::new(SimulatedActivityEngine::new("energy"));
        let tools = Arc::new(ScriptedToolAdapter::selfie_defaults());

        let components = VoiceComponents {
            recognition: RecognitionSession::new(recognizer.clone(), config.speech.clone()),
            synthesis: SynthesisGate::new(synthesizer.clone(), config.speech.clone()),
            primary: VoiceDetector::new(DetectorKind::Primary, primary.clone()),
            energy: VoiceDetector::new(DetectorKind::Energy, energy.clone()),
        };

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_config(config.orchestrator.clone())
            .with_intent_resolver(Arc::new(CannedIntentAdapter::selfie_defaults()))
            .with_tool_executor(tools.clone())
            .build();
        info!(language = %config.orchestrator.language, "Simulated voice stack ready");

        Self {
            recognizer,
            synthesizer,
            primary,
            energy,
            tools,
            orchestrator,
        }
    }
}
