//! Integration tests for the assembled simulated voice stack

use std::time::Duration;

use ai_speech::SpeakOptions;
use application::TranscriptOutcome;
use domain::{ListeningMode, Transcript};
use infrastructure::{AppConfig, SimulatedVoiceStack};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn unmatched_request_runs_canned_tool_and_speaks_its_output() {
    let stack = SimulatedVoiceStack::build(&AppConfig::default());

    let outcome = stack
        .orchestrator
        .process_transcript(Transcript::new("Take a selfie please").unwrap());
    sleep(Duration::from_secs(2)).await;

    assert_eq!(outcome, TranscriptOutcome::Forwarded);
    assert_eq!(stack.tools.calls().len(), 1);
    assert_eq!(stack.synthesizer.spoken(), vec!["Photo captured".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unknown_request_speaks_fallback() {
    let stack = SimulatedVoiceStack::build(&AppConfig::default());

    stack
        .orchestrator
        .process_transcript(Transcript::new("order a pizza").unwrap());
    sleep(Duration::from_secs(2)).await;

    assert_eq!(
        stack.synthesizer.spoken(),
        vec!["Sorry, I did not catch that.".to_string()]
    );
    assert!(stack.tools.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn configured_language_reaches_recognizer() {
    let mut config = AppConfig::default();
    config.orchestrator.language = "de-DE".to_string();

    let stack = SimulatedVoiceStack::build(&config);

    assert_eq!(stack.recognizer.language(), "de-DE");
    assert_eq!(stack.orchestrator.get_state().language, "de-DE");
}

#[tokio::test(start_paused = true)]
async fn tts_disabled_by_config_keeps_quiet() {
    let mut config = AppConfig::default();
    config.orchestrator.tts_enabled = false;

    let stack = SimulatedVoiceStack::build(&config);

    assert!(!stack.orchestrator.speak("Hello", SpeakOptions::default()).await);
    assert!(stack.synthesizer.spoken().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_primary_engine_falls_back() {
    let stack = SimulatedVoiceStack::build(&AppConfig::default());
    stack.primary.fail_init(true);

    let mode = stack.orchestrator.enable_voice_detection_mode().await;

    assert_eq!(mode, ListeningMode::Energy);
    assert!(stack.energy.is_running());
}
