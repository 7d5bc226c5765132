//! Scripted voice scenario against the simulated engines

use std::time::Duration;

use ai_speech::SpeakOptions;
use application::{CommandPattern, OrchestratorEvent};
use domain::ListeningMode;
use infrastructure::{AppConfig, SimulatedVoiceStack};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;

/// How long recognition stays open before the scripted transcript arrives
const ONSET_TO_RESULT: Duration = Duration::from_millis(250);

/// Time allowed for replies to play and listening to resume
const SETTLE: Duration = Duration::from_secs(3);

/// What the scenario should exercise
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    /// Make the primary detector fail to initialize
    pub fail_primary: bool,
    /// Utterances spoken after a detector onset, in order
    pub transcripts: Vec<String>,
    /// Open a short-reply window of this length and stay silent
    pub reply_window: Option<Duration>,
}

/// Summary printed at the end
#[derive(Debug)]
pub struct ScenarioReport {
    pub mode: ListeningMode,
    pub spoken: Vec<String>,
    pub events: usize,
}

pub async fn run(config: &AppConfig, options: ScenarioOptions) -> ScenarioReport {
    let stack = SimulatedVoiceStack::build(config);
    stack.orchestrator.register_command(
        "take_photo",
        CommandPattern::phrase("take photo"),
        |invocation| async move {
            invocation
                .orchestrator
                .speak("Say cheese. Photo captured", SpeakOptions::default())
                .await;
        },
    );

    let mut events = stack.orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        let mut count = 0usize;
        loop {
            match events.recv().await {
                Ok(event) => {
                    count += 1;
                    print_event(&event);
                },
                Err(RecvError::Lagged(skipped)) => {
                    println!("   ⚠️  {skipped} event(s) dropped");
                },
                Err(RecvError::Closed) => break,
            }
        }
        count
    });

    if options.fail_primary {
        println!("🧪 Primary detector will fail to initialize");
        stack.primary.fail_init(true);
    }

    let mode = stack.orchestrator.enable_voice_detection_mode().await;
    println!("🎙️  Voice detection: {mode}");

    for transcript in &options.transcripts {
        let detector = match stack.orchestrator.listening_mode() {
            ListeningMode::Primary => &stack.primary,
            ListeningMode::Energy => &stack.energy,
            other => {
                println!("⏭️  Skipping \"{transcript}\": listening is {other}");
                continue;
            },
        };

        println!("🗣️  User: \"{transcript}\"");
        detector.trigger_speech_start();
        sleep(ONSET_TO_RESULT).await;
        stack.recognizer.emit_result(transcript);
        sleep(SETTLE).await;
    }

    if let Some(window) = options.reply_window {
        println!("⏳ Waiting {}ms for a short reply", window.as_millis());
        if stack.orchestrator.expect_short_reply(window).await {
            sleep(window + Duration::from_millis(500)).await;
        } else {
            println!("   ❌ Recognition did not start");
        }
    }

    stack.orchestrator.dispose().await;
    let spoken = stack.synthesizer.spoken();
    drop(stack);
    // Detached handler tasks may still hold the orchestrator.
    let events = tokio::time::timeout(Duration::from_secs(1), printer)
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();

    ScenarioReport {
        mode,
        spoken,
        events,
    }
}

fn print_event(event: &OrchestratorEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("   📡 {json}"),
        Err(_) => println!("   📡 {event:?}"),
    }
}
