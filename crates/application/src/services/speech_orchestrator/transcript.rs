//! Transcript dispatch: echo guard, de-duplication, commands and intents

use std::sync::Arc;

use ai_speech::SpeakOptions;
use domain::Transcript;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{IgnoreReason, OrchestratorEvent, SpeechOrchestrator, TranscriptOutcome};
use crate::command_router::CommandInvocation;
use crate::ports::{ConversationTurn, IntentRequest, IntentResolverPort};

impl SpeechOrchestrator {
    /// Route a finalized transcript
    ///
    /// A transcript answering an open reply window closes it and stops
    /// recognition. Transcripts heard while speech is playing or pending are
    /// dropped as echo, and a repeat of the previous transcript inside the
    /// dedup window is dropped as a platform double-fire. Otherwise every
    /// matching command fires once, and unmatched text goes to the intent
    /// resolver. Handlers and the resolver run detached.
    #[instrument(skip(self, transcript), fields(text = %transcript))]
    pub fn process_transcript(&self, transcript: Transcript) -> TranscriptOutcome {
        let answered_window = self.inner.state.lock().reply_window.take();
        if let Some(window) = answered_window {
            window.timer.abort();
            debug!("Transcript answered reply window");
            let this = self.clone();
            tokio::spawn(async move {
                {
                    let _mic = this.inner.mic.lock().await;
                    this.inner.recognition.stop().await;
                }
                this.schedule_detector_restart();
            });
        }

        let normalized = transcript.normalized();
        let ignored = {
            let mut state = self.inner.state.lock();
            let now = Instant::now();
            if state.current_token.is_some() || self.inner.synthesis.is_speaking() {
                Some(IgnoreReason::Echo)
            } else if state.last_dispatch.as_ref().is_some_and(|(last, at)| {
                *last == normalized && now.duration_since(*at) < self.inner.config.dedup_window()
            }) {
                Some(IgnoreReason::Duplicate)
            } else {
                state.last_dispatch = Some((normalized, now));
                None
            }
        };
        if let Some(reason) = ignored {
            debug!(?reason, "Transcript ignored");
            self.emit(OrchestratorEvent::TranscriptIgnored {
                text: transcript.text().to_string(),
                reason,
            });
            return match reason {
                IgnoreReason::Echo => TranscriptOutcome::IgnoredEcho,
                IgnoreReason::Duplicate => TranscriptOutcome::Duplicate,
            };
        }

        let matched = self.inner.router.read().matches(transcript.text());
        if !matched.is_empty() {
            let names: Vec<String> = matched.iter().map(|m| m.name.clone()).collect();
            info!(commands = ?names, "Dispatching voice command");
            for command in matched {
                let invocation = CommandInvocation {
                    command: command.name,
                    transcript: transcript.clone(),
                    orchestrator: self.clone(),
                };
                tokio::spawn((command.handler)(invocation));
            }
            return TranscriptOutcome::Commands(names);
        }

        let Some(resolver) = self.inner.intent.clone() else {
            debug!("No command matched and no intent resolver configured");
            return TranscriptOutcome::Unhandled;
        };

        let request = {
            let state = self.inner.state.lock();
            IntentRequest {
                transcript: transcript.text().to_string(),
                state: self.snapshot_locked(&state),
                history: state.history.iter().cloned().collect(),
            }
        };
        self.remember(ConversationTurn::user(transcript.text()));

        let this = self.clone();
        tokio::spawn(async move { this.resolve_intent(resolver, request).await });
        TranscriptOutcome::Forwarded
    }

    async fn resolve_intent(&self, resolver: Arc<dyn IntentResolverPort>, request: IntentRequest) {
        let resolution = match resolver.resolve(request).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Intent resolution failed");
                return;
            },
        };
        if resolution.is_empty() {
            debug!("Intent resolver had nothing to do");
            return;
        }

        for call in resolution.tool_calls {
            let Some(tools) = &self.inner.tools else {
                warn!(tool = %call.name, "Tool requested but no executor configured");
                continue;
            };
            let name = call.name.clone();
            match tools.execute(call).await {
                Ok(Some(output)) if !output.trim().is_empty() => {
                    debug!(tool = %name, "Tool produced spoken output");
                    self.remember(ConversationTurn::assistant(output.clone()));
                    drop(self.enqueue_speech(output, SpeakOptions::default()));
                },
                Ok(_) => debug!(tool = %name, "Tool finished silently"),
                Err(e) => warn!(tool = %name, error = %e, "Tool execution failed"),
            }
        }

        if let Some(reply) = resolution.reply.filter(|r| !r.trim().is_empty()) {
            self.remember(ConversationTurn::assistant(reply.clone()));
            drop(self.enqueue_speech(reply, SpeakOptions::default()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use ai_speech::{
        RecognitionSession, SimulatedActivityEngine, SimulatedRecognitionEngine,
        SimulatedSynthesisEngine, SpeechConfig, SynthesisGate, VoiceDetector,
    };
    use domain::DetectorKind;

    use super::*;
    use crate::command_router::CommandPattern;
    use crate::error::ApplicationError;
    use crate::ports::{
        IntentResolution, MockIntentResolverPort, MockToolExecutorPort, ToolInvocation,
    };
    use crate::services::speech_orchestrator::VoiceComponents;

    fn components() -> (Arc<SimulatedSynthesisEngine>, VoiceComponents) {
        let config = SpeechConfig::default();
        let synthesis = Arc::new(SimulatedSynthesisEngine::new());
        let components = VoiceComponents {
            recognition: RecognitionSession::new(
                Arc::new(SimulatedRecognitionEngine::new()),
                config.clone(),
            ),
            synthesis: SynthesisGate::new(synthesis.clone(), config),
            primary: VoiceDetector::new(
                DetectorKind::Primary,
                Arc::new(SimulatedActivityEngine::new("silero")),
            ),
            energy: VoiceDetector::new(
                DetectorKind::Energy,
                Arc::new(SimulatedActivityEngine::new("energy")),
            ),
        };
        (synthesis, components)
    }

    fn transcript(text: &str) -> Transcript {
        Transcript::new(text).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_transcript_goes_to_resolver_and_reply_is_spoken() {
        let (synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver
            .expect_resolve()
            .withf(|req| req.transcript == "How do I look?" && req.history.is_empty())
            .times(1)
            .returning(|_| Ok(IntentResolution::reply("You look great")));

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_intent_resolver(Arc::new(resolver))
            .build();

        let outcome = orchestrator.process_transcript(transcript("How do I look?"));
        assert_eq!(outcome, TranscriptOutcome::Forwarded);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(synthesis.spoken(), vec!["You look great".to_string()]);

        let history = orchestrator.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ConversationTurn::user("How do I look?"));
        assert_eq!(history[1], ConversationTurn::assistant("You look great"));
    }

    #[tokio::test(start_paused = true)]
    async fn tool_output_is_spoken_before_reply() {
        let (synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver.expect_resolve().returning(|_| {
            Ok(IntentResolution {
                tool_calls: vec![ToolInvocation::new("take_photo")],
                reply: Some("Anything else?".to_string()),
            })
        });
        let mut tools = MockToolExecutorPort::new();
        tools
            .expect_execute()
            .withf(|call| call.name == "take_photo")
            .times(1)
            .returning(|_| Ok(Some("Photo saved".to_string())));

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_intent_resolver(Arc::new(resolver))
            .with_tool_executor(Arc::new(tools))
            .build();

        orchestrator.process_transcript(transcript("snap a picture for me"));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(
            synthesis.spoken(),
            vec!["Photo saved".to_string(), "Anything else?".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resolver_failure_is_contained() {
        let (synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(ApplicationError::ExternalService("offline".to_string())));

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_intent_resolver(Arc::new(resolver))
            .build();

        assert_eq!(
            orchestrator.process_transcript(transcript("what now")),
            TranscriptOutcome::Forwarded
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(synthesis.spoken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_bounded() {
        let (_synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver
            .expect_resolve()
            .returning(|_| Ok(IntentResolution::default()));
        let config = crate::services::speech_orchestrator::OrchestratorConfig {
            history_len: 3,
            ..Default::default()
        };

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_config(config)
            .with_intent_resolver(Arc::new(resolver))
            .build();

        for text in ["one", "two", "three", "four"] {
            orchestrator.process_transcript(transcript(text));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let texts: Vec<String> = orchestrator.history().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["two", "three", "four"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_history_len_keeps_no_history() {
        let (_synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Ok(IntentResolution::reply("Hi there")));
        let config = crate::services::speech_orchestrator::OrchestratorConfig {
            history_len: 0,
            ..Default::default()
        };

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_config(config)
            .with_intent_resolver(Arc::new(resolver))
            .build();

        assert_eq!(
            orchestrator.process_transcript(transcript("hello")),
            TranscriptOutcome::Forwarded
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(orchestrator.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_take_precedence_over_resolver() {
        let (_synthesis, components) = components();
        let mut resolver = MockIntentResolverPort::new();
        resolver.expect_resolve().never();
        let fired = Arc::new(AtomicUsize::new(0));

        let orchestrator = SpeechOrchestrator::builder(components)
            .with_intent_resolver(Arc::new(resolver))
            .build();
        let counter = fired.clone();
        orchestrator.register_command("take", CommandPattern::phrase("take photo"), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let outcome = orchestrator.process_transcript(transcript("Take photo!"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(outcome, TranscriptOutcome::Commands(vec!["take".to_string()]));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
