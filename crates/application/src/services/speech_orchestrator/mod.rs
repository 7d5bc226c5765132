//! Speech orchestrator - arbitrates one microphone and one speaker
//!
//! Three consumers compete for the audio hardware:
//!
//! ```text
//!   ┌──────────────┐  speech onset  ┌────────────────────┐  transcript  ┌────────────────┐
//!   │ VoiceDetector│ ─────────────▶ │ RecognitionSession │ ───────────▶ │ CommandRouter  │
//!   │ (primary or  │                └────────────────────┘              │  / intent port │
//!   │   energy)    │ ◀─── resume ──────────┐                             └───────┬────────┘
//!   └──────────────┘                       │                                     │ speak()
//!                                   ┌──────┴───────┐ ◀──────────────────────────┘
//!                                   │ SynthesisGate│
//!                                   └──────────────┘
//! ```
//!
//! The orchestrator makes sure the detector and the recognizer never hold the
//! microphone at the same time, tears both down before anything is spoken,
//! and resumes passive listening once playback has settled. Only the most
//! recent `speak` call owns that resumption.

mod config;
mod events;
mod listening;
mod speak;
mod transcript;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use ai_speech::{
    DetectorEvent, RecognitionEvent, RecognitionSession, SynthesisGate, VoiceDetector,
};
use domain::{DetectorKind, ListeningMode, SpeakToken, VoiceCapabilities, VoiceStateSnapshot};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use config::OrchestratorConfig;
pub use events::{IgnoreReason, OrchestratorEvent, TranscriptOutcome};

use crate::command_router::{CommandId, CommandInvocation, CommandPattern, CommandRouter};
use crate::ports::{ConversationTurn, IntentResolverPort, ToolExecutorPort};

const EVENT_CAPACITY: usize = 128;

/// The speech components an orchestrator coordinates
#[derive(Debug, Clone)]
pub struct VoiceComponents {
    /// Speech-to-text session
    pub recognition: RecognitionSession,
    /// Text-to-speech gate
    pub synthesis: SynthesisGate,
    /// Model-based voice-activity detector
    pub primary: VoiceDetector,
    /// Energy-threshold fallback detector
    pub energy: VoiceDetector,
}

/// Coordinates detection, recognition and synthesis
#[derive(Clone)]
pub struct SpeechOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    recognition: RecognitionSession,
    synthesis: SynthesisGate,
    primary: VoiceDetector,
    energy: VoiceDetector,
    router: RwLock<CommandRouter>,
    intent: Option<Arc<dyn IntentResolverPort>>,
    tools: Option<Arc<dyn ToolExecutorPort>>,
    config: OrchestratorConfig,
    state: Mutex<VoiceState>,
    /// Held while the detector/recognizer hand the microphone over
    mic: tokio::sync::Mutex<()>,
    queue_tail: Mutex<Shared<BoxFuture<'static, ()>>>,
    events: broadcast::Sender<OrchestratorEvent>,
}

struct VoiceState {
    want_listening: bool,
    mode: ListeningMode,
    preferred: DetectorKind,
    primary_unavailable: bool,
    current_token: Option<SpeakToken>,
    suspended_by_tts: bool,
    suspended_detector_was_running: bool,
    reply_window: Option<ReplyWindow>,
    next_window_id: u64,
    last_dispatch: Option<(String, Instant)>,
    cooldown_until: Option<Instant>,
    resume: Deferred,
    restart: Deferred,
    language: String,
    history: VecDeque<ConversationTurn>,
}

struct ReplyWindow {
    id: u64,
    timer: AbortHandle,
}

/// A delayed task that can be cancelled until it claims itself
///
/// The task captures the epoch returned by [`Deferred::arm`] and must call
/// [`Deferred::claim`] under the state lock before doing any work.
#[derive(Default)]
struct Deferred {
    epoch: u64,
    handle: Option<AbortHandle>,
}

impl Deferred {
    fn cancel(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn arm(&mut self) -> u64 {
        self.cancel();
        self.epoch
    }

    fn set_handle(&mut self, handle: AbortHandle) {
        self.handle = Some(handle);
    }

    fn claim(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.handle = None;
        true
    }
}

impl fmt::Debug for SpeechOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SpeechOrchestrator")
            .field("want_listening", &state.want_listening)
            .field("mode", &state.mode)
            .field("speaking", &state.current_token.is_some())
            .field("awaiting_reply", &state.reply_window.is_some())
            .field("intent_resolver", &self.inner.intent.is_some())
            .field("tool_executor", &self.inner.tools.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`SpeechOrchestrator`]
pub struct SpeechOrchestratorBuilder {
    components: VoiceComponents,
    config: OrchestratorConfig,
    intent: Option<Arc<dyn IntentResolverPort>>,
    tools: Option<Arc<dyn ToolExecutorPort>>,
}

impl fmt::Debug for SpeechOrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechOrchestratorBuilder")
            .field("config", &self.config)
            .field("intent_resolver", &self.intent.is_some())
            .field("tool_executor", &self.tools.is_some())
            .finish_non_exhaustive()
    }
}

impl SpeechOrchestratorBuilder {
    /// Use a specific configuration
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward unmatched transcripts to an intent resolver
    #[must_use]
    pub fn with_intent_resolver(mut self, resolver: Arc<dyn IntentResolverPort>) -> Self {
        self.intent = Some(resolver);
        self
    }

    /// Execute resolver tool calls with this executor
    #[must_use]
    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutorPort>) -> Self {
        self.tools = Some(executor);
        self
    }

    /// Build the orchestrator and start its event pumps
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> SpeechOrchestrator {
        let VoiceComponents {
            recognition,
            synthesis,
            primary,
            energy,
        } = self.components;
        let config = self.config;

        synthesis.set_enabled(config.tts_enabled);
        recognition.set_language(&config.language);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = VoiceState {
            want_listening: false,
            mode: ListeningMode::Off,
            preferred: DetectorKind::Primary,
            primary_unavailable: false,
            current_token: None,
            suspended_by_tts: false,
            suspended_detector_was_running: false,
            reply_window: None,
            next_window_id: 0,
            last_dispatch: None,
            cooldown_until: None,
            resume: Deferred::default(),
            restart: Deferred::default(),
            language: config.language.clone(),
            history: VecDeque::with_capacity(config.history_len),
        };

        let orchestrator = SpeechOrchestrator {
            inner: Arc::new(OrchestratorInner {
                recognition,
                synthesis,
                primary,
                energy,
                router: RwLock::new(CommandRouter::new()),
                intent: self.intent,
                tools: self.tools,
                config,
                state: Mutex::new(state),
                mic: tokio::sync::Mutex::new(()),
                queue_tail: Mutex::new(futures::future::ready(()).boxed().shared()),
                events,
            }),
        };
        orchestrator.spawn_pumps();
        info!("Speech orchestrator ready");
        orchestrator
    }
}

impl SpeechOrchestrator {
    /// Start building an orchestrator around `components`
    pub fn builder(components: VoiceComponents) -> SpeechOrchestratorBuilder {
        SpeechOrchestratorBuilder {
            components,
            config: OrchestratorConfig::default(),
            intent: None,
            tools: None,
        }
    }

    /// Build an orchestrator without intent resolution
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(components: VoiceComponents, config: OrchestratorConfig) -> Self {
        Self::builder(components).with_config(config).build()
    }

    /// Which voice features the platform supports
    pub fn is_supported(&self) -> VoiceCapabilities {
        VoiceCapabilities {
            recognition: self.inner.recognition.is_supported(),
            tts: self.inner.synthesis.is_supported(),
        }
    }

    /// Current voice state
    pub fn get_state(&self) -> VoiceStateSnapshot {
        let state = self.inner.state.lock();
        self.snapshot_locked(&state)
    }

    /// Current listening mode
    pub fn listening_mode(&self) -> ListeningMode {
        self.inner.state.lock().mode
    }

    /// Whether a short-reply window is open
    pub fn is_awaiting_reply(&self) -> bool {
        self.inner.state.lock().reply_window.is_some()
    }

    /// Whether a `speak` call is in progress
    pub fn is_speaking(&self) -> bool {
        self.inner.state.lock().current_token.is_some() || self.inner.synthesis.is_speaking()
    }

    /// Recent conversation turns, oldest first
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.inner.state.lock().history.iter().cloned().collect()
    }

    /// Subscribe to orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.inner.events.subscribe()
    }

    /// Switch recognition and synthesis language
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        self.inner.recognition.set_language(&language);
        info!(language = %language, "Voice language changed");
        self.inner.state.lock().language = language;
    }

    /// Register a voice command
    pub fn register_command<F, Fut>(
        &self,
        name: impl Into<String>,
        pattern: CommandPattern,
        handler: F,
    ) -> CommandId
    where
        F: Fn(CommandInvocation) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.router.write().register(name, pattern, handler)
    }

    /// Remove a voice command, returning whether it was registered
    pub fn unregister_command(&self, id: CommandId) -> bool {
        self.inner.router.write().unregister(id)
    }

    /// Stop everything and release platform resources
    pub async fn dispose(&self) {
        self.disable_voice_detection_mode().await;
        self.inner.synthesis.cancel();
        self.inner.recognition.dispose();
        self.inner.primary.dispose().await;
        self.inner.energy.dispose().await;
        info!("Speech orchestrator disposed");
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn snapshot_locked(&self, state: &VoiceState) -> VoiceStateSnapshot {
        VoiceStateSnapshot {
            listening: state.want_listening,
            tts_enabled: self.inner.synthesis.is_enabled(),
            language: state.language.clone(),
        }
    }

    /// Append a turn, dropping the oldest beyond `history_len`
    ///
    /// A zero length keeps no history.
    fn remember(&self, turn: ConversationTurn) {
        let cap = self.inner.config.history_len;
        if cap == 0 {
            return;
        }
        let mut state = self.inner.state.lock();
        while state.history.len() >= cap {
            state.history.pop_front();
        }
        state.history.push_back(turn);
    }

    fn detector(&self, kind: DetectorKind) -> &VoiceDetector {
        match kind {
            DetectorKind::Primary => &self.inner.primary,
            DetectorKind::Energy => &self.inner.energy,
        }
    }

    fn spawn_pumps(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut recognition = self.inner.recognition.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match recognition.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Recognition events lagged");
                        continue;
                    },
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                Self { inner }.on_recognition_event(event);
            }
        });

        for detector in [&self.inner.primary, &self.inner.energy] {
            let weak = Arc::downgrade(&self.inner);
            let mut events = detector.subscribe();
            tokio::spawn(async move {
                loop {
                    let event = match events.recv().await {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Detector events lagged");
                            continue;
                        },
                        Err(RecvError::Closed) => break,
                    };
                    let Some(inner) = weak.upgrade() else { break };
                    Self { inner }.on_detector_event(event);
                }
            });
        }
    }

    fn on_recognition_event(&self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => self.emit(OrchestratorEvent::RecognitionStarted),
            RecognitionEvent::Result(transcript) => {
                let outcome = self.process_transcript(transcript);
                debug!(?outcome, "Transcript processed");
            },
            RecognitionEvent::Ended => {
                self.emit(OrchestratorEvent::RecognitionEnded);
                self.schedule_detector_restart();
            },
            RecognitionEvent::Error(reason) => {
                self.emit(OrchestratorEvent::RecognitionError { reason });
            },
        }
    }

    fn on_detector_event(&self, event: DetectorEvent) {
        match event {
            DetectorEvent::SpeechStart(kind) => {
                let this = self.clone();
                tokio::spawn(async move { this.on_speech_start(kind).await });
            },
            DetectorEvent::SpeechEnd(kind) => debug!(%kind, "Speech offset"),
            DetectorEvent::Error(kind, reason) => {
                warn!(%kind, reason = %reason, "Voice detector error");
            },
        }
    }
}
