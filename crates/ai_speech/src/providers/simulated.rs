//! Simulated speech engines
//!
//! In-process stand-ins for platform recognizers, synthesizers and activity
//! detectors. They behave like browser engines (asynchronous confirmations,
//! "already started" errors, hanging stops) and can be scripted from tests or
//! from the CLI simulation.
//!
//! All signals are delivered from spawned tasks, so the engines must be used
//! inside a Tokio runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::detector::ActivitySink;
use crate::error::SpeechError;
use crate::ports::{RecognitionEngine, SynthesisEngine, VoiceActivityEngine};
use crate::recognition::RecognitionSink;
use crate::synthesis::SynthesisSink;
use crate::types::Utterance;

const DEFAULT_START_LATENCY: Duration = Duration::from_millis(20);
const DEFAULT_STOP_LATENCY: Duration = Duration::from_millis(20);
const DEFAULT_UTTERANCE: Duration = Duration::from_millis(300);
const SIMULATED_CONFIDENCE: f32 = 0.92;

/// Scriptable speech-to-text engine
#[derive(Debug)]
pub struct SimulatedRecognitionEngine {
    supported: AtomicBool,
    confirm_start: AtomicBool,
    end_on_stop: AtomicBool,
    start_latency: Mutex<Duration>,
    stop_latency: Mutex<Duration>,
    fail_next_start: Mutex<Option<SpeechError>>,
    language: Mutex<String>,
    running: Arc<Mutex<Option<RecognitionSink>>>,
    epoch: Arc<AtomicU64>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    abort_calls: AtomicUsize,
}

impl Default for SimulatedRecognitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRecognitionEngine {
    /// A well-behaved recognizer
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            confirm_start: AtomicBool::new(true),
            end_on_stop: AtomicBool::new(true),
            start_latency: Mutex::new(DEFAULT_START_LATENCY),
            stop_latency: Mutex::new(DEFAULT_STOP_LATENCY),
            fail_next_start: Mutex::new(None),
            language: Mutex::new("en-US".to_string()),
            running: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            abort_calls: AtomicUsize::new(0),
        }
    }

    /// A platform without speech recognition
    pub fn unsupported() -> Self {
        let engine = Self::new();
        engine.supported.store(false, Ordering::Release);
        engine
    }

    /// Delay before `started` is reported
    #[must_use]
    pub fn with_start_latency(self, latency: Duration) -> Self {
        *self.start_latency.lock() = latency;
        self
    }

    /// Delay between `stop` and the `ended` signal
    #[must_use]
    pub fn with_stop_latency(self, latency: Duration) -> Self {
        *self.stop_latency.lock() = latency;
        self
    }

    /// Never report `ended` after a graceful stop
    pub fn hang_on_stop(&self, hang: bool) {
        self.end_on_stop.store(!hang, Ordering::Release);
    }

    /// Never confirm a start
    pub fn hang_on_start(&self, hang: bool) {
        self.confirm_start.store(!hang, Ordering::Release);
    }

    /// Refuse the next `start` call with `error`
    pub fn fail_next_start(&self, error: SpeechError) {
        *self.fail_next_start.lock() = Some(error);
    }

    /// Whether the engine believes a session is running
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Number of platform `start` calls
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::Acquire)
    }

    /// Number of platform `stop` calls
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::Acquire)
    }

    /// Number of platform `abort` calls
    pub fn abort_calls(&self) -> usize {
        self.abort_calls.load(Ordering::Acquire)
    }

    /// Language most recently configured
    pub fn language(&self) -> String {
        self.language.lock().clone()
    }

    /// Deliver a final result to the running session
    pub fn emit_result(&self, text: &str) {
        if let Some(sink) = self.running.lock().clone() {
            sink.result(text, true, Some(SIMULATED_CONFIDENCE));
        }
    }

    /// Deliver an interim result to the running session
    pub fn emit_interim(&self, text: &str) {
        if let Some(sink) = self.running.lock().clone() {
            sink.result(text, false, None);
        }
    }

    /// Report a runtime error to the running session
    pub fn emit_error(&self, reason: &str) {
        if let Some(sink) = self.running.lock().clone() {
            sink.error(reason);
        }
    }

    /// End the running session as if the platform timed out on silence
    pub fn emit_end(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let sink = self.running.lock().take();
        if let Some(sink) = sink {
            sink.ended();
        }
    }

    fn schedule_end(&self, delay: Duration) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.epoch);
        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::Acquire) != epoch {
                return;
            }
            let sink = running.lock().take();
            if let Some(sink) = sink {
                sink.ended();
            }
        });
    }
}

impl RecognitionEngine for SimulatedRecognitionEngine {
    fn name(&self) -> &str {
        "simulated-recognition"
    }

    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::Acquire)
    }

    fn start(&self, sink: RecognitionSink) -> Result<(), SpeechError> {
        self.start_calls.fetch_add(1, Ordering::AcqRel);
        if let Some(error) = self.fail_next_start.lock().take() {
            return Err(error);
        }
        {
            let mut running = self.running.lock();
            if running.is_some() {
                return Err(SpeechError::AlreadyStarted);
            }
            *running = Some(sink.clone());
        }

        if !self.confirm_start.load(Ordering::Acquire) {
            debug!("Simulated recognizer swallowing start");
            return Ok(());
        }

        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.epoch);
        let latency = *self.start_latency.lock();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if current.load(Ordering::Acquire) == epoch {
                sink.started();
            }
        });
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::AcqRel);
        if !self.end_on_stop.load(Ordering::Acquire) {
            debug!("Simulated recognizer ignoring stop");
            return;
        }
        let latency = *self.stop_latency.lock();
        self.schedule_end(latency);
    }

    fn abort(&self) {
        self.abort_calls.fetch_add(1, Ordering::AcqRel);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let sink = self.running.lock().take();
        if let Some(sink) = sink {
            tokio::spawn(async move { sink.ended() });
        }
    }

    fn set_language(&self, language: &str) {
        language.clone_into(&mut self.language.lock());
    }
}

/// Scriptable text-to-speech engine
#[derive(Debug)]
pub struct SimulatedSynthesisEngine {
    supported: AtomicBool,
    hang: AtomicBool,
    default_duration: Mutex<Duration>,
    durations: Mutex<HashMap<String, Duration>>,
    fail_next: Mutex<Option<SpeechError>>,
    spoken: Mutex<Vec<String>>,
    current: Arc<Mutex<Option<SynthesisSink>>>,
    epoch: Arc<AtomicU64>,
    cancel_calls: AtomicUsize,
}

impl Default for SimulatedSynthesisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSynthesisEngine {
    /// A well-behaved synthesizer
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            hang: AtomicBool::new(false),
            default_duration: Mutex::new(DEFAULT_UTTERANCE),
            durations: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            spoken: Mutex::new(Vec::new()),
            current: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    /// A platform without speech synthesis
    pub fn unsupported() -> Self {
        let engine = Self::new();
        engine.supported.store(false, Ordering::Release);
        engine
    }

    /// Playback time for utterances without an explicit duration
    #[must_use]
    pub fn with_default_duration(self, duration: Duration) -> Self {
        *self.default_duration.lock() = duration;
        self
    }

    /// Playback time for one specific text
    pub fn set_duration(&self, text: &str, duration: Duration) {
        self.durations.lock().insert(text.to_string(), duration);
    }

    /// Never report completion
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::Release);
    }

    /// Refuse the next utterance with `error`
    pub fn fail_next(&self, error: SpeechError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Texts handed to the engine, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    /// Number of platform `cancel` calls
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::Acquire)
    }

    /// Whether an utterance is playing
    pub fn is_playing(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl SynthesisEngine for SimulatedSynthesisEngine {
    fn name(&self) -> &str {
        "simulated-synthesis"
    }

    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::Acquire)
    }

    fn speak(&self, utterance: Utterance, sink: SynthesisSink) -> Result<(), SpeechError> {
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }
        self.spoken.lock().push(utterance.text.clone());
        *self.current.lock() = Some(sink.clone());
        sink.started();

        if self.hang.load(Ordering::Acquire) {
            debug!(text = %utterance.text, "Simulated synthesizer hanging");
            return Ok(());
        }

        let duration = self
            .durations
            .lock()
            .get(&utterance.text)
            .copied()
            .unwrap_or_else(|| *self.default_duration.lock());
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let current_epoch = Arc::clone(&self.epoch);
        let current = Arc::clone(&self.current);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if current_epoch.load(Ordering::Acquire) != epoch {
                return;
            }
            current.lock().take();
            sink.ended();
        });
        Ok(())
    }

    fn cancel(&self) {
        self.cancel_calls.fetch_add(1, Ordering::AcqRel);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.current.lock().take();
    }
}

/// Scriptable voice-activity engine
#[derive(Debug)]
pub struct SimulatedActivityEngine {
    name: String,
    fail_init: AtomicBool,
    busy_once: AtomicBool,
    sink: Mutex<Option<ActivitySink>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl SimulatedActivityEngine {
    /// A detector that initializes successfully
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_init: AtomicBool::new(false),
            busy_once: AtomicBool::new(false),
            sink: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Make every start fail as if the model could not be loaded
    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::Release);
    }

    /// Make only the next start fail, with a transient error
    pub fn fail_next_start(&self) {
        self.busy_once.store(true, Ordering::Release);
    }

    /// Whether the engine currently holds the microphone
    pub fn is_running(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Number of `start` calls
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::Acquire)
    }

    /// Number of `stop` calls
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::Acquire)
    }

    /// Report a speech onset
    pub fn trigger_speech_start(&self) {
        if let Some(sink) = self.sink.lock().clone() {
            sink.speech_start();
        }
    }

    /// Report a speech offset
    pub fn trigger_speech_end(&self) {
        if let Some(sink) = self.sink.lock().clone() {
            sink.speech_end();
        }
    }
}

#[async_trait]
impl VoiceActivityEngine for SimulatedActivityEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, sink: ActivitySink) -> Result<(), SpeechError> {
        self.start_calls.fetch_add(1, Ordering::AcqRel);
        if self.fail_init.load(Ordering::Acquire) {
            return Err(SpeechError::Unsupported(format!(
                "{} could not initialize",
                self.name
            )));
        }
        if self.busy_once.swap(false, Ordering::AcqRel) {
            return Err(SpeechError::StartFailed(format!("{} is busy", self.name)));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::AcqRel);
        self.sink.lock().take();
    }

    fn dispose(&self) {
        self.sink.lock().take();
    }
}
