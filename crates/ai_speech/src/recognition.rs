//! Recognition session - concurrency-safe wrapper around a speech-to-text engine
//!
//! The session tracks `idle → starting → listening → stopping → idle` and
//! guarantees that at most one platform start and one platform stop are ever
//! in flight. Concurrent callers attach to the outstanding operation instead of
//! issuing a second platform call:
//!
//! ```text
//!  start() ──┐                    ┌── stop()
//!  start() ──┼─▶ starting handle  │
//!            │        │           ▼
//!            │        ▼     stopping handle ──▶ guard timer (force abort)
//!            └──── waits for ─────┘
//! ```
//!
//! Platform signals are tagged with the generation of the start that produced
//! them, so late events from an aborted session cannot corrupt a newer one.

use std::fmt;
use std::sync::{Arc, Weak};

use domain::{RecognitionState, Transcript};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::config::SpeechConfig;
use crate::ports::RecognitionEngine;
use crate::types::RecognitionEvent;

const EVENT_CAPACITY: usize = 64;

type Pending = Shared<BoxFuture<'static, bool>>;

/// Speech-recognition session with idempotent start/stop
#[derive(Clone)]
pub struct RecognitionSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    engine: Arc<dyn RecognitionEngine>,
    config: SpeechConfig,
    /// Serializes a state transition together with the engine call it implies
    op: Mutex<()>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<RecognitionEvent>,
}

#[derive(Default)]
struct SessionState {
    status: RecognitionState,
    generation: u64,
    starting: Option<Pending>,
    stopping: Option<Pending>,
    start_waiter: Option<oneshot::Sender<bool>>,
    stop_waiter: Option<oneshot::Sender<()>>,
}

impl SessionState {
    /// Take a lifecycle step, refusing illegal ones
    fn advance(&mut self, next: RecognitionState) {
        match self.status.transition(next) {
            Ok(status) => self.status = status,
            Err(e) => warn!(error = %e, "Refusing recognition state change"),
        }
    }

    /// Resolve every outstanding waiter and return to idle
    fn settle_idle(&mut self) {
        self.status = RecognitionState::Idle;
        self.starting = None;
        self.stopping = None;
        if let Some(waiter) = self.start_waiter.take() {
            let _ = waiter.send(false);
        }
        if let Some(waiter) = self.stop_waiter.take() {
            let _ = waiter.send(());
        }
    }
}

enum StartStep {
    Done(bool),
    Attach(Pending),
    AwaitStop(Pending),
}

enum StopStep {
    Done(bool),
    Attach(Pending),
}

impl fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("engine", &self.inner.engine.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RecognitionSession {
    /// Wrap a platform engine
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: SpeechConfig) -> Self {
        engine.set_language(&config.language);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                engine,
                config,
                op: Mutex::new(()),
                state: Mutex::new(SessionState::default()),
                events,
            }),
        }
    }

    /// Whether the platform supports recognition
    pub fn is_supported(&self) -> bool {
        self.inner.engine.is_supported()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RecognitionState {
        self.inner.state.lock().status
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<RecognitionEvent> {
        self.inner.events.subscribe()
    }

    /// Switch the recognition language
    pub fn set_language(&self, language: &str) {
        self.inner.engine.set_language(language);
    }

    /// Start listening
    ///
    /// Returns `true` once the platform confirms listening and `false` if the
    /// start failed. Concurrent calls share one platform start; a start issued
    /// while a stop is in flight waits for the stop to finish first.
    #[instrument(skip(self), fields(engine = self.inner.engine.name()))]
    pub async fn start(&self) -> bool {
        loop {
            match SessionInner::begin_start(&self.inner) {
                StartStep::Done(result) => return result,
                StartStep::Attach(pending) => return pending.await,
                StartStep::AwaitStop(pending) => {
                    debug!("Stop in flight, waiting before start");
                    pending.await;
                },
            }
        }
    }

    /// Stop listening
    ///
    /// Returns `true` once the session is idle. A stop that the platform never
    /// confirms is force-aborted after the stop guard and still reported as
    /// successful.
    #[instrument(skip(self), fields(engine = self.inner.engine.name()))]
    pub async fn stop(&self) -> bool {
        match SessionInner::begin_stop(&self.inner) {
            StopStep::Done(result) => result,
            StopStep::Attach(pending) => pending.await,
        }
    }

    /// Abort the engine and drop all outstanding operations
    pub fn dispose(&self) {
        let _op = self.inner.op.lock();
        self.inner.engine.abort();
        let mut state = self.inner.state.lock();
        let was_active = state.status != RecognitionState::Idle;
        state.generation += 1;
        state.settle_idle();
        if was_active {
            let _ = self.inner.events.send(RecognitionEvent::Ended);
        }
        info!("Recognition session disposed");
    }
}

impl SessionInner {
    fn begin_start(this: &Arc<Self>) -> StartStep {
        if !this.engine.is_supported() {
            debug!("Recognition unsupported, refusing start");
            return StartStep::Done(false);
        }

        let _op = this.op.lock();
        let generation = {
            let mut state = this.state.lock();
            match state.status {
                RecognitionState::Listening => return StartStep::Done(true),
                RecognitionState::Starting => {
                    if let Some(pending) = &state.starting {
                        return StartStep::Attach(pending.clone());
                    }
                },
                RecognitionState::Stopping => {
                    if let Some(pending) = &state.stopping {
                        return StartStep::AwaitStop(pending.clone());
                    }
                },
                RecognitionState::Idle => {},
            }

            state.generation += 1;
            state.advance(RecognitionState::Starting);
            let (tx, rx) = oneshot::channel();
            state.start_waiter = Some(tx);
            state.starting = Some(Self::watch_start(this, state.generation, rx));
            state.generation
        };

        let sink = RecognitionSink {
            inner: Arc::downgrade(this),
            generation,
        };
        if let Err(e) = this.engine.start(sink) {
            warn!(error = %e, "Recognition engine refused to start");
            let mut state = this.state.lock();
            if state.generation == generation && state.status == RecognitionState::Starting {
                state.settle_idle();
                let _ = this.events.send(RecognitionEvent::Error(e.to_string()));
            }
        }

        let state = this.state.lock();
        match &state.starting {
            Some(pending) if state.generation == generation => StartStep::Attach(pending.clone()),
            _ => StartStep::Done(state.status == RecognitionState::Listening),
        }
    }

    fn watch_start(this: &Arc<Self>, generation: u64, rx: oneshot::Receiver<bool>) -> Pending {
        let inner = Arc::clone(this);
        let timeout = this.config.start_timeout();
        let task = tokio::spawn(async move {
            match tokio::time::timeout(timeout, rx).await {
                Ok(result) => result.unwrap_or(false),
                Err(_) => {
                    inner.expire_start(generation);
                    false
                },
            }
        });
        async move { task.await.unwrap_or(false) }.boxed().shared()
    }

    fn expire_start(&self, generation: u64) {
        let _op = self.op.lock();
        let expired = {
            let mut state = self.state.lock();
            let expired =
                state.generation == generation && state.status == RecognitionState::Starting;
            if expired {
                state.settle_idle();
            }
            expired
        };
        if expired {
            warn!(
                timeout_ms = self.config.start_timeout_ms,
                "Recognition start never confirmed, aborting"
            );
            self.engine.abort();
            let _ = self
                .events
                .send(RecognitionEvent::Error("start-timeout".to_string()));
        }
    }

    fn begin_stop(this: &Arc<Self>) -> StopStep {
        let _op = this.op.lock();
        let (pending, abort) = {
            let mut state = this.state.lock();
            if let Some(pending) = &state.stopping {
                return StopStep::Attach(pending.clone());
            }
            let abort = match state.status {
                RecognitionState::Idle => return StopStep::Done(true),
                RecognitionState::Stopping => {
                    state.settle_idle();
                    return StopStep::Done(true);
                },
                RecognitionState::Starting => true,
                RecognitionState::Listening => false,
            };

            state.advance(RecognitionState::Stopping);
            let (tx, rx) = oneshot::channel();
            state.stop_waiter = Some(tx);
            let pending = Self::guard_stop(this, state.generation, rx);
            state.stopping = Some(pending.clone());
            (pending, abort)
        };

        if abort {
            debug!("Stop requested mid-start, aborting engine");
            this.engine.abort();
        } else {
            this.engine.stop();
        }
        StopStep::Attach(pending)
    }

    fn guard_stop(this: &Arc<Self>, generation: u64, rx: oneshot::Receiver<()>) -> Pending {
        let inner = Arc::clone(this);
        let guard = this.config.stop_guard();
        let task = tokio::spawn(async move {
            if tokio::time::timeout(guard, rx).await.is_err() {
                inner.force_idle(generation);
            }
            true
        });
        async move { task.await.unwrap_or(true) }.boxed().shared()
    }

    fn force_idle(&self, generation: u64) {
        let _op = self.op.lock();
        let forced = {
            let mut state = self.state.lock();
            let forced =
                state.generation == generation && state.status == RecognitionState::Stopping;
            if forced {
                state.settle_idle();
            }
            forced
        };
        if forced {
            warn!(
                guard_ms = self.config.stop_guard_ms,
                "Recognition never ended, forcing abort"
            );
            self.engine.abort();
            let _ = self.events.send(RecognitionEvent::Ended);
        }
    }

    fn on_started(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        match state.status {
            RecognitionState::Starting => {
                state.advance(RecognitionState::Listening);
                state.starting = None;
                if let Some(waiter) = state.start_waiter.take() {
                    let _ = waiter.send(true);
                }
                debug!("Recognition listening");
                let _ = self.events.send(RecognitionEvent::Started);
            },
            RecognitionState::Stopping => {
                // Start lost the race against a stop request.
                state.starting = None;
                if let Some(waiter) = state.start_waiter.take() {
                    let _ = waiter.send(false);
                }
            },
            RecognitionState::Idle | RecognitionState::Listening => {},
        }
    }

    fn on_result(&self, generation: u64, text: &str, is_final: bool, confidence: Option<f32>) {
        if !is_final {
            return;
        }
        let state = self.state.lock();
        if state.generation != generation
            || !matches!(
                state.status,
                RecognitionState::Listening | RecognitionState::Stopping
            )
        {
            return;
        }
        match Transcript::new(text) {
            Ok(transcript) => {
                let transcript = match confidence {
                    Some(c) => transcript.with_confidence(c),
                    None => transcript,
                };
                debug!(transcript = %transcript, "Final recognition result");
                let _ = self.events.send(RecognitionEvent::Result(transcript));
            },
            Err(_) => debug!("Discarding blank recognition result"),
        }
    }

    fn on_error(&self, generation: u64, reason: String) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        match state.status {
            RecognitionState::Starting => {
                warn!(reason = %reason, "Recognition failed to start");
                state.settle_idle();
                let _ = self.events.send(RecognitionEvent::Error(reason));
            },
            RecognitionState::Listening => {
                warn!(reason = %reason, "Recognition error");
                let _ = self.events.send(RecognitionEvent::Error(reason));
            },
            RecognitionState::Stopping => {
                debug!(reason = %reason, "Error while stopping treated as stopped");
                state.settle_idle();
                let _ = self.events.send(RecognitionEvent::Ended);
            },
            RecognitionState::Idle => {},
        }
    }

    fn on_ended(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation || state.status == RecognitionState::Idle {
            return;
        }
        debug!(from = %state.status, "Recognition ended");
        state.settle_idle();
        let _ = self.events.send(RecognitionEvent::Ended);
    }
}

/// Handle through which a recognition engine reports lifecycle signals
///
/// Each sink belongs to one platform start; signals from a sink whose start
/// has been superseded are ignored.
#[derive(Clone)]
pub struct RecognitionSink {
    inner: Weak<SessionInner>,
    generation: u64,
}

impl fmt::Debug for RecognitionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl RecognitionSink {
    /// Platform confirmed it is capturing audio
    pub fn started(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_started(self.generation);
        }
    }

    /// Platform produced a (possibly interim) result
    pub fn result(&self, text: &str, is_final: bool, confidence: Option<f32>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_result(self.generation, text, is_final, confidence);
        }
    }

    /// Platform reported an error
    pub fn error(&self, reason: impl Into<String>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_error(self.generation, reason.into());
        }
    }

    /// Platform session ended
    pub fn ended(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_ended(self.generation);
        }
    }
}
