//! Voice-activity detector wrapper
//!
//! Adds idempotent start/stop and a lifecycle state to a raw
//! [`VoiceActivityEngine`]. Speech onsets are only forwarded while the
//! detector is active, so a late callback after `stop` never wakes anyone.

use std::fmt;
use std::sync::{Arc, Weak};

use domain::{DetectorKind, DetectorState};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::SpeechError;
use crate::ports::VoiceActivityEngine;
use crate::types::DetectorEvent;

const EVENT_CAPACITY: usize = 32;

/// A voice-activity detector with tracked lifecycle
#[derive(Clone)]
pub struct VoiceDetector {
    inner: Arc<DetectorInner>,
}

struct DetectorInner {
    kind: DetectorKind,
    engine: Arc<dyn VoiceActivityEngine>,
    op: tokio::sync::Mutex<()>,
    state: Mutex<Lifecycle>,
    events: broadcast::Sender<DetectorEvent>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: DetectorState,
    generation: u64,
}

impl fmt::Debug for VoiceDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceDetector")
            .field("kind", &self.inner.kind)
            .field("engine", &self.inner.engine.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl VoiceDetector {
    /// Wrap an activity engine as the detector of the given kind
    pub fn new(kind: DetectorKind, engine: Arc<dyn VoiceActivityEngine>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(DetectorInner {
                kind,
                engine,
                op: tokio::sync::Mutex::new(()),
                state: Mutex::new(Lifecycle::default()),
                events,
            }),
        }
    }

    /// Which detector this is
    pub fn kind(&self) -> DetectorKind {
        self.inner.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> DetectorState {
        self.inner.state.lock().state
    }

    /// Whether the detector is listening for speech
    pub fn is_active(&self) -> bool {
        self.state() == DetectorState::Active
    }

    /// Subscribe to speech onset/offset events
    pub fn subscribe(&self) -> broadcast::Receiver<DetectorEvent> {
        self.inner.events.subscribe()
    }

    /// Start the detector; a no-op when already active
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the engine fails to initialize.
    #[instrument(skip(self), fields(kind = %self.inner.kind))]
    pub async fn start(&self) -> Result<(), SpeechError> {
        let _op = self.inner.op.lock().await;
        let generation = {
            let mut lifecycle = self.inner.state.lock();
            if lifecycle.state == DetectorState::Active {
                return Ok(());
            }
            lifecycle.state = DetectorState::Starting;
            lifecycle.generation += 1;
            lifecycle.generation
        };

        let sink = ActivitySink {
            inner: Arc::downgrade(&self.inner),
            generation,
        };
        let result = self.inner.engine.start(sink).await;

        let mut lifecycle = self.inner.state.lock();
        match result {
            Ok(()) => {
                lifecycle.state = DetectorState::Active;
                info!(engine = self.inner.engine.name(), "Voice detector active");
                Ok(())
            },
            Err(e) => {
                lifecycle.state = DetectorState::Idle;
                warn!(error = %e, "Voice detector failed to start");
                Err(e)
            },
        }
    }

    /// Stop the detector; a no-op when idle
    #[instrument(skip(self), fields(kind = %self.inner.kind))]
    pub async fn stop(&self) {
        let _op = self.inner.op.lock().await;
        {
            let mut lifecycle = self.inner.state.lock();
            if lifecycle.state == DetectorState::Idle {
                return;
            }
            lifecycle.generation += 1;
        }
        self.inner.engine.stop().await;
        self.inner.state.lock().state = DetectorState::Idle;
        debug!("Voice detector stopped");
    }

    /// Stop and release the engine permanently
    pub async fn dispose(&self) {
        self.stop().await;
        self.inner.engine.dispose();
    }
}

impl DetectorInner {
    fn emit(&self, generation: u64, event: DetectorEvent) {
        let lifecycle = self.state.lock();
        if lifecycle.generation != generation || lifecycle.state != DetectorState::Active {
            return;
        }
        let _ = self.events.send(event);
    }
}

/// Handle through which an activity engine reports speech boundaries
#[derive(Clone)]
pub struct ActivitySink {
    inner: Weak<DetectorInner>,
    generation: u64,
}

impl fmt::Debug for ActivitySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ActivitySink {
    /// Speech onset
    pub fn speech_start(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.emit(self.generation, DetectorEvent::SpeechStart(inner.kind));
        }
    }

    /// Speech offset
    pub fn speech_end(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.emit(self.generation, DetectorEvent::SpeechEnd(inner.kind));
        }
    }

    /// Runtime error inside the engine
    pub fn error(&self, reason: impl Into<String>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.emit(self.generation, DetectorEvent::Error(inner.kind, reason.into()));
        }
    }
}
