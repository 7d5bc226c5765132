//! Synthesis gate - single-utterance wrapper around a text-to-speech engine
//!
//! Every new utterance cancels the one in flight, and an utterance the
//! platform never finishes is cancelled after a timeout so callers are never
//! left waiting.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use crate::config::SpeechConfig;
use crate::ports::SynthesisEngine;
use crate::types::{SpeakOptions, Utterance};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PlaybackEnd {
    Finished,
    Failed(String),
    Cancelled,
}

struct InFlight {
    id: u64,
    started: bool,
    done: oneshot::Sender<PlaybackEnd>,
}

/// Text-to-speech gate with cancel-before-speak semantics
#[derive(Clone)]
pub struct SynthesisGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    engine: Arc<dyn SynthesisEngine>,
    config: SpeechConfig,
    enabled: AtomicBool,
    next_id: AtomicU64,
    op: Mutex<()>,
    current: Mutex<Option<InFlight>>,
}

impl fmt::Debug for SynthesisGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisGate")
            .field("engine", &self.inner.engine.name())
            .field("enabled", &self.is_enabled())
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl SynthesisGate {
    /// Wrap a platform engine; output starts enabled
    pub fn new(engine: Arc<dyn SynthesisEngine>, config: SpeechConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                engine,
                config,
                enabled: AtomicBool::new(true),
                next_id: AtomicU64::new(1),
                op: Mutex::new(()),
                current: Mutex::new(None),
            }),
        }
    }

    /// Whether the platform supports synthesis
    pub fn is_supported(&self) -> bool {
        self.inner.engine.is_supported()
    }

    /// Whether spoken output is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable spoken output, returning whether the flag changed
    ///
    /// Only later calls to [`speak_async`](Self::speak_async) observe the
    /// flag; playback already in flight is left alone.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.inner.enabled.swap(enabled, Ordering::AcqRel) != enabled
    }

    /// Whether an utterance is currently in flight
    pub fn is_speaking(&self) -> bool {
        self.inner.current.lock().is_some()
    }

    /// Speak `text`, resolving when playback finishes
    ///
    /// Returns `false` without touching the engine when output is disabled,
    /// the text is blank or the platform lacks synthesis. Otherwise anything
    /// in flight is cancelled first, and the call resolves `true` on normal
    /// completion or `false` on error, cancellation or timeout.
    #[instrument(skip(self, text, options), fields(chars = text.len()))]
    pub async fn speak_async(&self, text: &str, options: SpeakOptions) -> bool {
        let text = text.trim();
        if !self.is_enabled() || text.is_empty() || !self.is_supported() {
            debug!("Synthesis skipped");
            return false;
        }

        let timeout = options.timeout.unwrap_or_else(|| self.inner.config.speak_timeout());
        let utterance = self.utterance(text, options);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let _op = self.inner.op.lock();
            self.inner.cancel_locked();
            *self.inner.current.lock() = Some(InFlight {
                id,
                started: false,
                done: tx,
            });
            let sink = SynthesisSink {
                inner: Arc::downgrade(&self.inner),
                id,
            };
            if let Err(e) = self.inner.engine.speak(utterance, sink) {
                warn!(error = %e, "Synthesis engine refused utterance");
                self.inner.finish(id, PlaybackEnd::Failed(e.to_string()));
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(PlaybackEnd::Finished)) => true,
            Ok(Ok(PlaybackEnd::Failed(reason))) => {
                debug!(reason = %reason, "Synthesis failed");
                false
            },
            Ok(Ok(PlaybackEnd::Cancelled) | Err(_)) => false,
            Err(_) => {
                warn!(timeout = ?timeout, "Synthesis never completed, cancelling");
                let _op = self.inner.op.lock();
                let stale = {
                    let mut current = self.inner.current.lock();
                    if current.as_ref().is_some_and(|c| c.id == id) {
                        current.take()
                    } else {
                        None
                    }
                };
                if stale.is_some() {
                    self.inner.engine.cancel();
                }
                false
            },
        }
    }

    /// Cancel current playback; safe to call when idle
    pub fn cancel(&self) {
        let _op = self.inner.op.lock();
        self.inner.cancel_locked();
    }

    fn utterance(&self, text: &str, options: SpeakOptions) -> Utterance {
        let config = &self.inner.config;
        Utterance {
            text: text.to_string(),
            voice: options.voice.or_else(|| config.default_voice.clone()),
            language: options.language.unwrap_or_else(|| config.language.clone()),
            rate: options.rate.unwrap_or(config.rate),
            pitch: options.pitch.unwrap_or(1.0),
            volume: options.volume.unwrap_or(1.0),
        }
    }
}

impl GateInner {
    /// Caller must hold `op`
    fn cancel_locked(&self) {
        let previous = self.current.lock().take();
        if let Some(in_flight) = previous {
            debug!(id = in_flight.id, started = in_flight.started, "Cancelling utterance");
            let _ = in_flight.done.send(PlaybackEnd::Cancelled);
            self.engine.cancel();
        }
    }

    fn finish(&self, id: u64, end: PlaybackEnd) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| c.id == id) {
            if let Some(in_flight) = current.take() {
                let _ = in_flight.done.send(end);
            }
        }
    }

    fn mark_started(&self, id: u64) {
        if let Some(in_flight) = self.current.lock().as_mut().filter(|c| c.id == id) {
            in_flight.started = true;
        }
    }
}

/// Handle through which a synthesis engine reports playback progress
#[derive(Clone)]
pub struct SynthesisSink {
    inner: Weak<GateInner>,
    id: u64,
}

impl fmt::Debug for SynthesisSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisSink")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl SynthesisSink {
    /// Playback began
    pub fn started(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.mark_started(self.id);
        }
    }

    /// Playback finished normally
    pub fn ended(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.finish(self.id, PlaybackEnd::Finished);
        }
    }

    /// Playback failed
    pub fn error(&self, reason: impl Into<String>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.finish(self.id, PlaybackEnd::Failed(reason.into()));
        }
    }
}
