//! Port definitions for platform speech engines
//!
//! Defines the traits (ports) that platform adapters must implement. The
//! engines only expose raw start/stop primitives and report lifecycle
//! signals through a sink; all state tracking, de-duplication and timeout
//! recovery lives in the wrappers of this crate.

use async_trait::async_trait;

use crate::detector::ActivitySink;
use crate::error::SpeechError;
use crate::recognition::RecognitionSink;
use crate::synthesis::SynthesisSink;
use crate::types::Utterance;

/// Port for a platform speech-to-text engine
///
/// Mirrors the shape of browser-style recognizers: `start` returns as soon as
/// the request was accepted (or refused), and confirmation arrives later via
/// [`RecognitionSink::started`]. Calling `start` while running is an error on
/// most platforms, which is why callers go through
/// [`RecognitionSession`](crate::RecognitionSession).
pub trait RecognitionEngine: Send + Sync {
    /// Short engine identifier for diagnostics
    fn name(&self) -> &str;

    /// Whether the platform offers speech recognition at all
    fn is_supported(&self) -> bool;

    /// Request a new recognition session
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the platform refuses the request.
    fn start(&self, sink: RecognitionSink) -> Result<(), SpeechError>;

    /// Gracefully stop; the platform delivers pending results, then `ended`
    fn stop(&self);

    /// Stop immediately, discarding pending results
    fn abort(&self);

    /// Switch recognition language for subsequent sessions
    fn set_language(&self, _language: &str) {}
}

/// Port for a platform text-to-speech engine
pub trait SynthesisEngine: Send + Sync {
    /// Short engine identifier for diagnostics
    fn name(&self) -> &str;

    /// Whether the platform offers speech synthesis at all
    fn is_supported(&self) -> bool;

    /// Queue an utterance for playback; completion is reported via `sink`
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the utterance could not be queued.
    fn speak(&self, utterance: Utterance, sink: SynthesisSink) -> Result<(), SpeechError>;

    /// Stop current playback and drop anything queued
    fn cancel(&self);
}

/// Port for a continuous voice-activity detector
///
/// Starting usually acquires the microphone and may load a model, so it is
/// asynchronous and may fail (for example on browsers without the required
/// audio worklet support).
#[async_trait]
pub trait VoiceActivityEngine: Send + Sync {
    /// Short engine identifier for diagnostics
    fn name(&self) -> &str;

    /// Acquire the microphone and begin reporting speech onsets
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if initialization fails.
    async fn start(&self, sink: ActivitySink) -> Result<(), SpeechError>;

    /// Stop reporting and release the microphone
    async fn stop(&self);

    /// Release any model or stream handles permanently
    fn dispose(&self) {}
}
