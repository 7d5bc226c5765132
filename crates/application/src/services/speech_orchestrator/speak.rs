//! Spoken output with listen-suspend and resume

use std::future::Future;

use ai_speech::SpeakOptions;
use domain::{ListeningMode, SpeakToken};
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use super::{OrchestratorEvent, SpeechOrchestrator};

impl SpeechOrchestrator {
    /// Speak `text`, suspending all listening while it plays
    ///
    /// Recognition and both detectors are fully stopped before playback
    /// starts. Afterwards, if no newer `speak` call has superseded this one
    /// and detection mode is still on, the previously used detector is
    /// resumed after a settle delay. Resolves `true` if playback finished
    /// normally.
    #[instrument(skip(self, text, options), fields(chars = text.len()))]
    pub async fn speak(&self, text: &str, options: SpeakOptions) -> bool {
        let synthesis = &self.inner.synthesis;
        if text.trim().is_empty() || !synthesis.is_enabled() || !synthesis.is_supported() {
            debug!("Nothing to speak, listening untouched");
            return false;
        }

        let token = SpeakToken::new();
        let (options, defer) = {
            let mut state = self.inner.state.lock();
            state.current_token = Some(token);
            state.resume.cancel();
            state.restart.cancel();

            let detector_running =
                self.inner.primary.is_active() || self.inner.energy.is_active();
            let recognizing = self.inner.recognition.state().holds_microphone();
            // Detection mode covers a detector restart still waiting to run.
            if state.want_listening || detector_running || recognizing {
                state.suspended_by_tts = true;
                state.suspended_detector_was_running |= detector_running;
            }
            let defer = state.want_listening && state.mode.is_listening();

            let options = SpeakOptions {
                language: options.language.or_else(|| Some(state.language.clone())),
                ..options
            };
            (options, defer)
        };
        if defer {
            self.set_mode(ListeningMode::Deferred);
        }
        debug!(%token, "Suspending listening for speech");

        self.release_microphone().await;
        let spoken = self.inner.synthesis.speak_async(text, options).await;

        let mut state = self.inner.state.lock();
        if state.current_token != Some(token) {
            debug!(%token, "Superseded by newer speech, leaving resume to it");
            return spoken;
        }
        state.current_token = None;
        state.cooldown_until = Some(Instant::now() + self.inner.config.post_tts_cooldown());

        if state.suspended_by_tts && state.want_listening {
            let delay = self
                .inner
                .config
                .resume_delay(state.suspended_detector_was_running);
            let epoch = state.resume.arm();
            let this = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                this.resume_after_speech(epoch).await;
            });
            state.resume.set_handle(handle.abort_handle());
            debug!(?delay, "Resume scheduled");
        } else {
            state.suspended_by_tts = false;
            state.suspended_detector_was_running = false;
        }
        spoken
    }

    /// Speak `text` after everything queued before it
    ///
    /// Items play strictly in call order; a failed item does not hold up the
    /// ones behind it. The position in the queue is taken when this method is
    /// called, not when the returned future is first polled.
    pub fn speak_queued(
        &self,
        text: impl Into<String>,
        options: SpeakOptions,
    ) -> impl Future<Output = bool> + Send + 'static {
        let done = self.enqueue_speech(text.into(), options);
        async move { done.await.unwrap_or(false) }
    }

    pub(super) fn enqueue_speech(
        &self,
        text: String,
        options: SpeakOptions,
    ) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        let mut tail = self.inner.queue_tail.lock();
        let previous = tail.clone();
        let task = tokio::spawn(async move {
            previous.await;
            let spoken = this.speak(&text, options).await;
            let _ = tx.send(spoken);
        });
        *tail = async move {
            let _ = task.await;
        }
        .boxed()
        .shared();
        rx
    }

    /// Enable or disable spoken output
    ///
    /// Playback already in flight is not interrupted.
    pub fn set_tts_enabled(&self, enabled: bool) {
        if self.inner.synthesis.set_enabled(enabled) {
            info!(enabled, "Spoken output toggled");
            self.emit(OrchestratorEvent::TtsEnabledChanged { enabled });
        }
    }

    /// Stop current playback
    pub fn cancel_speech(&self) {
        self.inner.synthesis.cancel();
    }
}
