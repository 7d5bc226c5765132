//! Detection mode, detector hand-over and short-reply windows

use std::time::Duration;

use domain::{DetectorKind, ListeningMode, RecognitionState};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{OrchestratorEvent, ReplyWindow, SpeechOrchestrator, VoiceState};

impl SpeechOrchestrator {
    /// Turn on passive listening
    ///
    /// Starts the primary detector, falling back to the energy detector if
    /// the primary cannot initialize. Returns `Deferred` when speech is
    /// playing (listening starts once it finishes) and `Unavailable` when
    /// the platform cannot recognize speech or no detector starts.
    #[instrument(skip(self))]
    pub async fn enable_voice_detection_mode(&self) -> ListeningMode {
        if !self.inner.recognition.is_supported() {
            info!("Speech recognition unsupported, voice detection unavailable");
            self.set_mode(ListeningMode::Unavailable);
            return ListeningMode::Unavailable;
        }

        {
            let mut state = self.inner.state.lock();
            state.want_listening = true;
            state.preferred = DetectorKind::Primary;
            if state.current_token.is_some() || self.inner.synthesis.is_speaking() {
                state.suspended_by_tts = true;
                drop(state);
                debug!("Speech in progress, listening deferred");
                self.set_mode(ListeningMode::Deferred);
                return ListeningMode::Deferred;
            }
        }

        self.activate_detector().await
    }

    /// Turn off passive listening and stop any recognition session
    #[instrument(skip(self))]
    pub async fn disable_voice_detection_mode(&self) {
        {
            let mut state = self.inner.state.lock();
            state.want_listening = false;
            state.suspended_by_tts = false;
            state.suspended_detector_was_running = false;
            state.resume.cancel();
            state.restart.cancel();
            if let Some(window) = state.reply_window.take() {
                window.timer.abort();
            }
        }
        self.release_microphone().await;
        self.set_mode(ListeningMode::Off);
    }

    /// Listen for a direct answer without waiting for a detector onset
    ///
    /// Opens a reply window and starts recognition right away. If no
    /// transcript arrives within `timeout`, recognition is stopped and
    /// [`OrchestratorEvent::ReplyWindowClosed`] is published. Returns whether
    /// recognition started.
    #[instrument(skip(self))]
    pub async fn expect_short_reply(&self, timeout: Duration) -> bool {
        if !self.inner.recognition.is_supported() {
            return false;
        }

        let window_id = {
            let mut state = self.inner.state.lock();
            if let Some(previous) = state.reply_window.take() {
                previous.timer.abort();
            }
            state.restart.cancel();
            state.next_window_id += 1;
            let id = state.next_window_id;
            let this = self.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                this.close_reply_window(id).await;
            });
            state.reply_window = Some(ReplyWindow {
                id,
                timer: timer.abort_handle(),
            });
            id
        };

        let started = {
            let _mic = self.inner.mic.lock().await;
            self.inner.primary.stop().await;
            self.inner.energy.stop().await;
            self.inner.recognition.start().await
        };

        if !started {
            warn!("Recognition did not start for reply window");
            let closed = {
                let mut state = self.inner.state.lock();
                match state.reply_window.take_if(|w| w.id == window_id) {
                    Some(window) => {
                        window.timer.abort();
                        true
                    },
                    None => false,
                }
            };
            // The detectors were already released for the window.
            if closed {
                self.schedule_detector_restart();
            }
        }
        started
    }

    /// Open the short-reply window with the configured default timeout
    pub async fn expect_reply(&self) -> bool {
        self.expect_short_reply(self.inner.config.reply_timeout()).await
    }

    async fn close_reply_window(&self, id: u64) {
        {
            let mut state = self.inner.state.lock();
            match &state.reply_window {
                Some(window) if window.id == id => state.reply_window = None,
                _ => return,
            }
        }
        info!("Reply window elapsed unanswered, stopping recognition");
        {
            let _mic = self.inner.mic.lock().await;
            self.inner.recognition.stop().await;
        }
        self.emit(OrchestratorEvent::ReplyWindowClosed);
        // Recognition may have ended before the window did, with no end event left to
        // trigger the restart.
        self.schedule_detector_restart();
    }

    /// Stop recognition, then both detectors, holding the microphone lock
    pub(super) async fn release_microphone(&self) {
        let _mic = self.inner.mic.lock().await;
        self.inner.recognition.stop().await;
        self.inner.primary.stop().await;
        self.inner.energy.stop().await;
    }

    pub(super) async fn on_speech_start(&self, kind: DetectorKind) {
        if let Some(reason) = self.speech_start_blocked() {
            debug!(%kind, reason, "Ignoring speech onset");
            return;
        }

        let _mic = self.inner.mic.lock().await;
        if let Some(reason) = self.speech_start_blocked() {
            debug!(%kind, reason, "Ignoring speech onset");
            return;
        }
        let detector = self.detector(kind);
        if !detector.is_active() {
            debug!(%kind, "Detector stopped before onset was handled");
            return;
        }

        detector.stop().await;
        if self.inner.recognition.start().await {
            debug!(%kind, "Recognition opened by speech onset");
            return;
        }

        warn!(%kind, "Recognition failed to start, resuming detector");
        let want_listening = self.inner.state.lock().want_listening;
        if want_listening {
            if let Err(e) = detector.start().await {
                warn!(%kind, error = %e, "Detector could not be resumed");
            }
        }
    }

    fn speech_start_blocked(&self) -> Option<&'static str> {
        let state = self.inner.state.lock();
        if !state.want_listening {
            return Some("detection disabled");
        }
        if state.current_token.is_some() {
            return Some("speech pending");
        }
        if self.inner.synthesis.is_speaking() {
            return Some("synthesis speaking");
        }
        if state.cooldown_until.is_some_and(|until| Instant::now() < until) {
            return Some("post-speech cooldown");
        }
        if state.reply_window.is_some() || self.inner.recognition.state() != RecognitionState::Idle
        {
            return Some("recognition active");
        }
        None
    }

    pub(super) fn schedule_detector_restart(&self) {
        let mut state = self.inner.state.lock();
        if !state.want_listening || state.current_token.is_some() {
            // A pending speak resumes listening itself.
            return;
        }
        let delay = self.inner.config.recognition_restart_delay();
        let epoch = state.restart.arm();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.restart_detector(epoch).await;
        });
        state.restart.set_handle(handle.abort_handle());
    }

    /// Closing an open reply window re-arms this restart, so an open window
    /// only postpones it.
    async fn restart_detector(&self, epoch: u64) {
        {
            let mut state = self.inner.state.lock();
            if !state.restart.claim(epoch) || !self.ready_to_listen(&state) {
                return;
            }
            state.suspended_by_tts = false;
            state.suspended_detector_was_running = false;
        }
        let mode = self.activate_detector().await;
        debug!(?mode, "Detector restarted after recognition");
    }

    pub(super) async fn resume_after_speech(&self, epoch: u64) {
        {
            let mut state = self.inner.state.lock();
            if !state.resume.claim(epoch) {
                return;
            }
            if !self.ready_to_listen(&state) {
                // Whatever holds the microphone now restarts the detector when done.
                debug!("Listening conditions changed, not resuming");
                return;
            }
            state.suspended_by_tts = false;
            state.suspended_detector_was_running = false;
        }
        let mode = self.activate_detector().await;
        info!(?mode, "Listening resumed after speech");
    }

    /// Caller holds the state lock
    fn ready_to_listen(&self, state: &VoiceState) -> bool {
        state.want_listening
            && state.current_token.is_none()
            && state.reply_window.is_none()
            && !self.inner.synthesis.is_speaking()
            && self.inner.recognition.state() == RecognitionState::Idle
    }

    /// Start the preferred detector, falling back to the energy detector
    async fn activate_detector(&self) -> ListeningMode {
        let _mic = self.inner.mic.lock().await;

        let try_primary = match self.activation_gate() {
            Ok(try_primary) => try_primary,
            Err(mode) => {
                if mode == ListeningMode::Deferred {
                    self.set_mode(mode);
                }
                return mode;
            },
        };

        for detector in [&self.inner.primary, &self.inner.energy] {
            if detector.is_active() {
                let mode = ListeningMode::from(detector.kind());
                self.set_mode(mode);
                return mode;
            }
        }

        if try_primary {
            match self.inner.primary.start().await {
                Ok(()) => {
                    self.inner.state.lock().preferred = DetectorKind::Primary;
                    self.set_mode(ListeningMode::Primary);
                    return ListeningMode::Primary;
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        "Primary voice detector failed, falling back to energy detector"
                    );
                    if e.is_permanent() {
                        self.inner.state.lock().primary_unavailable = true;
                    }
                },
            }
        }

        match self.inner.energy.start().await {
            Ok(()) => {
                self.inner.state.lock().preferred = DetectorKind::Energy;
                self.set_mode(ListeningMode::Energy);
                ListeningMode::Energy
            },
            Err(e) => {
                warn!(error = %e, "No voice detector could be started");
                self.set_mode(ListeningMode::Unavailable);
                ListeningMode::Unavailable
            },
        }
    }

    /// `Ok(try_primary)` when a detector may start, otherwise the mode to report
    ///
    /// Restarts stay on the detector that was last started; only an explicit
    /// enable retries the primary after a transient failure.
    fn activation_gate(&self) -> Result<bool, ListeningMode> {
        let mut state = self.inner.state.lock();
        if !state.want_listening {
            return Err(ListeningMode::Off);
        }
        if state.current_token.is_some() || self.inner.synthesis.is_speaking() {
            state.suspended_by_tts = true;
            return Err(ListeningMode::Deferred);
        }
        if self.inner.recognition.state() != RecognitionState::Idle {
            // Recognition owns the microphone; its end restarts the detector.
            return Err(state.mode);
        }
        Ok(state.preferred == DetectorKind::Primary && !state.primary_unavailable)
    }

    pub(super) fn set_mode(&self, mode: ListeningMode) {
        let changed = {
            let mut state = self.inner.state.lock();
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        };
        if changed {
            debug!(?mode, "Listening mode changed");
            self.emit(OrchestratorEvent::ListeningModeChanged { mode });
        }
    }
}
