use crate::app_error::AppError;
use crate::audio_manager::AudioManager;
use crate::config::SequencerConfig;
use crate::events::{InteractionKind, PresentationSink, TelemetryEvent, TelemetrySink};
use crate::models::{DisplayState, SessionSummary};
use crate::phase_sequencer::{PhaseSequencer, SequencerContext};
use crate::runtime_state::SessionState;
use crate::session_tracker::SessionTracker;
use crate::timer_set::{ActiveFlag, TimerSet};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started {
        session_id: String,
        with_preamble: bool,
    },
    AlreadyActive,
    AudioUnavailable,
}

#[derive(Debug, Clone)]
pub struct StopReport {
    pub summary: SessionSummary,
    /// True when the completion notification was sent (at least one full cycle).
    pub completion_shown: bool,
    pub cancelled_timers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Toggle,
    Stop,
}

impl KeyAction {
    /// Accepts DOM `key` and `code` spellings.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            " " | "Space" | "Spacebar" => Some(KeyAction::Toggle),
            "Escape" | "Esc" => Some(KeyAction::Stop),
            _ => None,
        }
    }
}

/// Owns the session lifecycle: the active flag, the pending timers and the audio handle.
pub struct SessionController {
    config: SequencerConfig,
    state: Arc<Mutex<SessionState>>,
    tracker: Arc<Mutex<SessionTracker>>,
    audio: Arc<AudioManager>,
    presenter: Arc<dyn PresentationSink>,
    telemetry: Arc<dyn TelemetrySink>,
    timers: TimerSet,
    active: Option<ActiveFlag>,
}

impl SessionController {
    pub fn new(
        config: SequencerConfig,
        audio: Arc<AudioManager>,
        presenter: Arc<dyn PresentationSink>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let mut state = SessionState::new(config.idle_scale);
        state.is_muted = audio.is_muted();
        presenter.render(&state.display_state());
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
            tracker: Arc::new(Mutex::new(SessionTracker::new())),
            audio,
            presenter,
            telemetry,
            timers: TimerSet::new(),
            active: None,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn audio(&self) -> Arc<AudioManager> {
        Arc::clone(&self.audio)
    }

    pub fn presenter(&self) -> Arc<dyn PresentationSink> {
        Arc::clone(&self.presenter)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_state(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn display_state(&self) -> DisplayState {
        self.state.lock().display_state()
    }

    /// Loads the audio cues; also the retry path after a failed load.
    pub async fn initialize_audio(&self) -> Result<(), AppError> {
        initialize_audio(&self.audio, self.presenter.as_ref()).await
    }

    pub async fn retry_audio_init(&self) -> Result<(), AppError> {
        log::info!("Retrying audio initialization");
        self.initialize_audio().await
    }

    /// Starts a session. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> StartOutcome {
        if self.active.is_some() {
            log::debug!("Start ignored: session already active");
            return StartOutcome::AlreadyActive;
        }
        if !self.audio.is_ready() {
            log::warn!("Start ignored: audio is not initialized");
            return StartOutcome::AudioUnavailable;
        }

        let active = ActiveFlag::new();
        let (session_id, with_preamble) = {
            let mut state = self.state.lock();
            state.begin();
            let session_id = self.tracker.lock().start_session(state.is_muted);
            self.presenter.render(&state.display_state());
            (session_id, !state.has_played_preamble)
        };

        let sequencer = PhaseSequencer::new(SequencerContext {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            tracker: Arc::clone(&self.tracker),
            audio: Arc::clone(&self.audio),
            presenter: Arc::clone(&self.presenter),
            telemetry: Arc::clone(&self.telemetry),
            active: active.clone(),
            session_id: session_id.clone(),
        });
        self.timers.spawn(sequencer.run(with_preamble));
        self.active = Some(active);

        log::info!("Session {session_id} started (preamble: {with_preamble})");
        self.telemetry.record(TelemetryEvent::SessionStarted {
            session_id: session_id.clone(),
            with_preamble,
        });
        StartOutcome::Started {
            session_id,
            with_preamble,
        }
    }

    /// Stops the session. Returns `None` when nothing was running.
    pub fn stop(&mut self) -> Option<StopReport> {
        let active = self.active.take()?;
        let cycles_completed = {
            let mut state = self.state.lock();
            active.deactivate();
            let cycles = state.cycle_count;
            state.reset_to_idle(self.config.idle_scale);
            self.presenter.render(&state.display_state());
            cycles
        };
        let cancelled_timers = self.timers.clear_all();
        self.audio.stop_all();

        let summary = self.tracker.lock().finish_session()?;
        if summary.cycles_completed != cycles_completed {
            log::warn!(
                "Tracker counted {} cycles, display showed {cycles_completed}",
                summary.cycles_completed
            );
        }
        log::info!(
            "Session {} stopped after {} cycles ({} ms)",
            summary.session_id,
            cycles_completed,
            summary.duration_ms
        );
        self.telemetry.record(TelemetryEvent::SessionStopped {
            session_id: summary.session_id.clone(),
            duration_ms: summary.duration_ms,
            cycles_completed,
        });

        let completion_shown = cycles_completed > 0;
        if completion_shown {
            self.presenter.show_completion(&summary);
        }
        Some(StopReport {
            summary,
            completion_shown,
            cancelled_timers,
        })
    }

    /// Start when idle, stop when running.
    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.stop();
        } else {
            self.start();
        }
        self.is_active()
    }

    /// Tap or click on the circle.
    pub fn tap(&mut self) -> bool {
        self.record_interaction(InteractionKind::Tap);
        self.toggle()
    }

    pub fn record_interaction(&self, kind: InteractionKind) {
        self.telemetry.record(TelemetryEvent::Interaction { kind });
    }

    /// Returns whether the key was handled.
    pub fn handle_key(&mut self, key: &str) -> bool {
        let Some(action) = KeyAction::from_key(key) else {
            return false;
        };
        self.record_interaction(InteractionKind::Keyboard {
            key: key.to_string(),
        });
        match action {
            KeyAction::Toggle => {
                self.toggle();
            }
            KeyAction::Stop => {
                self.stop();
            }
        }
        true
    }

    /// Muting halts in-flight audio immediately. Timing is unaffected.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.audio.toggle_global_mute();
        {
            let mut state = self.state.lock();
            state.is_muted = muted;
            if muted {
                self.tracker.lock().mark_muted();
            }
            self.presenter.render(&state.display_state());
        }
        self.telemetry.record(TelemetryEvent::MuteToggled { muted });
        muted
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.deactivate();
        }
        self.timers.clear_all();
        self.audio.stop_all();
    }
}

/// Loads the audio cues and reports a retryable error to the presenter on failure.
pub async fn initialize_audio(
    audio: &AudioManager,
    presenter: &dyn PresentationSink,
) -> Result<(), AppError> {
    audio.initialize().await.map_err(|err| {
        let error = AppError::from(err);
        presenter.report_error(error.payload());
        error
    })
}
