#![allow(dead_code)]

use async_trait::async_trait;
use box_breathing_lib::app_error::AppErrorPayload;
use box_breathing_lib::audio_manager::{AudioCue, AudioCueError, AudioManager, CueBackend};
use box_breathing_lib::config::SequencerConfig;
use box_breathing_lib::events::{PresentationSink, TelemetryEvent, TelemetrySink};
use box_breathing_lib::models::{DisplayState, Phase, SessionSummary};
use box_breathing_lib::session_controller::SessionController;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

pub async fn advance_to(origin: Instant, at_ms: u64) {
    tokio::time::sleep_until(origin + ms(at_ms)).await;
}

/// Backend that logs when each clip starts and pretends to play it for a set time.
pub struct RecordingBackend {
    origin: Instant,
    durations: HashMap<AudioCue, Duration>,
    default_duration: Duration,
    plays: Mutex<Vec<(u64, AudioCue)>>,
    completed: Mutex<Vec<AudioCue>>,
    failing: Mutex<HashSet<AudioCue>>,
    fail_prepare: AtomicBool,
    stops: AtomicUsize,
}

impl RecordingBackend {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            durations: HashMap::new(),
            default_duration: ms(300),
            plays: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fail_prepare: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn with_duration(mut self, cue: AudioCue, duration: Duration) -> Self {
        self.durations.insert(cue, duration);
        self
    }

    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn fail_cue(&self, cue: AudioCue) {
        self.failing.lock().insert(cue);
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        self.fail_prepare.store(fail, Ordering::SeqCst);
    }

    pub fn plays(&self) -> Vec<(u64, AudioCue)> {
        self.plays.lock().clone()
    }

    pub fn play_times(&self, cue: AudioCue) -> Vec<u64> {
        self.plays
            .lock()
            .iter()
            .filter(|(_, played)| *played == cue)
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn completed(&self) -> Vec<AudioCue> {
        self.completed.lock().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CueBackend for RecordingBackend {
    async fn prepare(&self, _cues: &[AudioCue]) -> Result<(), AudioCueError> {
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(AudioCueError::DeviceNotAvailable(
                "no output device".to_string(),
            ));
        }
        Ok(())
    }

    async fn play_to_end(&self, cue: AudioCue) -> Result<(), AudioCueError> {
        let at = self.origin.elapsed().as_millis() as u64;
        self.plays.lock().push((at, cue));
        if self.failing.lock().contains(&cue) {
            return Err(AudioCueError::PlaybackFailed(format!("{cue:?}")));
        }
        let duration = self
            .durations
            .get(&cue)
            .copied()
            .unwrap_or(self.default_duration);
        tokio::time::sleep(duration).await;
        self.completed.lock().push(cue);
        Ok(())
    }

    fn stop_all(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingPresenter {
    origin: Instant,
    renders: Mutex<Vec<(u64, DisplayState)>>,
    completions: Mutex<Vec<SessionSummary>>,
    errors: Mutex<Vec<AppErrorPayload>>,
}

impl RecordingPresenter {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            renders: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    pub fn last_render(&self) -> Option<DisplayState> {
        self.renders.lock().last().map(|(_, state)| state.clone())
    }

    /// Times at which the displayed phase changed.
    pub fn phase_changes(&self) -> Vec<(u64, Phase)> {
        let mut changes: Vec<(u64, Phase)> = Vec::new();
        let mut last = None;
        for (at, state) in self.renders.lock().iter() {
            if state.phase != last {
                if let Some(phase) = state.phase {
                    changes.push((*at, phase));
                }
                last = state.phase;
            }
        }
        changes
    }

    /// Count overlays in the order they appeared.
    pub fn shown_counts(&self) -> Vec<(u64, u8)> {
        let mut shown = Vec::new();
        let mut last = None;
        for (at, state) in self.renders.lock().iter() {
            if state.count != last {
                if let Some(count) = state.count {
                    shown.push((*at, count));
                }
                last = state.count;
            }
        }
        shown
    }

    pub fn completions(&self) -> Vec<SessionSummary> {
        self.completions.lock().clone()
    }

    pub fn errors(&self) -> Vec<AppErrorPayload> {
        self.errors.lock().clone()
    }
}

impl PresentationSink for RecordingPresenter {
    fn render(&self, state: &DisplayState) {
        let at = self.origin.elapsed().as_millis() as u64;
        self.renders.lock().push((at, state.clone()));
    }

    fn show_completion(&self, summary: &SessionSummary) {
        self.completions.lock().push(summary.clone());
    }

    fn report_error(&self, payload: AppErrorPayload) {
        self.errors.lock().push(payload);
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

pub struct Harness {
    pub origin: Instant,
    pub backend: Arc<RecordingBackend>,
    pub presenter: Arc<RecordingPresenter>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub controller: SessionController,
}

impl Harness {
    pub async fn new(config: SequencerConfig, backend: RecordingBackend) -> Self {
        let origin = Instant::now();
        let backend = Arc::new(backend);
        let presenter = Arc::new(RecordingPresenter::new(origin));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let audio = Arc::new(AudioManager::new(backend.clone(), config.audio_timeout()));
        let controller = SessionController::new(
            config,
            audio,
            presenter.clone(),
            telemetry.clone(),
        );
        let _ = controller.initialize_audio().await;
        Self {
            origin,
            backend,
            presenter,
            telemetry,
            controller,
        }
    }

    /// Preamble with 3 s welcome and 5 s explanation: breathing starts at 10 s.
    pub async fn with_spoken_preamble() -> Self {
        let origin = Instant::now();
        let backend = RecordingBackend::new(origin)
            .with_duration(AudioCue::Welcome, ms(3_000))
            .with_duration(AudioCue::Explanation, ms(5_000));
        Self::new(SequencerConfig::default(), backend).await
    }

    /// Preamble that takes no time: breathing starts at 0 s.
    pub async fn with_instant_preamble() -> Self {
        let origin = Instant::now();
        let backend = RecordingBackend::new(origin)
            .with_duration(AudioCue::Welcome, Duration::ZERO)
            .with_duration(AudioCue::Explanation, Duration::ZERO);
        let config = SequencerConfig {
            preamble_pause_ms: 0,
            ..SequencerConfig::default()
        };
        Self::new(config, backend).await
    }

    pub async fn advance_to(&self, at_ms: u64) {
        advance_to(self.origin, at_ms).await;
    }

    pub fn cycle_count(&self) -> u32 {
        self.controller.display_state().cycle_count
    }
}
