use crate::models::Phase;
use crate::timer_set::TimerSet;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Pre-recorded clips the guide can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioCue {
    Welcome,
    Explanation,
    BreatheIn,
    Hold,
    HoldBreath,
    BreatheOut,
    One,
    Two,
    Three,
    Four,
}

impl AudioCue {
    pub const ALL: [AudioCue; 10] = [
        AudioCue::Welcome,
        AudioCue::Explanation,
        AudioCue::BreatheIn,
        AudioCue::Hold,
        AudioCue::HoldBreath,
        AudioCue::BreatheOut,
        AudioCue::One,
        AudioCue::Two,
        AudioCue::Three,
        AudioCue::Four,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            AudioCue::Welcome => "WelcomeMessage.mp3",
            AudioCue::Explanation => "BoxBreathingExplanation.mp3",
            AudioCue::BreatheIn => "BreatheIn.mp3",
            AudioCue::Hold => "Hold.mp3",
            AudioCue::HoldBreath => "HoldYourBreath.mp3",
            AudioCue::BreatheOut => "BreatheOut.mp3",
            AudioCue::One => "One.mp3",
            AudioCue::Two => "Two.mp3",
            AudioCue::Three => "Three.mp3",
            AudioCue::Four => "Four.mp3",
        }
    }

    /// Instruction spoken when a phase begins.
    pub fn for_phase(phase: Phase) -> AudioCue {
        match phase {
            Phase::Welcome => AudioCue::Welcome,
            Phase::Intro => AudioCue::Explanation,
            Phase::Inhale => AudioCue::BreatheIn,
            Phase::HoldFull => AudioCue::HoldBreath,
            Phase::Exhale => AudioCue::BreatheOut,
            Phase::HoldEmpty => AudioCue::Hold,
        }
    }

    pub fn for_count(count: u8) -> Option<AudioCue> {
        match count {
            1 => Some(AudioCue::One),
            2 => Some(AudioCue::Two),
            3 => Some(AudioCue::Three),
            4 => Some(AudioCue::Four),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AudioCueError {
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
    #[error("Audio device not available: {0}")]
    DeviceNotAvailable(String),
    #[error("Audio asset missing: {0}")]
    AssetMissing(String),
}

/// Output device for cue clips.
#[async_trait]
pub trait CueBackend: Send + Sync {
    /// Loads the clips ahead of the first session.
    async fn prepare(&self, cues: &[AudioCue]) -> Result<(), AudioCueError>;

    /// Plays a clip and resolves once it ends, fails, or is stopped.
    async fn play_to_end(&self, cue: AudioCue) -> Result<(), AudioCueError>;

    /// Halts every clip that is playing.
    fn stop_all(&self);
}

/// Backend with playback disabled. Every clip finishes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBackend;

#[async_trait]
impl CueBackend for SilentBackend {
    async fn prepare(&self, _cues: &[AudioCue]) -> Result<(), AudioCueError> {
        Ok(())
    }

    async fn play_to_end(&self, _cue: AudioCue) -> Result<(), AudioCueError> {
        Ok(())
    }

    fn stop_all(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    FireAndForget,
    AwaitCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundPlaybackReason {
    Played,
    Dispatched,
    Muted,
    NotReady,
    PlaybackFailed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPlaybackRecord {
    pub cue: AudioCue,
    pub mode: PlaybackMode,
    pub played: bool,
    pub reason: SoundPlaybackReason,
    pub timestamp: SystemTime,
}

/// Playback records kept for inspection. Older ones are dropped.
pub const PLAYBACK_LOG_CAPACITY: usize = 64;

pub struct AudioManager {
    backend: Arc<dyn CueBackend>,
    global_mute: AtomicBool,
    ready: AtomicBool,
    audio_timeout: Duration,
    in_flight: Mutex<TimerSet>,
    log: Mutex<VecDeque<SoundPlaybackRecord>>,
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager")
            .field("global_mute", &self.is_muted())
            .field("ready", &self.is_ready())
            .field("audio_timeout", &self.audio_timeout)
            .finish_non_exhaustive()
    }
}

impl AudioManager {
    pub fn new(backend: Arc<dyn CueBackend>, audio_timeout: Duration) -> Self {
        Self {
            backend,
            global_mute: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            audio_timeout,
            in_flight: Mutex::new(TimerSet::new()),
            log: Mutex::new(VecDeque::with_capacity(PLAYBACK_LOG_CAPACITY)),
        }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(SilentBackend), Duration::from_secs(60))
    }

    /// Loads every clip. On failure the manager stays not-ready and sessions refuse to start.
    pub async fn initialize(&self) -> Result<(), AudioCueError> {
        log::info!("Initializing audio cues");
        match self.backend.prepare(&AudioCue::ALL).await {
            Ok(()) => {
                self.ready.store(true, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                log::warn!("Audio initialization failed: {err}");
                self.ready.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_muted(&self) -> bool {
        self.global_mute.load(Ordering::Acquire)
    }

    /// Muting silences in-flight clips at once.
    pub fn set_global_mute(&self, muted: bool) {
        self.global_mute.store(muted, Ordering::Release);
        if muted {
            self.stop_all();
        }
    }

    pub fn toggle_global_mute(&self) -> bool {
        let muted = !self.is_muted();
        self.set_global_mute(muted);
        muted
    }

    /// Starts a clip without waiting for it. The playback task is tracked so `stop_all` can cancel it.
    pub fn play(self: &Arc<Self>, cue: AudioCue) -> SoundPlaybackRecord {
        if let Some(reason) = self.blocked_reason() {
            return self.record(cue, PlaybackMode::FireAndForget, false, reason);
        }
        log::debug!("Playing cue {cue:?}");
        let manager = Arc::clone(self);
        let mut in_flight = self.in_flight.lock();
        in_flight.spawn(async move {
            let outcome = manager.play_with_timeout(cue).await;
            if outcome != SoundPlaybackReason::Played {
                manager.record(cue, PlaybackMode::FireAndForget, false, outcome);
            }
        });
        log::trace!("{} cues in flight", in_flight.pending());
        drop(in_flight);
        self.record(cue, PlaybackMode::FireAndForget, true, SoundPlaybackReason::Dispatched)
    }

    /// Plays a clip to completion. Failures and timeouts are logged and count as completion.
    pub async fn play_and_wait(&self, cue: AudioCue) -> SoundPlaybackRecord {
        if let Some(reason) = self.blocked_reason() {
            return self.record(cue, PlaybackMode::AwaitCompletion, false, reason);
        }
        log::debug!("Playing cue {cue:?} to completion");
        let reason = self.play_with_timeout(cue).await;
        let played = reason == SoundPlaybackReason::Played;
        self.record(cue, PlaybackMode::AwaitCompletion, played, reason)
    }

    /// Cancels pending playback tasks and halts the device. Best-effort.
    pub fn stop_all(&self) {
        let cancelled = self.in_flight.lock().clear_all();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} in-flight cues");
        }
        self.backend.stop_all();
    }

    /// The most recent playback records, oldest first.
    pub fn logs(&self) -> Vec<SoundPlaybackRecord> {
        self.log.lock().iter().cloned().collect()
    }

    fn blocked_reason(&self) -> Option<SoundPlaybackReason> {
        if self.is_muted() {
            Some(SoundPlaybackReason::Muted)
        } else if !self.is_ready() {
            Some(SoundPlaybackReason::NotReady)
        } else {
            None
        }
    }

    async fn play_with_timeout(&self, cue: AudioCue) -> SoundPlaybackReason {
        match tokio::time::timeout(self.audio_timeout, self.backend.play_to_end(cue)).await {
            Ok(Ok(())) => SoundPlaybackReason::Played,
            Ok(Err(err)) => {
                log::warn!("Cue {cue:?} failed: {err}");
                SoundPlaybackReason::PlaybackFailed
            }
            Err(_) => {
                log::warn!(
                    "Cue {cue:?} did not finish within {:?}",
                    self.audio_timeout
                );
                SoundPlaybackReason::TimedOut
            }
        }
    }

    fn record(
        &self,
        cue: AudioCue,
        mode: PlaybackMode,
        played: bool,
        reason: SoundPlaybackReason,
    ) -> SoundPlaybackRecord {
        let record = SoundPlaybackRecord {
            cue,
            mode,
            played,
            reason,
            timestamp: SystemTime::now(),
        };
        let mut log = self.log.lock();
        if log.len() == PLAYBACK_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(record.clone());
        record
    }
}
