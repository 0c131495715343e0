//! Drives the breathing loop for one session.
//!
//! A session is a single task: optional preamble, then four timed phases per cycle until the
//! session's [`ActiveFlag`] is cleared. Each phase is expanded into a [`PhasePlan`] and the task
//! sleeps until each planned offset. Deadlines are measured from when breathing began, so late
//! wake-ups never push later phases back.

use crate::audio_manager::{AudioCue, AudioManager};
use crate::config::SequencerConfig;
use crate::events::{PresentationSink, TelemetryEvent, TelemetrySink};
use crate::models::{Phase, PhaseRunResult};
use crate::runtime_state::SessionState;
use crate::session_tracker::SessionTracker;
use crate::timer_set::ActiveFlag;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    Enter,
    ShowCount(u8),
    ClearCount(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    pub offset: Duration,
    pub action: PhaseAction,
}

/// Timed actions of one breathing phase, ordered by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasePlan {
    pub phase: Phase,
    pub cycle: u32,
    pub guided: bool,
    pub duration: Duration,
    pub actions: Vec<ScheduledAction>,
}

impl PhasePlan {
    pub fn for_phase(config: &SequencerConfig, phase: Phase, cycle: u32, guided: bool) -> Self {
        let duration = config.phase_duration();
        let mut actions = vec![ScheduledAction {
            offset: Duration::ZERO,
            action: PhaseAction::Enter,
        }];
        if guided {
            for count in 1..=SequencerConfig::COUNTS_PER_PHASE {
                let shown = Duration::from_millis(config.count_offset_ms(count));
                if shown >= duration {
                    break;
                }
                actions.push(ScheduledAction {
                    offset: shown,
                    action: PhaseAction::ShowCount(count),
                });
                let cleared = shown + Duration::from_millis(config.count_display_ms);
                // The next phase's Enter clears anything still visible.
                if cleared < duration {
                    actions.push(ScheduledAction {
                        offset: cleared,
                        action: PhaseAction::ClearCount(count),
                    });
                }
            }
        }
        actions.sort_by_key(|scheduled| scheduled.offset);
        Self {
            phase,
            cycle,
            guided,
            duration,
            actions,
        }
    }
}

/// Handles the sequencer borrows from the controller for one session.
#[derive(Clone)]
pub struct SequencerContext {
    pub config: SequencerConfig,
    pub state: Arc<Mutex<SessionState>>,
    pub tracker: Arc<Mutex<SessionTracker>>,
    pub audio: Arc<AudioManager>,
    pub presenter: Arc<dyn PresentationSink>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub active: ActiveFlag,
    pub session_id: String,
}

pub struct PhaseSequencer {
    ctx: SequencerContext,
}

impl PhaseSequencer {
    pub fn new(ctx: SequencerContext) -> Self {
        Self { ctx }
    }

    /// Runs until the session is stopped.
    pub async fn run(self, with_preamble: bool) {
        if with_preamble && !self.run_preamble().await {
            return;
        }
        let mut phase_start = Instant::now();
        let mut cycle: u32 = 1;
        loop {
            let guided = self.ctx.config.is_guided(cycle);
            for phase in Phase::CYCLE {
                if !self.run_phase(phase, cycle, guided, phase_start).await {
                    return;
                }
                phase_start += self.ctx.config.phase_duration();
            }
            log::debug!("Cycle {cycle} complete");
            self.ctx.telemetry.record(TelemetryEvent::CycleCompleted {
                session_id: self.ctx.session_id.clone(),
                cycle,
            });
            cycle = cycle.saturating_add(1);
        }
    }

    /// Welcome and explanation, each played to the end and followed by a pause.
    /// Returns false if the session was stopped on the way.
    pub async fn run_preamble(&self) -> bool {
        for phase in [Phase::Welcome, Phase::Intro] {
            let entered = self.with_active_state(|state, tracker| {
                state.enter_phase(phase, None);
                tracker.start_phase(phase, 0, false);
            });
            if entered.is_none() {
                return false;
            }
            self.ctx.audio.play_and_wait(AudioCue::for_phase(phase)).await;
            if !self.ctx.active.is_active() {
                return false;
            }
            sleep(self.ctx.config.preamble_pause()).await;
            let finished = self.with_active_state(|_, tracker| {
                tracker.finalize_current_phase(phase, PhaseRunResult::Completed);
            });
            if finished.is_none() {
                return false;
            }
        }
        self.with_active_state(|state, _| state.has_played_preamble = true)
            .is_some()
    }

    /// Plays out one phase that began at `started_at`. Returns false if the session was stopped.
    pub async fn run_phase(
        &self,
        phase: Phase,
        cycle: u32,
        guided: bool,
        started_at: Instant,
    ) -> bool {
        let plan = PhasePlan::for_phase(&self.ctx.config, phase, cycle, guided);
        for scheduled in &plan.actions {
            sleep_until(started_at + scheduled.offset).await;
            if !self.apply(&plan, scheduled.action) {
                return false;
            }
        }
        sleep_until(started_at + plan.duration).await;
        self.with_active_state(|state, tracker| {
            tracker.finalize_current_phase(phase, PhaseRunResult::Completed);
            if phase == Phase::HoldEmpty {
                state.complete_cycle();
            }
        })
        .is_some()
    }

    fn apply(&self, plan: &PhasePlan, action: PhaseAction) -> bool {
        let config = &self.ctx.config;
        let audio = &self.ctx.audio;
        self.with_active_state(|state, tracker| match action {
            PhaseAction::Enter => {
                let scale = match plan.phase {
                    Phase::Inhale => Some(config.inhale_scale),
                    Phase::Exhale => Some(config.exhale_scale),
                    _ => None,
                };
                state.enter_phase(plan.phase, scale);
                tracker.start_phase(plan.phase, plan.cycle, plan.guided);
                audio.play(AudioCue::for_phase(plan.phase));
            }
            PhaseAction::ShowCount(count) => {
                state.show_count(count);
                if let Some(cue) = AudioCue::for_count(count) {
                    audio.play(cue);
                }
            }
            PhaseAction::ClearCount(count) => {
                state.clear_count(count);
            }
        })
        .is_some()
    }

    /// Mutates state only while the session is live, then renders the result.
    ///
    /// The flag is checked under the state lock; `stop` clears it under the same lock, so no
    /// mutation or cue can slip in after a stop has reset the display.
    fn with_active_state<R>(
        &self,
        mutate: impl FnOnce(&mut SessionState, &mut SessionTracker) -> R,
    ) -> Option<R> {
        let mut state = self.ctx.state.lock();
        if !self.ctx.active.is_active() {
            return None;
        }
        let mut tracker = self.ctx.tracker.lock();
        let result = mutate(&mut state, &mut tracker);
        drop(tracker);
        self.ctx.presenter.render(&state.display_state());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{PhaseAction, PhasePlan, ScheduledAction};
    use crate::config::SequencerConfig;
    use crate::models::Phase;
    use std::time::Duration;

    fn at(ms: u64, action: PhaseAction) -> ScheduledAction {
        ScheduledAction {
            offset: Duration::from_millis(ms),
            action,
        }
    }

    #[test]
    fn guided_plan_counts_once_per_second() {
        let plan = PhasePlan::for_phase(&SequencerConfig::default(), Phase::Inhale, 1, true);
        assert_eq!(plan.duration, Duration::from_millis(4_000));
        assert_eq!(
            plan.actions,
            vec![
                at(0, PhaseAction::Enter),
                at(500, PhaseAction::ShowCount(1)),
                at(1_100, PhaseAction::ClearCount(1)),
                at(1_500, PhaseAction::ShowCount(2)),
                at(2_100, PhaseAction::ClearCount(2)),
                at(2_500, PhaseAction::ShowCount(3)),
                at(3_100, PhaseAction::ClearCount(3)),
                at(3_500, PhaseAction::ShowCount(4)),
            ]
        );
    }

    #[test]
    fn unguided_plan_only_enters() {
        let plan = PhasePlan::for_phase(&SequencerConfig::default(), Phase::Exhale, 3, false);
        assert_eq!(plan.actions, vec![at(0, PhaseAction::Enter)]);
    }

    #[test]
    fn tighter_spacing_is_honored() {
        let config = SequencerConfig {
            count_lead_in_ms: 0,
            count_interval_ms: 800,
            count_display_ms: 400,
            ..SequencerConfig::default()
        };
        let plan = PhasePlan::for_phase(&config, Phase::HoldFull, 2, true);
        let shown: Vec<_> = plan
            .actions
            .iter()
            .filter(|scheduled| matches!(scheduled.action, PhaseAction::ShowCount(_)))
            .map(|scheduled| scheduled.offset.as_millis())
            .collect();
        assert_eq!(shown, vec![0, 800, 1_600, 2_400]);
        assert_eq!(plan.actions[0].action, PhaseAction::Enter);
    }

    #[test]
    fn overlapping_clear_comes_after_next_count() {
        let config = SequencerConfig {
            count_display_ms: 1_200,
            ..SequencerConfig::default()
        };
        let plan = PhasePlan::for_phase(&config, Phase::Inhale, 1, true);
        let show_two = plan
            .actions
            .iter()
            .position(|scheduled| scheduled.action == PhaseAction::ShowCount(2))
            .expect("count two");
        let clear_one = plan
            .actions
            .iter()
            .position(|scheduled| scheduled.action == PhaseAction::ClearCount(1))
            .expect("clear one");
        assert!(show_two < clear_one);
    }
}
