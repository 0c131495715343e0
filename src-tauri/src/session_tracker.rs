use crate::models::{Phase, PhaseRun, PhaseRunResult, SessionSummary};
use chrono::Utc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<ActiveSession>,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    id: String,
    started_at: String,
    started: Instant,
    current_phase: Option<CurrentPhase>,
    phase_runs: Vec<PhaseRun>,
    muted_during_session: bool,
}

#[derive(Debug, Clone)]
struct CurrentPhase {
    phase: Phase,
    cycle: u32,
    guided: bool,
    started: Instant,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_session(&mut self, muted: bool) -> String {
        let id = generate_session_id();
        self.active = Some(ActiveSession {
            id: id.clone(),
            started_at: now_rfc3339(),
            started: Instant::now(),
            current_phase: None,
            phase_runs: Vec::new(),
            muted_during_session: muted,
        });
        id
    }

    pub fn start_phase(&mut self, phase: Phase, cycle: u32, guided: bool) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.current_phase = Some(CurrentPhase {
            phase,
            cycle,
            guided,
            started: Instant::now(),
        });
    }

    pub fn finalize_current_phase(&mut self, phase: Phase, result: PhaseRunResult) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let should_finalize = matches!(
            active.current_phase.as_ref(),
            Some(current) if current.phase == phase
        );
        if !should_finalize {
            return;
        }
        if let Some(current) = active.current_phase.take() {
            active.phase_runs.push(current.into_run(result));
        }
    }

    pub fn mark_muted(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.muted_during_session = true;
        }
    }

    /// Ends the session. A phase still running is recorded as aborted.
    pub fn finish_session(&mut self) -> Option<SessionSummary> {
        let mut active = self.active.take()?;
        let interrupted_phase = active.current_phase.as_ref().map(|current| current.phase);
        if let Some(current) = active.current_phase.take() {
            active
                .phase_runs
                .push(current.into_run(PhaseRunResult::Aborted));
        }
        let cycles_completed = count_cycles(&active.phase_runs);
        Some(SessionSummary {
            session_id: active.id,
            started_at: active.started_at,
            ended_at: now_rfc3339(),
            duration_ms: elapsed_ms(active.started),
            cycles_completed,
            muted_during_session: active.muted_during_session,
            interrupted_phase,
            phase_runs: active.phase_runs,
        })
    }
}

impl CurrentPhase {
    fn into_run(self, result: PhaseRunResult) -> PhaseRun {
        PhaseRun {
            phase: self.phase,
            cycle: self.cycle,
            guided: self.guided,
            elapsed_ms: elapsed_ms(self.started),
            result,
        }
    }
}

fn count_cycles(runs: &[PhaseRun]) -> u32 {
    let completed = runs
        .iter()
        .filter(|run| run.phase == Phase::HoldEmpty && run.result == PhaseRunResult::Completed)
        .count();
    completed.try_into().unwrap_or(u32::MAX)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn generate_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("session-{nanos}-{}", std::process::id())
}
