use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Welcome,
    Intro,
    Inhale,
    HoldFull,
    Exhale,
    HoldEmpty,
}

impl Phase {
    pub const CYCLE: [Phase; 4] = [Phase::Inhale, Phase::HoldFull, Phase::Exhale, Phase::HoldEmpty];

    pub fn label(self) -> &'static str {
        match self {
            Phase::Welcome => "Welcome",
            Phase::Intro => "Box Breathing",
            Phase::Inhale => "Breathe In",
            Phase::HoldFull => "Hold",
            Phase::Exhale => "Breathe Out",
            Phase::HoldEmpty => "Hold",
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            Phase::Welcome => Stage::Welcome,
            Phase::Intro => Stage::Intro,
            _ => Stage::Breathing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Idle,
    Welcome,
    Intro,
    Breathing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub phase: Option<Phase>,
    pub phase_label: Option<String>,
    pub stage: Stage,
    pub scale: f32,
    pub count: Option<u8>,
    pub is_active: bool,
    pub is_muted: bool,
    pub cycle_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRun {
    pub phase: Phase,
    pub cycle: u32,
    pub guided: bool,
    pub elapsed_ms: u64,
    pub result: PhaseRunResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseRunResult {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub cycles_completed: u32,
    pub muted_during_session: bool,
    pub interrupted_phase: Option<Phase>,
    pub phase_runs: Vec<PhaseRun>,
}

impl SessionSummary {
    /// Completion message shown after a session with at least one cycle.
    pub fn completion_message(&self) -> String {
        let noun = if self.cycles_completed == 1 {
            "cycle"
        } else {
            "cycles"
        };
        format!(
            "You completed {} {noun} of box breathing.",
            self.cycles_completed
        )
    }
}
