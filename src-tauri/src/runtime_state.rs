use crate::models::{DisplayState, Phase, Stage};
use serde::Serialize;

/// Session variables for the process lifetime.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub stage: Stage,
    pub is_active: bool,
    pub is_muted: bool,
    pub cycle_count: u32,
    pub has_played_preamble: bool,
    pub phase: Option<Phase>,
    pub scale: f32,
    pub count: Option<u8>,
}

impl SessionState {
    pub fn new(idle_scale: f32) -> Self {
        Self {
            stage: Stage::Idle,
            is_active: false,
            is_muted: false,
            cycle_count: 0,
            has_played_preamble: false,
            phase: None,
            scale: idle_scale,
            count: None,
        }
    }

    pub fn begin(&mut self) {
        self.is_active = true;
        self.cycle_count = 0;
        self.count = None;
    }

    /// Back to idle. Mute and the preamble flag survive.
    pub fn reset_to_idle(&mut self, idle_scale: f32) {
        self.stage = Stage::Idle;
        self.is_active = false;
        self.cycle_count = 0;
        self.phase = None;
        self.scale = idle_scale;
        self.count = None;
    }

    /// `scale_target` of `None` keeps the circle where it is.
    pub fn enter_phase(&mut self, phase: Phase, scale_target: Option<f32>) {
        self.stage = phase.stage();
        self.phase = Some(phase);
        self.count = None;
        if let Some(scale) = scale_target {
            self.scale = scale;
        }
    }

    pub fn show_count(&mut self, count: u8) {
        self.count = Some(count);
    }

    /// Clears the overlay only if it still shows `count`.
    pub fn clear_count(&mut self, count: u8) -> bool {
        if self.count == Some(count) {
            self.count = None;
            true
        } else {
            false
        }
    }

    pub fn complete_cycle(&mut self) -> u32 {
        self.cycle_count = self.cycle_count.saturating_add(1);
        self.cycle_count
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            phase: self.phase,
            phase_label: self.phase.map(|phase| phase.label().to_string()),
            stage: self.stage,
            scale: self.scale,
            count: self.count,
            is_active: self.is_active,
            is_muted: self.is_muted,
            cycle_count: self.cycle_count,
        }
    }
}
