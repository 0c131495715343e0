use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Timing and scale parameters for the breathing sequence.
///
/// Every field has a default, so a partial JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequencerConfig {
    pub phase_duration_ms: u64,
    /// Offset of the first spoken count from the start of a guided phase.
    pub count_lead_in_ms: u64,
    pub count_interval_ms: u64,
    /// How long a count overlay stays visible.
    pub count_display_ms: u64,
    /// Cycles `1..=guided_cycles` get spoken counts.
    pub guided_cycles: u32,
    pub preamble_pause_ms: u64,
    pub audio_timeout_ms: u64,
    pub inhale_scale: f32,
    pub exhale_scale: f32,
    pub idle_scale: f32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            phase_duration_ms: 4_000,
            count_lead_in_ms: 500,
            count_interval_ms: 1_000,
            count_display_ms: 600,
            guided_cycles: 2,
            preamble_pause_ms: 1_000,
            audio_timeout_ms: 60_000,
            inhale_scale: 1.0,
            exhale_scale: 0.3,
            idle_scale: 0.3,
        }
    }
}

impl SequencerConfig {
    /// Spoken counts per guided phase.
    pub const COUNTS_PER_PHASE: u8 = 4;

    /// Reads a config file. A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.phase_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "phase duration must be at least 1 ms".to_string(),
            ));
        }
        if self.count_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "count interval must be at least 1 ms".to_string(),
            ));
        }
        if self.count_offset_ms(Self::COUNTS_PER_PHASE) >= self.phase_duration_ms {
            return Err(ConfigError::Invalid(
                "spoken counts must fit inside one phase".to_string(),
            ));
        }
        if self.audio_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "audio timeout must be at least 1 ms".to_string(),
            ));
        }
        let scales = [self.inhale_scale, self.exhale_scale, self.idle_scale];
        if scales.iter().any(|scale| !scale.is_finite() || *scale <= 0.0) {
            return Err(ConfigError::Invalid(
                "circle scales must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn phase_duration(&self) -> Duration {
        Duration::from_millis(self.phase_duration_ms)
    }

    pub fn preamble_pause(&self) -> Duration {
        Duration::from_millis(self.preamble_pause_ms)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_timeout_ms)
    }

    /// Offset of count `n` (1-based) from the start of its phase.
    pub fn count_offset_ms(&self, n: u8) -> u64 {
        let index = u64::from(n.saturating_sub(1));
        self.count_lead_in_ms
            .saturating_add(index.saturating_mul(self.count_interval_ms))
    }

    pub fn is_guided(&self, cycle_number: u32) -> bool {
        cycle_number >= 1 && cycle_number <= self.guided_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SequencerConfig};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid_box_breathing() {
        let config = SequencerConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.phase_duration_ms, 4_000);
        assert_eq!(config.count_offset_ms(1), 500);
        assert_eq!(config.count_offset_ms(4), 3_500);
        assert!(config.is_guided(1));
        assert!(config.is_guided(2));
        assert!(!config.is_guided(3));
        assert!(!config.is_guided(0));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = SequencerConfig::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(config, SequencerConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "countIntervalMs": 800, "guidedCycles": 3 }"#).expect("write");

        let config = SequencerConfig::load(&path).expect("load");
        assert_eq!(config.count_interval_ms, 800);
        assert_eq!(config.guided_cycles, 3);
        assert_eq!(config.phase_duration_ms, 4_000);
    }

    #[test]
    fn rejects_counts_past_phase_end() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "phaseDurationMs": 2000 }"#).expect("write");

        let err = SequencerConfig::load(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");

        let err = SequencerConfig::load(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_scale() {
        let config = SequencerConfig {
            exhale_scale: 0.0,
            ..SequencerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
