use crate::audio_manager::AudioCueError;
use crate::config::ConfigError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppErrorKind {
    Config,
    Audio,
}

/// What the webview receives on `app-error`. `recoverable` drives the retry button.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

/// A user-facing error: a short message plus the underlying cause for the logs.
#[derive(Debug, Clone)]
pub struct AppError(AppErrorPayload);

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self(AppErrorPayload {
            kind,
            message: message.into(),
            detail: None,
            recoverable,
        })
    }

    pub fn detailed(mut self, detail: impl Into<String>) -> Self {
        self.0.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> AppErrorKind {
        self.0.kind
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.0.detail.as_deref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.0.recoverable
    }

    pub fn payload(&self) -> AppErrorPayload {
        self.0.clone()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({detail})", self.message()),
            None => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Audio errors are all retryable; the user can ask to initialize again.
impl From<AudioCueError> for AppError {
    fn from(error: AudioCueError) -> Self {
        let message = match &error {
            AudioCueError::DeviceNotAvailable(_) => "No audio output is available",
            AudioCueError::AssetMissing(_) => "Voice guidance files could not be loaded",
            AudioCueError::PlaybackFailed(_) => "Voice guidance could not be played",
        };
        Self::new(AppErrorKind::Audio, message, true).detailed(error.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let message = match &error {
            ConfigError::Io(_) => "Failed to read the breathing settings",
            ConfigError::Parse(_) => "The breathing settings file is malformed",
            ConfigError::Invalid(_) => "The breathing settings are invalid",
        };
        Self::new(AppErrorKind::Config, message, false).detailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, AppErrorKind};
    use crate::audio_manager::AudioCueError;
    use crate::config::ConfigError;

    #[test]
    fn audio_errors_are_recoverable() {
        let error = AppError::from(AudioCueError::AssetMissing("One.mp3".to_string()));
        assert_eq!(error.kind(), AppErrorKind::Audio);
        assert!(error.is_recoverable());
        assert_eq!(error.detail(), Some("Audio asset missing: One.mp3"));
        assert_eq!(
            error.to_string(),
            "Voice guidance files could not be loaded (Audio asset missing: One.mp3)"
        );
    }

    #[test]
    fn payload_serializes_camel_case() {
        let error = AppError::from(ConfigError::Invalid("bad".to_string()));
        let json = serde_json::to_value(error.payload()).expect("serialize");
        assert_eq!(json["kind"], "config");
        assert_eq!(json["recoverable"], false);
        assert_eq!(json["message"], "The breathing settings are invalid");
        assert_eq!(json["detail"], "Invalid config: bad");
    }
}
