use crate::app_error::AppErrorPayload;
use crate::models::{DisplayState, SessionSummary};
use serde::Serialize;

/// Receives what the circle, overlay and completion dialog should show.
///
/// Calls arrive while session state is locked, so implementations must not call back into the
/// controller.
pub trait PresentationSink: Send + Sync {
    fn render(&self, state: &DisplayState);
    fn show_completion(&self, summary: &SessionSummary);
    fn report_error(&self, payload: AppErrorPayload);
}

/// Observational analytics. Nothing here may influence timing or control flow.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TelemetryEvent {
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        session_id: String,
        with_preamble: bool,
    },
    #[serde(rename_all = "camelCase")]
    SessionStopped {
        session_id: String,
        duration_ms: u64,
        cycles_completed: u32,
    },
    #[serde(rename_all = "camelCase")]
    CycleCompleted { session_id: String, cycle: u32 },
    #[serde(rename_all = "camelCase")]
    Interaction { kind: InteractionKind },
    #[serde(rename_all = "camelCase")]
    MuteToggled { muted: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum InteractionKind {
    Tap,
    Button,
    Keyboard { key: String },
}

/// Writes telemetry through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!(target: "telemetry", "{json}"),
            Err(err) => log::warn!("Failed to serialize telemetry event: {err}"),
        }
    }
}

/// Presenter for headless use: logs what would be shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl PresentationSink for LogPresenter {
    fn render(&self, state: &DisplayState) {
        log::trace!(
            "display phase={:?} scale={} count={:?} active={}",
            state.phase,
            state.scale,
            state.count,
            state.is_active
        );
    }

    fn show_completion(&self, summary: &SessionSummary) {
        log::info!("{}", summary.completion_message());
    }

    fn report_error(&self, payload: AppErrorPayload) {
        log::error!("App error ({:?}): {}", payload.kind, payload.message);
    }
}

#[cfg(feature = "desktop")]
pub use desktop::TauriPresenter;

#[cfg(feature = "desktop")]
mod desktop {
    use super::{PresentationSink, TelemetryEvent, TelemetrySink};
    use crate::app_error::AppErrorPayload;
    use crate::models::{DisplayState, SessionSummary};
    use serde::Serialize;
    use tauri::{AppHandle, Emitter};

    const DISPLAY_CHANGED_EVENT: &str = "display-changed";
    const SESSION_COMPLETED_EVENT: &str = "session-completed";
    const TELEMETRY_EVENT: &str = "telemetry";
    const APP_ERROR_EVENT: &str = "app-error";

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SessionCompletedPayload<'a> {
        summary: &'a SessionSummary,
        message: String,
    }

    /// Forwards display updates, telemetry and errors to the webview.
    #[derive(Clone)]
    pub struct TauriPresenter {
        app: AppHandle,
    }

    impl TauriPresenter {
        pub fn new(app: AppHandle) -> Self {
            Self { app }
        }

        fn emit_event<S: Serialize + Clone>(&self, event: &str, payload: S) {
            if let Err(err) = self.app.emit(event, payload) {
                log::warn!("Failed to emit {event}: {err}");
            }
        }
    }

    impl PresentationSink for TauriPresenter {
        fn render(&self, state: &DisplayState) {
            self.emit_event(DISPLAY_CHANGED_EVENT, state.clone());
        }

        fn show_completion(&self, summary: &SessionSummary) {
            self.emit_event(
                SESSION_COMPLETED_EVENT,
                SessionCompletedPayload {
                    summary,
                    message: summary.completion_message(),
                },
            );
        }

        fn report_error(&self, payload: AppErrorPayload) {
            self.emit_event(APP_ERROR_EVENT, payload);
        }
    }

    impl TelemetrySink for TauriPresenter {
        fn record(&self, event: TelemetryEvent) {
            self.emit_event(TELEMETRY_EVENT, event);
        }
    }
}
