use crate::app_error::{AppError, AppErrorKind};
use crate::events::{InteractionKind, PresentationSink};
use crate::models::DisplayState;
use crate::session_controller::{initialize_audio, SessionController, StartOutcome};
use parking_lot::Mutex;
use tauri::State;

type Controller<'a> = State<'a, Mutex<SessionController>>;

#[tauri::command]
pub async fn start_session(controller: Controller<'_>) -> Result<DisplayState, String> {
    let mut controller = controller.lock();
    controller.record_interaction(InteractionKind::Button);
    match controller.start() {
        StartOutcome::AudioUnavailable => {
            let error = AppError::new(
                AppErrorKind::Audio,
                "Audio is not ready yet. Retry audio setup and try again",
                true,
            );
            Err(report_error(&controller, error))
        }
        _ => Ok(controller.display_state()),
    }
}

#[tauri::command]
pub async fn stop_session(controller: Controller<'_>) -> Result<DisplayState, String> {
    let mut controller = controller.lock();
    controller.record_interaction(InteractionKind::Button);
    controller.stop();
    Ok(controller.display_state())
}

#[tauri::command]
pub async fn toggle_session(controller: Controller<'_>) -> Result<bool, String> {
    let mut controller = controller.lock();
    controller.record_interaction(InteractionKind::Button);
    Ok(controller.toggle())
}

#[tauri::command]
pub async fn tap_circle(controller: Controller<'_>) -> Result<bool, String> {
    Ok(controller.lock().tap())
}

#[tauri::command]
pub async fn handle_key(key: String, controller: Controller<'_>) -> Result<bool, String> {
    Ok(controller.lock().handle_key(&key))
}

#[tauri::command]
pub async fn toggle_mute(controller: Controller<'_>) -> Result<bool, String> {
    Ok(controller.lock().toggle_mute())
}

#[tauri::command]
pub async fn get_display_state(controller: Controller<'_>) -> Result<DisplayState, String> {
    Ok(controller.lock().display_state())
}

#[tauri::command]
pub async fn retry_audio_init(controller: Controller<'_>) -> Result<(), String> {
    // The lock is released before awaiting so the UI stays responsive while clips load.
    let (audio, presenter) = {
        let controller = controller.lock();
        (controller.audio(), controller.presenter())
    };
    log::info!("Retrying audio initialization");
    initialize_audio(&audio, presenter.as_ref())
        .await
        .map_err(|err| err.message().to_string())
}

fn report_error(controller: &SessionController, error: AppError) -> String {
    controller.presenter().report_error(error.payload());
    if let Some(detail) = error.detail() {
        log::error!("App error ({:?}): {detail}", error.kind());
    } else {
        log::error!("App error ({:?}): {}", error.kind(), error.message());
    }
    error.message().to_string()
}
