pub mod app_error;
pub mod audio_manager;
#[cfg(feature = "rodio-output")]
pub mod audio_output;
#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod events;
#[cfg(feature = "desktop")]
mod global_shortcuts;
pub mod models;
pub mod phase_sequencer;
pub mod runtime_state;
pub mod session_controller;
pub mod session_tracker;
pub mod timer_set;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::app_error::AppError;
    use crate::audio_manager::{AudioManager, CueBackend};
    use crate::config::SequencerConfig;
    use crate::events::{PresentationSink, TauriPresenter};
    use crate::session_controller::{initialize_audio, SessionController};
    use crate::{commands, global_shortcuts};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tauri::{App, Manager};

    const CONFIG_FILE_NAME: &str = "breathing.json";

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        tauri::Builder::default()
            .plugin(
                tauri_plugin_log::Builder::new()
                    .level(log::LevelFilter::Info)
                    .build(),
            )
            .plugin(tauri_plugin_global_shortcut::Builder::new().build())
            .setup(|app| {
                let presenter = Arc::new(TauriPresenter::new(app.handle().clone()));
                let config = load_config(app, presenter.as_ref());
                let audio = Arc::new(AudioManager::new(cue_backend(app), config.audio_timeout()));
                let controller = SessionController::new(
                    config,
                    Arc::clone(&audio),
                    presenter.clone(),
                    presenter.clone(),
                );
                app.manage(Mutex::new(controller));

                tauri::async_runtime::spawn(async move {
                    if initialize_audio(&audio, presenter.as_ref()).await.is_ok() {
                        log::info!("Audio cues ready");
                    }
                });
                global_shortcuts::register_global_shortcuts(app.handle());
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                commands::start_session,
                commands::stop_session,
                commands::toggle_session,
                commands::tap_circle,
                commands::handle_key,
                commands::toggle_mute,
                commands::get_display_state,
                commands::retry_audio_init,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }

    /// A broken settings file is reported and replaced by the defaults.
    fn load_config(app: &App, presenter: &dyn PresentationSink) -> SequencerConfig {
        let path = match app.path().app_config_dir() {
            Ok(dir) => dir.join(CONFIG_FILE_NAME),
            Err(err) => {
                log::warn!("No config directory ({err}); using default timing");
                return SequencerConfig::default();
            }
        };
        match SequencerConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                let error = AppError::from(err);
                log::error!("{error}; using default timing");
                presenter.report_error(error.payload());
                SequencerConfig::default()
            }
        }
    }

    #[cfg(feature = "rodio-output")]
    fn cue_backend(app: &App) -> Arc<dyn CueBackend> {
        use crate::audio_output::RodioBackend;

        let asset_dir = app
            .path()
            .resource_dir()
            .map(|dir| dir.join("audio"))
            .unwrap_or_else(|_| std::path::PathBuf::from("audio"));
        Arc::new(RodioBackend::new(asset_dir))
    }

    #[cfg(not(feature = "rodio-output"))]
    fn cue_backend(_app: &App) -> Arc<dyn CueBackend> {
        log::warn!("Built without audio output; cues are silent");
        Arc::new(crate::audio_manager::SilentBackend)
    }
}
