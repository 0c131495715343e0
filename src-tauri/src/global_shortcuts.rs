use crate::events::InteractionKind;
use crate::session_controller::SessionController;
use parking_lot::Mutex;
use tauri::{AppHandle, Manager};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

const TOGGLE_SHORTCUT: &str = "super+shift+Space";
const STOP_SHORTCUT: &str = "super+shift+Escape";
const MUTE_SHORTCUT: &str = "super+shift+KeyM";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShortcutAction {
    ToggleSession,
    StopSession,
    ToggleMute,
}

#[derive(Clone, Copy, Debug)]
struct ShortcutBinding {
    shortcut: &'static str,
    action: ShortcutAction,
}

const SHORTCUT_BINDINGS: [ShortcutBinding; 3] = [
    ShortcutBinding {
        shortcut: TOGGLE_SHORTCUT,
        action: ShortcutAction::ToggleSession,
    },
    ShortcutBinding {
        shortcut: STOP_SHORTCUT,
        action: ShortcutAction::StopSession,
    },
    ShortcutBinding {
        shortcut: MUTE_SHORTCUT,
        action: ShortcutAction::ToggleMute,
    },
];

pub fn register_global_shortcuts(app: &AppHandle) {
    let global = app.global_shortcut();
    for binding in SHORTCUT_BINDINGS {
        let shortcut = binding.shortcut;
        let action = binding.action;
        let result = global.on_shortcut(shortcut, move |app, _shortcut, event| {
            if event.state != ShortcutState::Pressed {
                return;
            }
            // Shortcut callbacks arrive on the event loop; sessions spawn tasks on the runtime.
            let app = app.clone();
            tauri::async_runtime::spawn(async move {
                handle_action(&app, action);
            });
        });
        if let Err(err) = result {
            log::warn!("Failed to register global shortcut {shortcut}: {err}");
        }
    }
}

fn handle_action(app: &AppHandle, action: ShortcutAction) {
    let state = app.state::<Mutex<SessionController>>();
    let mut controller = state.lock();
    controller.record_interaction(InteractionKind::Keyboard {
        key: shortcut_for(action).to_string(),
    });
    match action {
        ShortcutAction::ToggleSession => {
            controller.toggle();
        }
        ShortcutAction::StopSession => {
            controller.stop();
        }
        ShortcutAction::ToggleMute => {
            controller.toggle_mute();
        }
    }
}

fn shortcut_for(action: ShortcutAction) -> &'static str {
    SHORTCUT_BINDINGS
        .iter()
        .find(|binding| binding.action == action)
        .map(|binding| binding.shortcut)
        .unwrap_or_default()
}
