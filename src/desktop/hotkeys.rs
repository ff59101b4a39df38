use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

use super::{emit_mode, emit_usage, request_shutdown, shared};
use crate::orchestrator::Outcome;
use crate::state::Mode;

/// Arm the question and quit hotkeys. `false` if listening could not start.
pub fn start_listening(app: &AppHandle) -> bool {
    let Some(shared) = shared(app) else { return false };

    let started = shared.state.lock().begin_listening();
    match started {
        Ok(true) => {}
        Ok(false) => return true,
        Err(e) => {
            log::error!("{}", e);
            emit_mode(app, Mode::Configuring);
            return false;
        }
    }

    log::info!("Entering listening state...");
    let (question, quit) = {
        let config = shared.config.lock();
        (config.question_hotkey.clone(), config.quit_hotkey.clone())
    };

    match register(app, &question, &quit) {
        Ok(()) => {
            log::info!("Keyboard hotkeys registered ({}, {}).", question, quit);
            log::info!("Listening state active. Hotkeys are enabled.");
            emit_mode(app, Mode::Listening);
            true
        }
        Err(e) => {
            log::error!("Failed to register hotkeys: {}", e);
            unregister(app);
            shared.state.lock().end_listening();
            log::info!("Returning to configuring state.");
            emit_mode(app, Mode::Configuring);
            false
        }
    }
}

pub fn stop_listening(app: &AppHandle) {
    let Some(shared) = shared(app) else { return };
    if !shared.state.lock().end_listening() {
        return;
    }

    log::info!("Entering configuring state...");
    unregister(app);
    log::info!("Configuring state active. Hotkeys are disabled.");
    emit_mode(app, Mode::Configuring);
}

pub fn unregister(app: &AppHandle) {
    match app.global_shortcut().unregister_all() {
        Ok(()) => log::info!("Keyboard hotkeys unhooked."),
        Err(e) => log::warn!("Error unhooking hotkeys: {}", e),
    }
}

fn register(
    app: &AppHandle,
    question: &str,
    quit: &str,
) -> Result<(), tauri_plugin_global_shortcut::Error> {
    let shortcuts = app.global_shortcut();

    shortcuts.on_shortcut(question, |app, _shortcut, event| {
        if event.state() == ShortcutState::Pressed {
            ask_question(app);
        }
    })?;

    shortcuts.on_shortcut(quit, |app, _shortcut, event| {
        if event.state() == ShortcutState::Pressed {
            request_shutdown(app);
        }
    })?;

    Ok(())
}

/// Runs on its own task so the hotkey thread never blocks on the network.
fn ask_question(app: &AppHandle) {
    let Some(shared) = shared(app) else { return };
    let Some(trigger) = shared.state.lock().trigger() else {
        return;
    };
    log::info!("Question hotkey detected.");

    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let outcome = shared.gate.run(shared.orchestrator.handle(&trigger)).await;
        if let Some(Outcome::Answered { usage, .. }) = outcome {
            emit_usage(&app, usage);
        }
    });
}
