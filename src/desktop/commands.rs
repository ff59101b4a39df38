use std::sync::Arc;

use serde::Serialize;
use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

use super::{hotkeys, Shared};
use crate::state::Mode;
use crate::usage::UsageSnapshot;

type SharedState<'a> = tauri::State<'a, Arc<Shared>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub pdf_sources: Vec<String>,
    pub selected_model: String,
    pub available_models: Vec<String>,
    pub token_usage: UsageSnapshot,
    pub ui_state: Mode,
}

#[tauri::command]
pub async fn get_current_config(shared: SharedState<'_>) -> Result<ConfigView, String> {
    let shared = shared.inner().clone();
    let available_models = shared.available_models().await;

    let state = shared.state.lock();
    Ok(ConfigView {
        pdf_sources: state.pdf_sources().to_vec(),
        selected_model: state.selected_model().to_string(),
        available_models,
        token_usage: shared.usage(),
        ui_state: state.mode(),
    })
}

#[tauri::command]
pub fn get_pdf_sources(shared: SharedState<'_>) -> Vec<String> {
    shared.state.lock().pdf_sources().to_vec()
}

#[tauri::command]
pub fn set_pdf_sources(app: AppHandle, shared: SharedState<'_>, sources: Vec<String>) {
    let must_stop = shared.state.lock().set_pdf_sources(sources);
    shared.save_config();
    if must_stop {
        hotkeys::stop_listening(&app);
    }
}

/// Let the user pick a local PDF and add it to the list. Returns the picked
/// path, or `None` if the dialog was cancelled.
#[tauri::command]
pub async fn browse_pdf(app: AppHandle, shared: SharedState<'_>) -> Result<Option<String>, String> {
    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .set_title("Select a PDF file")
        .add_filter("PDF Files", &["pdf"])
        .pick_file(move |picked| {
            let _ = tx.send(picked);
        });

    let Some(picked) = rx.await.map_err(|e| e.to_string())? else {
        log::info!("No PDF file selected.");
        return Ok(None);
    };
    let path = picked.to_string();

    let added = shared.state.lock().add_pdf_source(&path);
    if let Some(must_stop) = added {
        shared.save_config();
        if must_stop {
            hotkeys::stop_listening(&app);
        }
    }
    Ok(Some(path))
}

#[tauri::command]
pub async fn get_available_models(shared: SharedState<'_>) -> Result<Vec<String>, String> {
    let shared = shared.inner().clone();
    Ok(shared.available_models().await)
}

#[tauri::command]
pub fn get_selected_model(shared: SharedState<'_>) -> String {
    shared.state.lock().selected_model().to_string()
}

#[tauri::command]
pub fn set_selected_model(app: AppHandle, shared: SharedState<'_>, model: String) {
    let must_stop = shared.state.lock().set_selected_model(model);
    shared.save_config();
    if must_stop {
        hotkeys::stop_listening(&app);
    }
}

#[tauri::command]
pub fn get_token_usage(shared: SharedState<'_>) -> UsageSnapshot {
    shared.usage()
}

#[tauri::command]
pub fn start_listening(app: AppHandle) -> bool {
    hotkeys::start_listening(&app)
}

#[tauri::command]
pub fn stop_listening(app: AppHandle) {
    hotkeys::stop_listening(&app);
}

#[tauri::command]
pub fn toggle_ui_visibility(app: AppHandle) {
    super::toggle_window(&app);
}

#[tauri::command]
pub fn quit_app(app: AppHandle) {
    super::request_shutdown(&app);
}

#[tauri::command]
pub fn get_log_backlog(shared: SharedState<'_>) -> Vec<String> {
    shared.backlog.snapshot()
}
