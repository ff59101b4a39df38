//! Tauri shell: tray icon, configuration window, global hotkeys.

mod commands;
mod hotkeys;
mod tray;

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tauri::{AppHandle, Emitter, Manager, WebviewUrl, WebviewWindowBuilder, WindowEvent};
use tokio::sync::{mpsc, watch};

use crate::ai::gemini::GeminiGateway;
use crate::ai::prompt::PromptLibrary;
use crate::ai::ModelGateway;
use crate::capture::screen::ScreenCapture;
use crate::cli::Cli;
use crate::config::{AppConfig, AppPaths};
use crate::credentials::CredentialStore;
use crate::display::StatusDisplay;
use crate::documents::HttpDocumentFetcher;
use crate::logging::{LogBacklog, LogStream};
use crate::orchestrator::{CredentialHandle, LedgerHandle, Orchestrator, ResponseLimits, TriggerGate};
use crate::state::{AppState, Mode};
use crate::usage::{UsageLedger, UsageSnapshot};

pub use tray::TrayStatus;

const WINDOW_LABEL: &str = "config";

/// Everything the commands, hotkeys and tray need, managed as Tauri state.
pub(crate) struct Shared {
    state: Mutex<AppState>,
    config: Mutex<AppConfig>,
    paths: AppPaths,
    credentials: CredentialHandle,
    ledger: LedgerHandle,
    gateway: Arc<dyn ModelGateway>,
    orchestrator: Orchestrator,
    gate: TriggerGate,
    display: Arc<TrayStatus>,
    backlog: LogBacklog,
    log_shutdown: watch::Sender<bool>,
    log_task: Mutex<Option<tauri::async_runtime::JoinHandle<()>>>,
}

impl Shared {
    fn save_config(&self) {
        let updated = {
            let state = self.state.lock();
            let mut config = self.config.lock();
            *config = state.to_config(&config);
            config.clone()
        };
        updated.save(&self.paths.data_dir);
    }

    fn usage(&self) -> UsageSnapshot {
        self.ledger.lock().snapshot()
    }

    /// Models that can answer questions; the selected one alone on failure.
    async fn available_models(&self) -> Vec<String> {
        let credential = self.credentials.lock().current().clone();
        let selected = self.state.lock().selected_model().to_string();

        match self.gateway.list_models(&credential).await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => vec![selected],
            Err(e) => {
                log::error!("Failed to fetch models: {}", e);
                vec![selected]
            }
        }
    }

    async fn stop_log_forwarding(&self) {
        let _ = self.log_shutdown.send(true);
        let task = self.log_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("Log forwarding task failed: {}", e);
            }
        }
    }
}

pub(crate) fn shared(app: &AppHandle) -> Option<Arc<Shared>> {
    app.try_state::<Arc<Shared>>().map(|s| s.inner().clone())
}

pub(crate) fn emit_mode(app: &AppHandle, mode: Mode) {
    if let Err(e) = app.emit("ui-state", mode.as_str()) {
        log::error!("Error sending UI state: {}", e);
    }
}

pub(crate) fn emit_usage(app: &AppHandle, usage: UsageSnapshot) {
    if let Err(e) = app.emit("token-usage", usage) {
        log::error!("Error sending token usage: {}", e);
    }
}

pub(crate) fn toggle_window(app: &AppHandle) {
    let Some(window) = app.get_webview_window(WINDOW_LABEL) else {
        log::warn!("UI window not yet loaded.");
        return;
    };
    let Some(shared) = shared(app) else { return };

    let hidden = shared.state.lock().toggle_hidden();
    let result = if hidden {
        window.hide()
    } else {
        window.show().and_then(|_| window.set_focus())
    };
    match result {
        Ok(()) if hidden => log::info!("UI: Window hidden."),
        Ok(()) => log::info!("UI: Window shown."),
        Err(e) => log::error!("Error toggling window: {}", e),
    }
}

/// Stop everything and exit. Waits for log forwarding to wind down but not
/// for questions still in flight.
pub(crate) fn request_shutdown(app: &AppHandle) {
    let Some(shared) = shared(app) else {
        app.exit(0);
        return;
    };
    if !shared.state.lock().request_shutdown() {
        return;
    }

    shared.display.show_loading();
    hotkeys::unregister(app);

    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        log::info!("Application loop finished. Starting cleanup...");
        shared.stop_log_forwarding().await;
        log::info!("Program finished.");
        app.exit(0);
    });
}

async fn forward_logs(
    app: AppHandle,
    mut lines: mpsc::UnboundedReceiver<String>,
    backlog: LogBacklog,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    backlog.push(line.clone());
                    // The window may already be gone.
                    let _ = app.emit("log-line", line);
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Load the key pool and settings, then hand control to the Tauri event
/// loop. An error here means the app never started.
pub fn run(cli: Cli, logs: LogStream) -> anyhow::Result<()> {
    let paths = AppPaths::resolve();
    let config = AppConfig::load(&paths.data_dir);

    let credentials = CredentialStore::initialize(&paths.credentials_file)
        .context("API key pool initialization failed")?;
    log::info!("Initial API key: {}", credentials.current());

    let ledger = UsageLedger::load(&paths.usage_file);
    let usage = ledger.snapshot();
    log::info!(
        "Loaded initial token data: Total={}, Daily for Today={}",
        usage.total,
        usage.today
    );

    let mut state = AppState::new(&config, cli.prompt.clone());
    state.set_hidden(cli.listen);
    log::info!("Prompt file: {}", PromptLibrary::file_name(&cli.prompt));

    let credentials = Arc::new(Mutex::new(credentials));
    let ledger = Arc::new(Mutex::new(ledger));

    tauri::Builder::default()
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            let window = WebviewWindowBuilder::new(app, WINDOW_LABEL, WebviewUrl::App("index.html".into()))
                .title("Screen QA Config")
                .inner_size(800.0, 600.0)
                .resizable(true)
                .visible(!cli.listen)
                .build()?;

            let display = Arc::new(TrayStatus::new(tray::build(app)?));
            display.show_ready();

            let gateway: Arc<dyn ModelGateway> = Arc::new(GeminiGateway::new(config.api_base.clone()));
            let orchestrator = Orchestrator::new(
                credentials.clone(),
                Arc::new(ScreenCapture::new()),
                Arc::new(HttpDocumentFetcher::new(std::time::Duration::from_secs(
                    config.document_timeout_secs,
                ))),
                gateway.clone(),
                display.clone(),
                ledger.clone(),
                PromptLibrary::new(&paths.prompt_dir),
                ResponseLimits {
                    soft_limit: config.response_soft_limit,
                    display_limit: config.display_limit,
                },
            );

            let (log_shutdown, log_shutdown_rx) = watch::channel(false);
            let LogStream { lines, backlog } = logs;

            let shared = Arc::new(Shared {
                state: Mutex::new(state),
                config: Mutex::new(config),
                paths,
                credentials,
                ledger,
                gateway,
                orchestrator,
                gate: TriggerGate::new(),
                display,
                backlog: backlog.clone(),
                log_shutdown,
                log_task: Mutex::new(None),
            });
            app.manage(shared.clone());

            let task = tauri::async_runtime::spawn(forward_logs(
                app.handle().clone(),
                lines,
                backlog,
                log_shutdown_rx,
            ));
            *shared.log_task.lock() = Some(task);
            log::info!("UI: Log monitoring task started.");

            let handle = app.handle().clone();
            window.on_window_event(move |event| {
                if let WindowEvent::CloseRequested { api, .. } = event {
                    api.prevent_close();
                    log::info!("UI: Window closed by user.");
                    request_shutdown(&handle);
                }
            });

            if cli.listen {
                hotkeys::start_listening(app.handle());
            }

            log::info!("Setup complete.");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_current_config,
            commands::get_pdf_sources,
            commands::set_pdf_sources,
            commands::browse_pdf,
            commands::get_available_models,
            commands::get_selected_model,
            commands::set_selected_model,
            commands::get_token_usage,
            commands::start_listening,
            commands::stop_listening,
            commands::toggle_ui_visibility,
            commands::quit_app,
            commands::get_log_backlog,
        ])
        .run(tauri::generate_context!())
        .context("error while running screen-qa")?;

    Ok(())
}
