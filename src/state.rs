use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Whether the question hotkey is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Configuring,
    Listening,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Configuring => "configuring",
            Mode::Listening => "listening",
        }
    }
}

/// Inputs captured for one question at the moment the hotkey fires.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub model: String,
    pub documents: Vec<String>,
    pub prompt_name: String,
}

/// Process-wide settings and flags. Only changed through the methods below.
#[derive(Debug)]
pub struct AppState {
    mode: Mode,
    hidden: bool,
    quitting: bool,
    selected_model: String,
    pdf_sources: Vec<String>,
    prompt_name: String,
}

impl AppState {
    pub fn new(config: &AppConfig, prompt_name: impl Into<String>) -> Self {
        Self {
            mode: Mode::Configuring,
            hidden: false,
            quitting: false,
            selected_model: config.selected_model.clone(),
            pdf_sources: config.pdf_sources.clone(),
            prompt_name: prompt_name.into(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_listening(&self) -> bool {
        self.mode == Mode::Listening
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn pdf_sources(&self) -> &[String] {
        &self.pdf_sources
    }

    pub fn prompt_name(&self) -> &str {
        &self.prompt_name
    }

    /// Arm the hotkeys. Returns `Ok(false)` if already listening.
    pub fn begin_listening(&mut self) -> Result<bool> {
        if self.is_listening() {
            log::info!("Already in listening state.");
            return Ok(false);
        }
        if self.selected_model.trim().is_empty() {
            return Err(Error::Configuration(
                "No AI model selected. Cannot start listening.".to_string(),
            ));
        }
        if self.pdf_sources.is_empty() {
            log::warn!("No PDF sources added. Will only use image for context.");
        }
        self.mode = Mode::Listening;
        Ok(true)
    }

    /// Returns `false` if already configuring.
    pub fn end_listening(&mut self) -> bool {
        if !self.is_listening() {
            log::info!("Already in configuring state.");
            return false;
        }
        self.mode = Mode::Configuring;
        true
    }

    /// Replace the document list. `true` means listening has to stop.
    pub fn set_pdf_sources(&mut self, sources: Vec<String>) -> bool {
        log::info!("UI updated PDF sources: {:?}", sources);
        self.pdf_sources = sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.stop_after_change("PDF sources")
    }

    /// Append one picked file. `None` if it was blank or already listed,
    /// otherwise whether listening has to stop.
    pub fn add_pdf_source(&mut self, source: &str) -> Option<bool> {
        let source = source.trim();
        if source.is_empty() || self.pdf_sources.iter().any(|s| s == source) {
            return None;
        }
        log::info!("UI added PDF source: {}", source);
        self.pdf_sources.push(source.to_string());
        Some(self.stop_after_change("PDF sources"))
    }

    /// Replace the model. `true` means listening has to stop.
    pub fn set_selected_model(&mut self, model: String) -> bool {
        log::info!("UI selected model: {}", model);
        self.selected_model = model.trim().to_string();
        self.stop_after_change("Model")
    }

    fn stop_after_change(&self, what: &str) -> bool {
        if self.is_listening() {
            log::warn!(
                "{} changed while listening. Automatically stopping listening.",
                what
            );
            true
        } else {
            false
        }
    }

    pub fn toggle_hidden(&mut self) -> bool {
        self.hidden = !self.hidden;
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// `true` only for the first request.
    pub fn request_shutdown(&mut self) -> bool {
        if self.quitting {
            return false;
        }
        log::info!("Shutdown requested.");
        self.quitting = true;
        true
    }

    /// The inputs for a question, or `None` when hotkeys should be ignored.
    pub fn trigger(&self) -> Option<Trigger> {
        if !self.is_listening() || self.quitting {
            return None;
        }
        Some(Trigger {
            model: self.selected_model.clone(),
            documents: self.pdf_sources.clone(),
            prompt_name: self.prompt_name.clone(),
        })
    }

    /// Current settings in config form, for saving.
    pub fn to_config(&self, base: &AppConfig) -> AppConfig {
        AppConfig {
            selected_model: self.selected_model.clone(),
            pdf_sources: self.pdf_sources.clone(),
            ..base.clone()
        }
    }
}
