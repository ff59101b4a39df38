use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const APP_DIR: &str = "screen-qa";

/// Where everything the app reads and writes lives.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub usage_file: PathBuf,
    pub prompt_dir: PathBuf,
}

impl AppPaths {
    /// `$SCREEN_QA_HOME`, else `<config dir>/screen-qa`. The key file can be
    /// moved on its own with `$SCREEN_QA_CREDENTIALS`.
    pub fn resolve() -> Self {
        let data_dir = std::env::var_os("SCREEN_QA_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut paths = Self::in_dir(data_dir);
        if let Some(keys) = std::env::var_os("SCREEN_QA_CREDENTIALS") {
            paths.credentials_file = PathBuf::from(keys);
        }
        paths
    }

    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            credentials_file: data_dir.join("apikeys.txt"),
            usage_file: data_dir.join("token_usage.json"),
            prompt_dir: data_dir.join("prompt_files"),
            data_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub selected_model: String,
    pub pdf_sources: Vec<String>,
    pub api_base: String,
    pub question_hotkey: String,
    pub quit_hotkey: String,
    /// Answers longer than this are still shown but logged as over-long.
    pub response_soft_limit: usize,
    /// Tray text is cut to this many characters.
    pub display_limit: usize,
    pub document_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            selected_model: DEFAULT_MODEL.to_string(),
            pdf_sources: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            question_hotkey: "CmdOrCtrl+Shift+Q".to_string(),
            quit_hotkey: "CmdOrCtrl+Alt+Shift+C".to_string(),
            response_soft_limit: 128,
            display_limit: 256,
            document_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn load(app_data: &Path) -> Self {
        let config_path = app_data.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                    Self::default()
                }),
                Err(_) => Self::default(),
            }
        } else {
            let c = Self::default();
            c.save(app_data);
            c
        };

        if let Ok(model) = std::env::var("SCREEN_QA_MODEL") {
            if !model.is_empty() {
                config.selected_model = model;
            }
        }

        config
    }

    pub fn save(&self, app_data: &Path) {
        let config_path = app_data.join("config.json");
        if let Err(e) = std::fs::create_dir_all(app_data) {
            log::warn!("Failed to create {}: {}", app_data.display(), e);
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&config_path, content) {
                    log::warn!("Failed to save {}: {}", config_path.display(), e);
                }
            }
            Err(e) => log::warn!("Failed to serialize config: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path());

        assert_eq!(config.response_soft_limit, 128);
        assert_eq!(config.document_timeout_secs, 30);
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn saved_changes_are_loaded_back() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.selected_model = "models/gemini-2.0-flash".to_string();
        config.pdf_sources = vec!["notes.pdf".to_string()];
        config.save(dir.path());

        let loaded = AppConfig::load(dir.path());
        assert_eq!(loaded.pdf_sources, vec!["notes.pdf".to_string()]);
        assert_eq!(loaded.display_limit, config.display_limit);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "pdf_sources": ["https://example.com/a.pdf"] }"#,
        )
        .unwrap();

        let loaded = AppConfig::load(dir.path());
        assert_eq!(loaded.pdf_sources.len(), 1);
        assert_eq!(loaded.question_hotkey, "CmdOrCtrl+Shift+Q");
    }

    #[test]
    fn paths_hang_off_the_data_dir() {
        let paths = AppPaths::in_dir("/tmp/qa");
        assert_eq!(paths.credentials_file, PathBuf::from("/tmp/qa/apikeys.txt"));
        assert_eq!(paths.prompt_dir, PathBuf::from("/tmp/qa/prompt_files"));
    }
}
