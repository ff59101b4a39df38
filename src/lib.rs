//! Hotkey-driven screenshot questions answered by a hosted multimodal model.
//!
//! The pipeline core (key rotation, request orchestration, usage accounting)
//! builds without any GUI stack; the `desktop` feature adds the Tauri tray,
//! configuration window, global hotkeys and xcap screen capture.

pub mod ai;
pub mod capture;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod display;
pub mod documents;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod state;
pub mod usage;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use error::{Error, FetchError, Result};

#[cfg(feature = "desktop")]
pub use desktop::run;
