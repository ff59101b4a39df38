use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a hotkey press and the tray answer.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable credential file, prompt template or setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The model API rejected the credential.
    #[error("Invalid API key: {0}")]
    GatewayAuth(String),

    /// The model API reported quota exhaustion.
    #[error("API rate limit exceeded: {0}")]
    GatewayRateLimit(String),

    /// The request went through but produced no usable text.
    #[error("Model returned no usable text{}", .block_reason.as_deref().map(|r| format!(" (blocked: {r})")).unwrap_or_default())]
    GatewayEmptyResponse { block_reason: Option<String> },

    #[error("Model request failed: {0}")]
    Gateway(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reference document acquisition failures. Never fatal for a request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Local file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server answered, but not with a success status.
    #[error("HTTP {status} while downloading {url}")]
    Status { url: String, status: u16 },

    /// The server could not be reached or the transfer broke off.
    #[error("Network error while downloading {url}: {message}")]
    Network { url: String, message: String },
}

impl Error {
    /// True for failures reported by the model API itself rather than by the
    /// local side of the pipeline.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            Error::GatewayAuth(_)
                | Error::GatewayRateLimit(_)
                | Error::GatewayEmptyResponse { .. }
                | Error::Gateway(_)
        )
    }
}
