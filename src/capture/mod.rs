#[cfg(feature = "desktop")]
pub mod screen;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Source of the screen image attached to every question.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Grab the screen into a temporary file.
    async fn capture(&self) -> Result<CaptureArtifact>;
}

/// A captured image on disk. Consumed by [`CaptureArtifact::discard`] once
/// the request is over.
#[derive(Debug)]
pub struct CaptureArtifact {
    path: PathBuf,
    mime_type: String,
}

impl CaptureArtifact {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn png(path: impl Into<PathBuf>) -> Self {
        Self::new(path, "image/png")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Remove the file. Failures are logged only.
    pub async fn discard(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => log::info!("Temporary image file removed."),
            Err(e) => log::error!(
                "Failed to remove temporary image file '{}': {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discard_removes_file_and_tolerates_missing_one() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"png").unwrap();

        let artifact = CaptureArtifact::png(&path);
        assert_eq!(artifact.read().await.unwrap(), b"png");
        artifact.discard().await;
        assert!(!path.exists());

        // Second removal fails quietly.
        CaptureArtifact::png(&path).discard().await;
    }
}
