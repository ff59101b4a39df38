use std::path::PathBuf;

use async_trait::async_trait;

use super::{CaptureArtifact, CaptureProvider};
use crate::error::{Error, Result};

const MAX_WIDTH: u32 = 1920;

/// Captures the first monitor with xcap and writes a PNG to the temp dir.
pub struct ScreenCapture {
    dir: PathBuf,
}

impl ScreenCapture {
    pub fn new() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }
}

impl Default for ScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureProvider for ScreenCapture {
    async fn capture(&self) -> Result<CaptureArtifact> {
        let path = self.dir.join(format!(
            "screen-qa-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));

        let target = path.clone();
        tokio::task::spawn_blocking(move || capture_to(&target))
            .await
            .map_err(|e| Error::Capture(format!("capture task failed: {}", e)))??;

        log::info!("Screenshot saved to {}", path.display());
        Ok(CaptureArtifact::png(path))
    }
}

fn capture_to(path: &std::path::Path) -> Result<()> {
    let monitors =
        xcap::Monitor::all().map_err(|e| Error::Capture(format!("Failed to list monitors: {}", e)))?;

    let monitor = monitors
        .first()
        .ok_or_else(|| Error::Capture("No monitors found".to_string()))?;

    let image = monitor
        .capture_image()
        .map_err(|e| Error::Capture(format!("Failed to capture screen: {}", e)))?;

    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return Err(Error::Capture("Captured an empty image".to_string()));
    }

    // Very large desktops are scaled down; text stays legible at this width.
    let image = if width > MAX_WIDTH {
        let scale = MAX_WIDTH as f64 / width as f64;
        let new_height = (height as f64 * scale) as u32;
        image::imageops::resize(
            &image,
            MAX_WIDTH,
            new_height,
            image::imageops::FilterType::Triangle,
        )
    } else {
        image
    };

    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| Error::Capture(format!("Failed to encode image: {}", e)))
}
