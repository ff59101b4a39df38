//! Reference documents (usually PDFs) sent alongside the screenshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// `source` is a local path or an `http`/`https` address.
    async fn fetch(&self, source: &str) -> Result<Document, FetchError>;
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Guess the MIME type from the file name; anything unknown is sent as PDF.
pub fn mime_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/pdf",
    }
}

pub struct HttpDocumentFetcher {
    client: Client,
}

impl HttpDocumentFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<Document, FetchError> {
        log::info!("Attempting to download document from {}...", url);

        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        log::info!("Downloaded {} bytes.", bytes.len());

        let name = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(|s| s.split(['?', '#']).next().unwrap_or(s))
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("downloaded.pdf")
            .to_string();

        Ok(Document {
            mime_type: mime_for(&name).to_string(),
            name,
            bytes: bytes.to_vec(),
        })
    }

    async fn read_local(&self, source: &str) -> Result<Document, FetchError> {
        let path = PathBuf::from(source);
        log::info!("Reading local document {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(path.clone())
            } else {
                FetchError::Io {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());

        Ok(Document {
            mime_type: mime_for(&name).to_string(),
            name,
            bytes,
        })
    }
}

impl Default for HttpDocumentFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, source: &str) -> Result<Document, FetchError> {
        let source = source.trim();
        if is_remote(source) {
            self.download(source).await
        } else {
            self.read_local(source).await
        }
    }
}
