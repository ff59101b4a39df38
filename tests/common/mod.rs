#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use screen_qa_lib::ai::prompt::PromptLibrary;
use screen_qa_lib::ai::{ContentPart, GatewayReply, ModelGateway};
use screen_qa_lib::capture::{CaptureArtifact, CaptureProvider};
use screen_qa_lib::credentials::{Credential, CredentialStore};
use screen_qa_lib::display::{StatusColor, StatusDisplay};
use screen_qa_lib::documents::{Document, DocumentFetcher};
use screen_qa_lib::orchestrator::{Orchestrator, ResponseLimits};
use screen_qa_lib::usage::UsageLedger;
use screen_qa_lib::{Error, FetchError, Result};

/// Writes a fresh PNG-ish file per capture, or fails when told to.
pub struct FakeCapture {
    dir: PathBuf,
    fail: bool,
    count: AtomicUsize,
    pub captured: Mutex<Vec<PathBuf>>,
}

impl FakeCapture {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fail: false,
            count: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(dir: &Path) -> Self {
        Self {
            fail: true,
            ..Self::new(dir)
        }
    }
}

#[async_trait]
impl CaptureProvider for FakeCapture {
    async fn capture(&self) -> Result<CaptureArtifact> {
        if self.fail {
            return Err(Error::Capture("No monitors found".to_string()));
        }
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("shot-{n}.png"));
        fs::write(&path, b"\x89PNG fake")?;
        self.captured.lock().push(path.clone());
        Ok(CaptureArtifact::png(path))
    }
}

/// Serves documents from a map; anything else is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl FakeFetcher {
    pub fn with(mut self, source: &str, bytes: &[u8]) -> Self {
        self.documents.insert(source.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, source: &str) -> std::result::Result<Document, FetchError> {
        match self.documents.get(source) {
            Some(bytes) => Ok(Document {
                name: source.to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: bytes.clone(),
            }),
            None => Err(FetchError::Status {
                url: source.to_string(),
                status: 404,
            }),
        }
    }
}

pub enum Scripted {
    Reply(GatewayReply),
    RateLimited,
    BadKey,
}

pub struct Call {
    pub credential: String,
    pub model: String,
    pub parts: Vec<ContentPart>,
}

/// Records every call and answers with the scripted result.
pub struct FakeGateway {
    script: Scripted,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub fn new(script: Scripted) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str, tokens: u64) -> Self {
        Self::new(Scripted::Reply(GatewayReply {
            text: Some(text.to_string()),
            total_tokens: tokens,
            block_reason: None,
        }))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn generate(
        &self,
        credential: &Credential,
        model: &str,
        parts: &[ContentPart],
    ) -> Result<GatewayReply> {
        self.calls.lock().push(Call {
            credential: credential.expose().to_string(),
            model: model.to_string(),
            parts: parts.to_vec(),
        });
        match &self.script {
            Scripted::Reply(reply) => Ok(reply.clone()),
            Scripted::RateLimited => Err(Error::GatewayRateLimit("Quota exceeded".to_string())),
            Scripted::BadKey => Err(Error::GatewayAuth("API key not valid.".to_string())),
        }
    }

    async fn list_models(&self, _credential: &Credential) -> Result<Vec<String>> {
        Ok(vec!["models/fake".to_string()])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Loading,
    Text(String, StatusColor),
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub shown: Mutex<Vec<Shown>>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<Shown> {
        self.shown.lock().last().cloned()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show_loading(&self) {
        self.shown.lock().push(Shown::Loading);
    }

    fn show_text(&self, text: &str, color: StatusColor) {
        self.shown.lock().push(Shown::Text(text.to_string(), color));
    }
}

/// A temp data dir with keys `A`, `B`, `C` and a default prompt.
pub struct Harness {
    pub dir: TempDir,
    pub credentials: Arc<Mutex<CredentialStore>>,
    pub ledger: Arc<Mutex<UsageLedger>>,
    pub display: Arc<RecordingDisplay>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let keys = dir.path().join("apikeys.txt");
        fs::write(&keys, "# cursor: none\nA\nB\nC\n").unwrap();

        let prompts = dir.path().join("prompt_files");
        fs::create_dir_all(&prompts).unwrap();
        fs::write(
            prompts.join("default_prompt.txt"),
            "Answer the question on screen in under 128 characters.\n",
        )
        .unwrap();

        Self {
            credentials: Arc::new(Mutex::new(CredentialStore::initialize(&keys).unwrap())),
            ledger: Arc::new(Mutex::new(UsageLedger::load(dir.path().join("token_usage.json")))),
            display: Arc::new(RecordingDisplay::default()),
            dir,
        }
    }

    pub fn orchestrator(
        &self,
        capture: Arc<FakeCapture>,
        fetcher: FakeFetcher,
        gateway: Arc<FakeGateway>,
    ) -> Orchestrator {
        Orchestrator::new(
            self.credentials.clone(),
            capture,
            Arc::new(fetcher),
            gateway,
            self.display.clone(),
            self.ledger.clone(),
            PromptLibrary::new(self.dir.path().join("prompt_files")),
            ResponseLimits::default(),
        )
    }

    pub fn capture(&self) -> Arc<FakeCapture> {
        Arc::new(FakeCapture::new(self.dir.path()))
    }

    pub fn total_tokens(&self) -> u64 {
        self.ledger.lock().snapshot().total
    }
}
