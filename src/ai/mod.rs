pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureArtifact;
use crate::credentials::Credential;
use crate::documents::Document;
use crate::error::Result;

/// One element of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Inline { mime_type: String, data: Vec<u8> },
    Text(String),
}

/// Everything sent for a single question: the screenshot, any reference
/// documents, then the instruction. Cannot be built without a screenshot
/// and an instruction.
#[derive(Debug)]
pub struct RequestBundle {
    capture: ContentPart,
    documents: Vec<ContentPart>,
    instruction: String,
}

impl RequestBundle {
    pub async fn new(capture: &CaptureArtifact, instruction: String) -> Result<Self> {
        let data = capture.read().await?;
        Ok(Self {
            capture: ContentPart::Inline {
                mime_type: capture.mime_type().to_string(),
                data,
            },
            documents: Vec::new(),
            instruction,
        })
    }

    pub fn add_document(&mut self, document: Document) {
        self.documents.push(ContentPart::Inline {
            mime_type: document.mime_type,
            data: document.bytes,
        });
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Parts in the order the model sees them.
    pub fn parts(&self) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(self.documents.len() + 2);
        parts.push(self.capture.clone());
        parts.extend(self.documents.iter().cloned());
        parts.push(ContentPart::Text(self.instruction.clone()));
        parts
    }
}

/// What came back from a completed model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayReply {
    /// `None` when the model produced no text, e.g. because it was blocked.
    pub text: Option<String>,
    pub total_tokens: u64,
    pub block_reason: Option<String>,
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(
        &self,
        credential: &Credential,
        model: &str,
        parts: &[ContentPart],
    ) -> Result<GatewayReply>;

    /// Names of models that can answer `generate` calls.
    async fn list_models(&self, credential: &Credential) -> Result<Vec<String>>;
}
