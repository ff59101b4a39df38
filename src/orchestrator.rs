//! Turns one hotkey press into one model request and one tray update.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::ai::prompt::PromptLibrary;
use crate::ai::{ModelGateway, RequestBundle};
use crate::capture::{CaptureArtifact, CaptureProvider};
use crate::credentials::{Credential, CredentialStore};
use crate::display::{truncate_for_display, StatusColor, StatusDisplay};
use crate::documents::DocumentFetcher;
use crate::error::{Error, Result};
use crate::state::Trigger;
use crate::usage::{UsageLedger, UsageSnapshot};

pub type CredentialHandle = Arc<Mutex<CredentialStore>>;
pub type LedgerHandle = Arc<Mutex<UsageLedger>>;

#[derive(Debug, Clone, Copy)]
pub struct ResponseLimits {
    /// Longer answers are accepted but logged.
    pub soft_limit: usize,
    /// Longer answers are cut on the tray.
    pub display_limit: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            soft_limit: 128,
            display_limit: 256,
        }
    }
}

/// Result of one question.
#[derive(Debug)]
pub enum Outcome {
    Answered {
        text: String,
        tokens: u64,
        usage: UsageSnapshot,
    },
    Failed(Error),
}

impl Outcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered { .. })
    }
}

pub struct Orchestrator {
    credentials: CredentialHandle,
    capture: Arc<dyn CaptureProvider>,
    documents: Arc<dyn DocumentFetcher>,
    gateway: Arc<dyn ModelGateway>,
    display: Arc<dyn StatusDisplay>,
    ledger: LedgerHandle,
    prompts: PromptLibrary,
    limits: ResponseLimits,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: CredentialHandle,
        capture: Arc<dyn CaptureProvider>,
        documents: Arc<dyn DocumentFetcher>,
        gateway: Arc<dyn ModelGateway>,
        display: Arc<dyn StatusDisplay>,
        ledger: LedgerHandle,
        prompts: PromptLibrary,
        limits: ResponseLimits,
    ) -> Self {
        Self {
            credentials,
            capture,
            documents,
            gateway,
            display,
            ledger,
            prompts,
            limits,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    /// Run one question end to end. Never retries; every failure ends up in
    /// the log and as the error token on the tray.
    pub async fn handle(&self, trigger: &Trigger) -> Outcome {
        // Reserve the key before anything can use it.
        let credential = self.credentials.lock().rotate();

        let capture = match self.capture.capture().await {
            Ok(capture) => capture,
            Err(e) => return self.fail(e),
        };

        self.display.show_loading();
        let result = self.ask(&credential, &capture, trigger).await;
        capture.discard().await;

        match result {
            Ok((text, tokens)) => self.succeed(text, tokens),
            Err(e) => self.fail(e),
        }
    }

    async fn ask(
        &self,
        credential: &Credential,
        capture: &CaptureArtifact,
        trigger: &Trigger,
    ) -> Result<(String, u64)> {
        log::info!("Preparing content for Gemini...");

        let mut documents = Vec::new();
        for source in &trigger.documents {
            match self.documents.fetch(source).await {
                Ok(document) => documents.push(document),
                Err(e) => log::warn!("Skipping reference document {}: {}", source, e),
            }
        }
        if trigger.documents.is_empty() {
            log::info!("No reference documents configured.");
        } else if documents.is_empty() {
            log::warn!("No usable PDF files were loaded from the provided sources.");
        }

        let instruction = self.prompts.resolve(&trigger.prompt_name).await?;

        let mut bundle = RequestBundle::new(capture, instruction).await?;
        for document in documents {
            bundle.add_document(document);
        }
        log::info!(
            "Sending screenshot with {} reference document(s).",
            bundle.document_count()
        );

        let reply = self
            .gateway
            .generate(credential, &trigger.model, &bundle.parts())
            .await?;

        match reply.text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok((text, reply.total_tokens)),
            _ => Err(Error::GatewayEmptyResponse {
                block_reason: reply.block_reason,
            }),
        }
    }

    fn succeed(&self, text: String, tokens: u64) -> Outcome {
        let length = text.chars().count();
        if length > self.limits.soft_limit {
            log::warn!(
                "API response length ({}) exceeded the requested {} characters.",
                length,
                self.limits.soft_limit
            );
        }

        log::info!("Response from Gemini: {}", text);
        self.display.show_text(
            &truncate_for_display(&text, self.limits.display_limit),
            StatusColor::Black,
        );

        log::info!("Used {} tokens for this query.", tokens);
        let usage = self.ledger.lock().record(tokens);

        Outcome::Answered {
            text,
            tokens,
            usage,
        }
    }

    fn fail(&self, error: Error) -> Outcome {
        match &error {
            Error::GatewayAuth(_) => log::error!("INVALID API KEY: {}", error),
            Error::GatewayRateLimit(_) => {
                log::error!("{}. Please try again later.", error);
                log::info!(
                    "If this persists, consider trying a different model or checking your API usage."
                );
            }
            Error::GatewayEmptyResponse { .. } => {
                log::warn!("{}", error);
                log::error!("Failed to get a valid response from the API.");
            }
            e if e.is_gateway() => log::error!("{}", error),
            _ => log::error!("Question aborted: {}", error),
        }
        self.display.show_error();
        Outcome::Failed(error)
    }
}

/// Serializes questions: one runs, at most one waits, the rest are dropped.
pub struct TriggerGate {
    slots: Semaphore,
    running: tokio::sync::Mutex<()>,
}

const GATE_SLOTS: usize = 2;

impl TriggerGate {
    pub fn new() -> Self {
        Self {
            slots: Semaphore::new(GATE_SLOTS),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of questions running or waiting.
    pub fn occupied(&self) -> usize {
        GATE_SLOTS - self.slots.available_permits()
    }

    /// Run `job` once the previous one is done. `None` if the queue was full
    /// and `job` was never started.
    pub async fn run<F, T>(&self, job: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let Ok(_slot) = self.slots.try_acquire() else {
            log::warn!("A question is already running and another is queued; ignoring hotkey.");
            return None;
        };
        let _running = self.running.lock().await;
        Some(job.await)
    }
}

impl Default for TriggerGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn gate_queues_one_and_drops_the_rest() {
        let gate = Arc::new(TriggerGate::new());
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.run(async move {
                    release_rx.await.ok();
                    1
                })
                .await
            }
        });
        while gate.occupied() < 1 {
            tokio::task::yield_now().await;
        }

        let second = tokio::spawn({
            let gate = gate.clone();
            async move { gate.run(async { 2 }).await }
        });
        while gate.occupied() < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(gate.run(async { 3 }).await, None);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Some(1));
        assert_eq!(second.await.unwrap(), Some(2));
        assert_eq!(gate.occupied(), 0);
    }
}
