use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ContentPart, GatewayReply, ModelGateway};
use crate::config::DEFAULT_API_BASE;
use crate::credentials::Credential;
use crate::error::{Error, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    InlineData(InlineData),
    Text(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Client for the Gemini `generativelanguage` REST API.
pub struct GeminiGateway {
    client: Client,
    api_base: String,
}

impl GeminiGateway {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/{}:generateContent", self.api_base, model_path(model))
    }
}

impl Default for GeminiGateway {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(
        &self,
        credential: &Credential,
        model: &str,
        parts: &[ContentPart],
    ) -> Result<GatewayReply> {
        log::info!("Calling Gemini API ({})...", model);

        let request = build_request(parts);

        let response = self
            .client
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("Failed to parse Gemini response: {}", e)))?;

        Ok(interpret(body))
    }

    async fn list_models(&self, credential: &Credential) -> Result<Vec<String>> {
        log::info!("Fetching available models...");

        let url = format!("{}/v1beta/models", self.api_base);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, credential.expose())
                .query(&[("pageSize", "1000")]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Gateway(format!("Model list request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status, &body));
            }

            let page: ModelList = response
                .json()
                .await
                .map_err(|e| Error::Gateway(format!("Failed to parse model list: {}", e)))?;

            names.extend(generate_capable(page.models));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        log::info!("Fetched {} available models.", names.len());
        Ok(names)
    }
}

/// `gemini-2.5-flash` and `models/gemini-2.5-flash` name the same model.
fn model_path(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn build_request(parts: &[ContentPart]) -> GenerateRequest {
    let parts = parts
        .iter()
        .map(|part| match part {
            ContentPart::Inline { mime_type, data } => GeminiPart::InlineData(InlineData {
                mime_type: mime_type.clone(),
                data: STANDARD.encode(data),
            }),
            ContentPart::Text(text) => GeminiPart::Text(text.clone()),
        })
        .collect();

    GenerateRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts,
        }],
    }
}

fn interpret(body: GenerateResponse) -> GatewayReply {
    let total_tokens = body
        .usage_metadata
        .map(|u| u.total_token_count)
        .unwrap_or(0);

    let text: String = body
        .candidates
        .iter()
        .take(1)
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect();

    let mut block_reason = None;
    if let Some(feedback) = body.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            block_reason = Some(match feedback.block_reason_message {
                Some(message) => format!("{reason}: {message}"),
                None => reason,
            });
        }
    }
    if block_reason.is_none() && text.trim().is_empty() {
        block_reason = body
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .filter(|r| r != "STOP");
    }

    GatewayReply {
        text: if text.trim().is_empty() { None } else { Some(text) },
        total_tokens,
        block_reason,
    }
}

/// Map a non-success response onto the error kinds the pipeline reports.
fn classify_failure(status: StatusCode, body: &str) -> Error {
    let detail = error_message(body).unwrap_or_else(|| format!("HTTP {}", status));

    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        Error::GatewayRateLimit(detail)
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
    {
        Error::GatewayAuth(detail)
    } else {
        Error::Gateway(format!("Gemini API error ({}): {}", status, detail))
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn generate_capable(models: Vec<ModelInfo>) -> impl Iterator<Item = String> {
    models.into_iter().filter_map(|m| {
        m.supported_generation_methods
            .iter()
            .any(|method| method == "generateContent")
            .then_some(m.name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_keeps_part_order_and_encodes_inline_data() {
        let parts = vec![
            ContentPart::Inline {
                mime_type: "image/png".to_string(),
                data: b"png".to_vec(),
            },
            ContentPart::Text("What is shown?".to_string()),
        ];
        let json = serde_json::to_value(build_request(&parts)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "cG5n" } },
                        { "text": "What is shown?" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn model_names_get_models_prefix() {
        assert_eq!(model_path("gemini-2.5-flash"), "models/gemini-2.5-flash");
        assert_eq!(model_path("models/gemini-2.5-flash"), "models/gemini-2.5-flash");
        let gateway = GeminiGateway::new("https://example.test/");
        assert_eq!(
            gateway.generate_url("gemini-pro"),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn text_and_usage_are_extracted() {
        let reply = interpret(parse(
            r#"{
                "candidates": [{
                    "content": { "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "B) " },
                        { "text": "Paris" }
                    ]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 1200, "totalTokenCount": 1250 }
            }"#,
        ));

        assert_eq!(reply.text.as_deref(), Some("B) Paris"));
        assert_eq!(reply.total_tokens, 1250);
        assert_eq!(reply.block_reason, None);
    }

    #[test]
    fn blocked_prompt_has_no_text_and_a_reason() {
        let reply = interpret(parse(
            r#"{
                "promptFeedback": { "blockReason": "SAFETY", "blockReasonMessage": "unsafe" },
                "usageMetadata": { "totalTokenCount": 300 }
            }"#,
        ));

        assert_eq!(reply.text, None);
        assert_eq!(reply.block_reason.as_deref(), Some("SAFETY: unsafe"));
        assert_eq!(reply.total_tokens, 300);
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let reply = interpret(parse(
            r#"{ "candidates": [{ "content": { "parts": [] }, "finishReason": "RECITATION" }] }"#,
        ));
        assert_eq!(reply.text, None);
        assert_eq!(reply.block_reason.as_deref(), Some("RECITATION"));
    }

    #[test]
    fn failures_are_classified() {
        let quota = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, quota),
            Error::GatewayRateLimit(m) if m == "Quota exceeded"
        ));

        let bad_key = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT",
            "details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, bad_key),
            Error::GatewayAuth(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, ""),
            Error::GatewayAuth(_)
        ));

        assert!(matches!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            Error::Gateway(m) if m.contains("500")
        ));
    }

    #[test]
    fn only_generate_capable_models_are_listed() {
        let page: ModelList = serde_json::from_str(
            r#"{ "models": [
                { "name": "models/gemini-2.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                { "name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"] }
            ]}"#,
        )
        .unwrap();

        let names: Vec<String> = generate_capable(page.models).collect();
        assert_eq!(names, vec!["models/gemini-2.5-flash".to_string()]);
    }
}
