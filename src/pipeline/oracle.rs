//! The model boundary: upload a document, ask about it, release it.
//!
//! [`Oracle`] is the seam the rest of the pipeline depends on; tests plug in
//! scripted implementations. [`GeminiOracle`] talks to the Gemini REST API
//! with `reqwest`:
//!
//! ```text
//! upload   POST   /upload/v1beta/files            (resumable: start, then upload+finalize)
//!          GET    /v1beta/files/{id}              (until state = ACTIVE)
//! generate POST   /v1beta/models/{model}:generateContent
//! release  DELETE /v1beta/files/{id}
//! ```

use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, DocumentError};
use crate::output::TokenUsage;
use crate::prompts::PromptPair;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Safety categories sent with every request, all at `BLOCK_NONE`.
///
/// Forms carry names, ID numbers and addresses; with default thresholds
/// the model refuses a noticeable share of them.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Threshold applied to every category in [`SAFETY_CATEGORIES`].
pub const SAFETY_THRESHOLD: &str = "BLOCK_NONE";

const PDF_MIME: &str = "application/pdf";

/// A document stored on the model side, valid until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// One safety rating attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub probability: String,
    #[serde(default)]
    pub blocked: bool,
}

/// Per-candidate metadata kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateInfo {
    pub finish_reason: Option<String>,
    pub finish_message: Option<String>,
    pub safety_ratings: Vec<SafetyRating>,
}

impl CandidateInfo {
    pub fn stopped_for_safety(&self) -> bool {
        self.finish_reason.as_deref() == Some("SAFETY")
    }
}

/// What the model sent back for one generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleResponse {
    /// Text of the first candidate, `None` when there was none.
    pub text: Option<String>,
    pub usage: TokenUsage,
    /// Set when the prompt itself was blocked.
    pub block_reason: Option<String>,
    pub candidates: Vec<CandidateInfo>,
}

/// A multimodal model that can classify an uploaded document.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Model identifier, for logs and diagnostics.
    fn model(&self) -> &str;

    /// One-line description of the sampling settings, for diagnostics.
    fn generation_summary(&self) -> String {
        String::new()
    }

    /// Store the document remotely. On `Err` nothing may be left stored:
    /// the caller only releases documents it holds a handle for.
    async fn upload(&self, path: &Path) -> Result<DocumentHandle, DocumentError>;

    async fn generate(
        &self,
        prompts: PromptPair<'_>,
        handle: &DocumentHandle,
    ) -> Result<OracleResponse, DocumentError>;

    /// Delete the uploaded document. Errors are reported, never fatal.
    async fn release(&self, handle: &DocumentHandle) -> Result<(), DocumentError>;
}

// ── Gemini wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    candidate_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    finish_message: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl FileResource {
    fn into_handle(self) -> DocumentHandle {
        DocumentHandle {
            name: self.name,
            uri: self.uri,
            mime_type: self.mime_type.unwrap_or_else(|| PDF_MIME.to_string()),
        }
    }
}

impl From<GenerateResponse> for OracleResponse {
    fn from(r: GenerateResponse) -> Self {
        let text = r
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        let usage = r
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        OracleResponse {
            text,
            usage,
            block_reason: r.prompt_feedback.and_then(|f| f.block_reason),
            candidates: r
                .candidates
                .into_iter()
                .map(|c| CandidateInfo {
                    finish_reason: c.finish_reason,
                    finish_message: c.finish_message,
                    safety_ratings: c.safety_ratings,
                })
                .collect(),
        }
    }
}

/// Pull `error.message` out of a Gemini error body, or fall back to the
/// first 300 characters of the body.
fn api_error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(300).collect())
}

// ── Gemini client ────────────────────────────────────────────────────────

/// [`Oracle`] backed by the Gemini REST API.
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl std::fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiOracle")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiOracle {
    /// Build a client from the run configuration. The API key comes from
    /// the config or, failing that, the environment.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ClassifierError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                candidate_count: 1,
            },
            poll_attempts: config.upload_poll_attempts,
            poll_interval: Duration::from_millis(config.upload_poll_interval_ms),
        })
    }

    fn upload_failed(detail: impl Into<String>) -> DocumentError {
        DocumentError::UploadFailed {
            detail: detail.into(),
        }
    }

    async fn get_file(&self, name: &str) -> Result<FileResource, DocumentError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Self::upload_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::upload_failed(format!(
                "HTTP {} while checking {}: {}",
                status.as_u16(),
                name,
                api_error_detail(&body)
            )));
        }
        response
            .json::<FileResource>()
            .await
            .map_err(|e| Self::upload_failed(format!("invalid file metadata: {e}")))
    }

    async fn delete_file(&self, name: &str) -> Result<(), DocumentError> {
        let response = self
            .client
            .delete(format!("{}/v1beta/{}", self.base_url, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Self::upload_failed(format!("delete {}: {}", name, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::upload_failed(format!(
                "delete {}: HTTP {}",
                name,
                status.as_u16()
            )));
        }
        Ok(())
    }

    /// Wait until an uploaded file leaves the `PROCESSING` state.
    async fn wait_until_active(&self, mut file: FileResource) -> Result<FileResource, DocumentError> {
        let mut attempts = 0;
        loop {
            match file.state.as_deref() {
                None | Some("ACTIVE") | Some("STATE_UNSPECIFIED") => return Ok(file),
                Some("FAILED") => {
                    return Err(Self::upload_failed(format!(
                        "model-side processing of {} failed",
                        file.name
                    )))
                }
                Some(state) => {
                    if attempts >= self.poll_attempts {
                        return Err(Self::upload_failed(format!(
                            "{} still {} after {} checks",
                            file.name, state, attempts
                        )));
                    }
                    attempts += 1;
                    debug!("{} is {}, re-checking ({}/{})", file.name, state, attempts, self.poll_attempts);
                    tokio::time::sleep(self.poll_interval).await;
                    file = self.get_file(&file.name).await?;
                }
            }
        }
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn model(&self) -> &str {
        &self.model
    }

    fn generation_summary(&self) -> String {
        format!(
            "temp={}, top_p={}, top_k={}",
            self.generation.temperature, self.generation.top_p, self.generation.top_k
        )
    }

    async fn upload(&self, path: &Path) -> Result<DocumentHandle, DocumentError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocumentError::ReadFailed {
                detail: format!("{}: {}", path.display(), e),
            })?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| Self::upload_failed(e.to_string()))?;

        let status = start.status();
        if !status.is_success() {
            let body = start.text().await.unwrap_or_default();
            return Err(Self::upload_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                api_error_detail(&body)
            )));
        }
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Self::upload_failed("no upload URL in response"))?;

        let finish = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Self::upload_failed(e.to_string()))?;

        let status = finish.status();
        if !status.is_success() {
            let body = finish.text().await.unwrap_or_default();
            return Err(Self::upload_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                api_error_detail(&body)
            )));
        }
        let uploaded = finish
            .json::<UploadResponse>()
            .await
            .map_err(|e| Self::upload_failed(format!("invalid upload response: {e}")))?;

        // The file is stored remotely from here on, so any failure must delete it.
        let name = uploaded.file.name.clone();
        let file = match self.wait_until_active(uploaded.file).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = self.delete_file(&name).await {
                    warn!("Could not delete {} after failed upload: {}", name, cleanup);
                }
                return Err(e);
            }
        };
        debug!("Uploaded {} as {}", path.display(), file.name);
        Ok(file.into_handle())
    }

    async fn generate(
        &self,
        prompts: PromptPair<'_>,
        handle: &DocumentHandle,
    ) -> Result<OracleResponse, DocumentError> {
        let request = build_request(prompts, handle, &self.generation);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocumentError::GenerationFailed {
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocumentError::GenerationFailed {
                status: Some(status.as_u16()),
                detail: api_error_detail(&body),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| DocumentError::GenerationFailed {
                    status: Some(status.as_u16()),
                    detail: format!("invalid response body: {e}"),
                })?;
        Ok(parsed.into())
    }

    async fn release(&self, handle: &DocumentHandle) -> Result<(), DocumentError> {
        self.delete_file(&handle.name).await
    }
}

fn build_request<'a>(
    prompts: PromptPair<'a>,
    handle: &'a DocumentHandle,
    generation: &GenerationConfig,
) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text {
                    text: prompts.system,
                },
                Part::File {
                    file_data: FileData {
                        mime_type: &handle.mime_type,
                        file_uri: &handle.uri,
                    },
                },
                Part::Text { text: prompts.user },
            ],
        }],
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: SAFETY_THRESHOLD,
            })
            .collect(),
        generation_config: generation.clone(),
    }
}
