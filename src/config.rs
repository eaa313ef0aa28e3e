//! Configuration for a classification run.
//!
//! Every run knob lives in [`ClassifierConfig`], built via
//! [`ClassifierConfigBuilder`]. Setters clamp out-of-range values; `build()`
//! rejects the ones that cannot be clamped sensibly.

use crate::error::ClassifierError;
use crate::progress::ProgressCallback;
use crate::prompts::{PromptPair, SYSTEM_PROMPT, USER_PROMPT};
use crate::verify::DEFAULT_FUZZY_THRESHOLD;
use std::fmt;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for classifying a batch of forms.
///
/// # Example
/// ```rust
/// use form_classifier::ClassifierConfig;
///
/// let config = ClassifierConfig::builder()
///     .model("gemini-2.5-flash")
///     .fuzzy_threshold(90.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.fuzzy_threshold, 90.0);
/// ```
#[derive(Clone)]
pub struct ClassifierConfig {
    /// Gemini model identifier. Default: `gemini-2.5-flash-lite`.
    pub model: String,

    /// API key. If `None`, [`API_KEY_ENV`] is read when the oracle is built.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API.
    pub api_base_url: String,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Nucleus sampling mass. Default: 0.95.
    pub top_p: f32,

    /// Top-k sampling. Default: 10.
    pub top_k: u32,

    /// Maximum tokens the model may generate per document. Default: 1500.
    ///
    /// The answer is a small fixed-shape JSON object; 1500 leaves room for
    /// the free-text reasoning fields.
    pub max_output_tokens: u32,

    /// Minimum partial-ratio score (0–100) for a fuzzy title match. Default: 85.
    pub fuzzy_threshold: f64,

    /// File extension of the documents to classify, without the dot. Default: `pdf`.
    pub document_extension: String,

    /// Custom system prompt. If None, uses [`SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Custom user prompt. If None, uses [`USER_PROMPT`].
    pub user_prompt: Option<String>,

    /// HTTP timeout per oracle request in seconds. Default: 300.
    pub api_timeout_secs: u64,

    /// How many times to re-check an uploaded file that is still being
    /// processed before giving up. Default: 10.
    pub upload_poll_attempts: u32,

    /// Delay between those checks in milliseconds. Default: 1000.
    pub upload_poll_interval_ms: u64,

    /// Per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            temperature: 0.1,
            top_p: 0.95,
            top_k: 10,
            max_output_tokens: 1500,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            document_extension: "pdf".to_string(),
            system_prompt: None,
            user_prompt: None,
            api_timeout_secs: 300,
            upload_poll_attempts: 10,
            upload_poll_interval_ms: 1000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .field("document_extension", &self.document_extension)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ClassificationProgressCallback>"),
            )
            .finish()
    }
}

impl ClassifierConfig {
    /// Create a new builder for `ClassifierConfig`.
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt pair in effect, overrides applied.
    pub fn prompts(&self) -> PromptPair<'_> {
        PromptPair {
            system: self.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT),
            user: self.user_prompt.as_deref().unwrap_or(USER_PROMPT),
        }
    }

    /// The configured API key, or [`API_KEY_ENV`] from the environment.
    pub fn resolve_api_key(&self) -> Result<String, ClassifierError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ClassifierError::MissingApiKey {
                env_var: API_KEY_ENV.to_string(),
            }),
        }
    }
}

/// Builder for [`ClassifierConfig`].
#[derive(Debug)]
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.top_k = k.max(1);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.config.fuzzy_threshold = threshold;
        self
    }

    pub fn document_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.document_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn upload_poll_attempts(mut self, n: u32) -> Self {
        self.config.upload_poll_attempts = n;
        self
    }

    pub fn upload_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.upload_poll_interval_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClassifierConfig, ClassifierError> {
        let c = &self.config;
        if !(0.0..=100.0).contains(&c.fuzzy_threshold) || c.fuzzy_threshold.is_nan() {
            return Err(ClassifierError::InvalidConfig(format!(
                "Fuzzy threshold must be 0–100, got {}",
                c.fuzzy_threshold
            )));
        }
        if c.document_extension.is_empty() {
            return Err(ClassifierError::InvalidConfig(
                "Document extension must not be empty".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ClassifierError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_output_tokens == 0 {
            return Err(ClassifierError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
