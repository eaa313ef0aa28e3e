//! Result types produced by a classification run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-tier confidence label the model attaches to each extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    /// Also used whenever the model gave no (or an unrecognised) label.
    #[default]
    Low,
}

impl Confidence {
    /// Lenient parse: case-insensitive, anything unrecognised is `Low`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token counts reported by the model for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Outcome of classifying one document.
///
/// Created once per processed document and never modified afterwards.
/// On failure all extracted fields hold their defaults, `is_verified` is
/// `false` and `error` carries a multi-line diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub filename: String,
    pub form_number: String,
    pub form_title: String,
    pub page_count: u32,
    /// Confidence of the form number, the headline confidence of the result.
    pub confidence: Confidence,
    #[serde(default)]
    pub title_confidence: Confidence,
    #[serde(default)]
    pub pages_confidence: Confidence,
    pub is_verified: bool,
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// The model's parsed JSON answer, as returned. `{}` on failure.
    #[serde(default = "empty_object")]
    pub llm_response: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl ClassificationResult {
    /// A result for a document that could not be classified.
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            form_number: String::new(),
            form_title: String::new(),
            page_count: 0,
            confidence: Confidence::Low,
            title_confidence: Confidence::Low,
            pages_confidence: Confidence::Low,
            is_verified: false,
            token_usage: TokenUsage::default(),
            llm_response: empty_object(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate counts for a set of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub verified: usize,
    /// Classified without error but not verified.
    pub failed: usize,
    pub errors: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl RunSummary {
    pub fn from_results(results: &[ClassificationResult]) -> Self {
        let total = results.len();
        let verified = results.iter().filter(|r| r.is_verified).count();
        let errors = results.iter().filter(|r| r.is_error()).count();
        Self {
            total,
            verified,
            failed: total.saturating_sub(verified + errors),
            errors,
            input_tokens: results.iter().map(|r| r.token_usage.input_tokens).sum(),
            output_tokens: results.iter().map(|r| r.token_usage.output_tokens).sum(),
            total_tokens: results.iter().map(|r| r.token_usage.total_tokens).sum(),
        }
    }
}
