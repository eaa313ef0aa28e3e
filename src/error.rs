//! Error types for the form-classifier library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ClassifierError`] is **fatal**: the run cannot proceed at all
//!   (form table missing, input folder missing, no API key). Returned as
//!   `Err(ClassifierError)` before any document is sent to the model.
//!
//! * [`DocumentError`] is **non-fatal**: a single document failed (upload
//!   rejected, generation error, unparseable answer) but the rest of the
//!   batch is fine. Captured into
//!   [`crate::output::ClassificationResult::error`] so every input document
//!   still yields exactly one result.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the form-classifier library.
///
/// Document-level failures use [`DocumentError`] and are recorded in the
/// document's result rather than propagated here.
#[derive(Debug, Error)]
pub enum ClassifierError {
    // ── Form table errors ─────────────────────────────────────────────────
    /// The expected-values file does not exist.
    #[error("Form config file not found: '{path}'\nCheck the path exists and is readable.")]
    ConfigNotFound { path: PathBuf },

    /// The expected-values file exists but could not be read.
    #[error("Failed to read form config '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expected-values file is not a JSON array of form entries.
    #[error("Invalid form config '{path}': {detail}\nExpected: [{{\"form_number\", \"expected_title_1\", \"expected_title_2\", \"expected_pages\"}}, ...]")]
    InvalidFormConfig { path: PathBuf, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The input folder does not exist.
    #[error("Input folder '{path}' does not exist")]
    FolderNotFound { path: PathBuf },

    /// The input path exists but is a file.
    #[error("Input path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Listing the input folder failed.
    #[error("Failed to list input folder '{path}': {source}")]
    FolderReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Oracle setup errors ───────────────────────────────────────────────
    /// No API key was supplied by flag, builder, or environment.
    #[error("No API key provided.\nPass --api-key or set the {env_var} environment variable.")]
    MissingApiKey { env_var: String },

    /// The HTTP client for the model API could not be constructed.
    #[error("Failed to initialise the model client: {0}")]
    ClientInit(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Report errors ─────────────────────────────────────────────────────
    /// A results file could not be read back.
    #[error("Failed to read results file '{path}': {detail}")]
    ResultsReadFailed { path: PathBuf, detail: String },

    /// Could not create or write a report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored (rendered through [`crate::pipeline::diagnostics::Diagnostic`])
/// in the document's [`crate::output::ClassificationResult`]. The batch
/// always continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The document could not be read from disk.
    #[error("could not read document: {detail}")]
    ReadFailed { detail: String },

    /// The document does not start with the `%PDF` magic bytes.
    #[error("not a PDF file (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The oracle rejected or failed the document upload.
    #[error("upload failed: {detail}")]
    UploadFailed { detail: String },

    /// The generation request failed at the transport or API level.
    #[error("generation failed{}: {detail}", http_status(.status))]
    GenerationFailed { status: Option<u16>, detail: String },

    /// The prompt was blocked before any candidate was produced.
    #[error("prompt blocked by the model: {reason}")]
    Blocked { reason: String },

    /// The model answered without any candidate text.
    #[error("model returned no text (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },

    /// The answer could not be parsed as JSON, even after recovery.
    #[error("could not parse JSON from response: {preview}...")]
    Unparseable { preview: String },
}

fn http_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl DocumentError {
    /// Short, stable name of the failure kind, used as the first
    /// diagnostic line.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentError::ReadFailed { .. } => "ReadFailed",
            DocumentError::NotAPdf { .. } => "NotAPdf",
            DocumentError::UploadFailed { .. } => "UploadFailed",
            DocumentError::GenerationFailed { .. } => "GenerationFailed",
            DocumentError::Blocked { .. } => "Blocked",
            DocumentError::EmptyResponse { .. } => "EmptyResponse",
            DocumentError::Unparseable { .. } => "Unparseable",
        }
    }
}
