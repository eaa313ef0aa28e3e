//! Failure diagnostics for a single document.
//!
//! A [`Diagnostic`] collects everything known at the moment a document
//! failed and renders it once, one fact per line. The rendered text is what
//! ends up in [`crate::output::ClassificationResult::error`].

use crate::error::DocumentError;
use crate::pipeline::oracle::{CandidateInfo, OracleResponse, SAFETY_CATEGORIES, SAFETY_THRESHOLD};
use std::fmt;
use std::path::{Path, PathBuf};

/// Everything worth reporting about one failed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: DocumentError,
    pub block_reason: Option<String>,
    pub candidates: Vec<CandidateInfo>,
    pub model: String,
    pub generation: String,
    pub file: PathBuf,
    /// Model-side name of the uploaded document, if the upload got that far.
    pub uploaded_as: Option<String>,
}

impl Diagnostic {
    pub fn new(error: DocumentError, file: &Path, model: &str) -> Self {
        Self {
            error,
            block_reason: None,
            candidates: Vec::new(),
            model: model.to_string(),
            generation: String::new(),
            file: file.to_path_buf(),
            uploaded_as: None,
        }
    }

    /// Attach the response metadata, if a response was received.
    pub fn with_response(mut self, response: Option<&OracleResponse>) -> Self {
        if let Some(r) = response {
            self.block_reason = r.block_reason.clone();
            self.candidates = r.candidates.clone();
        }
        self
    }

    pub fn with_generation(mut self, summary: impl Into<String>) -> Self {
        self.generation = summary.into();
        self
    }

    pub fn with_upload(mut self, name: Option<&str>) -> Self {
        self.uploaded_as = name.map(str::to_string);
        self
    }

    fn any_safety_stop(&self) -> bool {
        self.candidates.iter().any(CandidateInfo::stopped_for_safety)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Error Type: {}", self.error.kind())?;
        writeln!(f, "  Error Message: {}", self.error)?;

        if let Some(reason) = &self.block_reason {
            writeln!(f, "  Block Reason: {reason}")?;
        }

        for (i, c) in self.candidates.iter().enumerate() {
            writeln!(
                f,
                "  Candidate {}: finish_reason={}",
                i,
                c.finish_reason.as_deref().unwrap_or("unknown")
            )?;
            if c.stopped_for_safety() {
                writeln!(f, "    SAFETY FILTER TRIGGERED (personal data in the form is the usual cause)")?;
                writeln!(f, "    All configurable filters are already at {SAFETY_THRESHOLD}; a remaining block comes from non-configurable API policy")?;
            }
            if let Some(msg) = &c.finish_message {
                writeln!(f, "    Finish Message: {msg}")?;
            }
            if !c.safety_ratings.is_empty() {
                let ratings: Vec<String> = c
                    .safety_ratings
                    .iter()
                    .map(|r| {
                        let blocked = if r.blocked { " (blocked)" } else { "" };
                        format!("{}={}{}", r.category, r.probability, blocked)
                    })
                    .collect();
                writeln!(f, "    Safety Ratings: {}", ratings.join(", "))?;
            }
        }

        if self.any_safety_stop() || self.block_reason.is_some() {
            writeln!(
                f,
                "  Safety Settings Used: {} at {}",
                SAFETY_CATEGORIES.join(", "),
                SAFETY_THRESHOLD
            )?;
        }

        writeln!(f, "  Model Used: {}", self.model)?;
        if !self.generation.is_empty() {
            writeln!(f, "  Generation Config: {}", self.generation)?;
        }
        writeln!(f, "  File: {}", self.file.display())?;
        write!(
            f,
            "  Uploaded File: {}",
            self.uploaded_as.as_deref().unwrap_or("None")
        )
    }
}
