//! Classify one document: pre-flight, upload, ask, release, verify.
//!
//! [`classify_document`] never returns an error. Every failure becomes a
//! [`ClassificationResult`] with default fields, `is_verified = false` and
//! the rendered [`Diagnostic`] in `error`, so one bad form cannot stop a
//! batch.

use crate::config::ClassifierConfig;
use crate::error::DocumentError;
use crate::forms::FormTable;
use crate::output::{ClassificationResult, TokenUsage};
use crate::pipeline::diagnostics::Diagnostic;
use crate::pipeline::input::validate_document;
use crate::pipeline::oracle::{DocumentHandle, Oracle, OracleResponse};
use crate::pipeline::response::{parse_json, FormResponse};
use crate::prompts::PromptPair;
use crate::verify::Verifier;
use std::path::Path;
use tracing::{debug, error, warn};

/// A parsed answer and what it cost.
struct Answer {
    value: serde_json::Value,
    usage: TokenUsage,
}

/// Why asking failed, with the response when one arrived.
struct Failure {
    error: DocumentError,
    response: Option<OracleResponse>,
}

impl From<DocumentError> for Failure {
    fn from(error: DocumentError) -> Self {
        Self {
            error,
            response: None,
        }
    }
}

/// Classify the document at `path` and verify it against `forms`.
pub async fn classify_document(
    oracle: &dyn Oracle,
    path: &Path,
    filename: &str,
    forms: &FormTable,
    config: &ClassifierConfig,
) -> ClassificationResult {
    let diagnostic = |error: DocumentError| {
        Diagnostic::new(error, path, oracle.model()).with_generation(oracle.generation_summary())
    };

    if let Err(e) = validate_document(path) {
        return failed(filename, diagnostic(e));
    }

    let handle = match oracle.upload(path).await {
        Ok(h) => h,
        Err(e) => return failed(filename, diagnostic(e)),
    };

    let outcome = ask(oracle, config.prompts(), &handle).await;
    release(oracle, &handle, filename).await;

    match outcome {
        Ok(answer) => {
            let fields = FormResponse::from_value(&answer.value);
            let verification = Verifier::new(forms)
                .with_threshold(config.fuzzy_threshold)
                .explain(&fields.form_number, &fields.form_title, fields.page_count);
            debug!("{}: {:?}", filename, verification);

            ClassificationResult {
                filename: filename.to_string(),
                form_number: fields.form_number,
                form_title: fields.form_title,
                page_count: fields.page_count,
                confidence: fields.confidence,
                title_confidence: fields.title_confidence,
                pages_confidence: fields.pages_confidence,
                is_verified: verification.is_verified(),
                token_usage: answer.usage,
                llm_response: answer.value,
                error: None,
            }
        }
        Err(failure) => failed(
            filename,
            diagnostic(failure.error)
                .with_response(failure.response.as_ref())
                .with_upload(Some(&handle.name)),
        ),
    }
}

async fn ask(
    oracle: &dyn Oracle,
    prompts: PromptPair<'_>,
    handle: &DocumentHandle,
) -> Result<Answer, Failure> {
    let response = oracle.generate(prompts, handle).await?;

    let Some(text) = response.text.as_deref() else {
        let error = match &response.block_reason {
            Some(reason) => DocumentError::Blocked {
                reason: reason.clone(),
            },
            None => DocumentError::EmptyResponse {
                finish_reason: response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
            },
        };
        return Err(Failure {
            error,
            response: Some(response),
        });
    };

    match parse_json(text) {
        Ok(value) => Ok(Answer {
            value,
            usage: response.usage,
        }),
        Err(error) => Err(Failure {
            error,
            response: Some(response),
        }),
    }
}

async fn release(oracle: &dyn Oracle, handle: &DocumentHandle, filename: &str) {
    match oracle.release(handle).await {
        Ok(()) => debug!("Released {} for {}", handle.name, filename),
        Err(e) => warn!("Could not release {} for {}: {}", handle.name, filename, e),
    }
}

fn failed(filename: &str, diagnostic: Diagnostic) -> ClassificationResult {
    let report = diagnostic.to_string();
    error!("Classification failed for {}:\n{}", filename, report);
    ClassificationResult::failed(filename, report)
}
