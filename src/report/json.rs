//! Per-run results file.

use crate::error::ClassifierError;
use crate::output::ClassificationResult;
use crate::report::write_atomic;
use std::path::Path;
use tracing::info;

/// Write `results` as a pretty-printed JSON array, replacing any previous
/// file. Non-ASCII text is written as-is.
pub fn save_results(
    results: &[ClassificationResult],
    path: impl AsRef<Path>,
) -> Result<(), ClassifierError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| ClassifierError::Internal(format!("Failed to serialise results: {e}")))?;
    write_atomic(path, json.as_bytes())?;
    info!("Results saved to {}", path.display());
    Ok(())
}

/// Read a results file written by [`save_results`].
pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<ClassificationResult>, ClassifierError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ClassifierError::ResultsReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ClassifierError::ResultsReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Confidence, TokenUsage};
    use tempfile::TempDir;

    fn hebrew_result() -> ClassificationResult {
        ClassificationResult {
            filename: "טופס.pdf".into(),
            form_number: "1234".into(),
            form_title: "בקשה לקצבה".into(),
            page_count: 3,
            confidence: Confidence::High,
            title_confidence: Confidence::High,
            pages_confidence: Confidence::Medium,
            is_verified: true,
            token_usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 2,
                total_tokens: 12,
            },
            llm_response: serde_json::json!({"form_classification": {}}),
            error: None,
        }
    }

    #[test]
    fn written_file_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let results = vec![hebrew_result(), ClassificationResult::failed("bad.pdf", "  Error Type: Unparseable")];

        save_results(&results, &path).unwrap();

        assert_eq!(load_results(&path).unwrap(), results);
    }

    #[test]
    fn hebrew_is_not_escaped_and_indent_is_two_spaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        save_results(&[hebrew_result()], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("בקשה לקצבה"));
        assert!(!text.contains("\\u05"));
        assert!(text.starts_with("[\n  {\n    \"filename\""));
    }

    #[test]
    fn previous_contents_are_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "this is not json at all").unwrap();

        save_results(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn load_missing_or_invalid_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_results(dir.path().join("none.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{").unwrap();
        assert!(matches!(
            load_results(&bad),
            Err(ClassifierError::ResultsReadFailed { .. })
        ));
    }
}
