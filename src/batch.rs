//! Batch entry point: classify every document in a folder.
//!
//! Documents are processed strictly one after another, each fully finished
//! (including releasing its upload) before the next starts. The batch
//! yields exactly one [`ClassificationResult`] per document found, in
//! file-name order.

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::forms::FormTable;
use crate::output::{ClassificationResult, RunSummary};
use crate::pipeline::classify::classify_document;
use crate::pipeline::input::list_documents;
use crate::pipeline::oracle::{GeminiOracle, Oracle};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Classifies folders of forms against one expected-values table.
pub struct FormClassifier {
    oracle: Arc<dyn Oracle>,
    forms: FormTable,
    config: ClassifierConfig,
}

impl FormClassifier {
    /// Use a specific oracle (tests plug in scripted ones here).
    pub fn new(oracle: Arc<dyn Oracle>, forms: FormTable, config: ClassifierConfig) -> Self {
        Self {
            oracle,
            forms,
            config,
        }
    }

    /// Build a Gemini-backed classifier.
    ///
    /// # Errors
    /// [`ClassifierError::MissingApiKey`] when neither the config nor
    /// `GEMINI_API_KEY` supplies a key.
    pub fn from_config(forms: FormTable, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let oracle = GeminiOracle::from_config(&config)?;
        info!("Using model {}", oracle.model());
        Ok(Self::new(Arc::new(oracle), forms, config))
    }

    pub fn forms(&self) -> &FormTable {
        &self.forms
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify every matching document in `folder`.
    ///
    /// # Errors
    /// Only for a missing or unreadable folder. Per-document failures are
    /// recorded in the corresponding result.
    pub async fn classify_folder(
        &self,
        folder: impl AsRef<Path>,
    ) -> Result<Vec<ClassificationResult>, ClassifierError> {
        let folder = folder.as_ref();
        let started = Instant::now();
        let documents = list_documents(folder, &self.config.document_extension)?;

        if documents.is_empty() {
            warn!(
                "No .{} files found in {}",
                self.config.document_extension,
                folder.display()
            );
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_batch_complete(0, 0);
            }
            return Ok(Vec::new());
        }

        let total = documents.len();
        info!("Found {} documents to process in {}", total, folder.display());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut results = Vec::with_capacity(total);
        for (i, doc) in documents.iter().enumerate() {
            let index = i + 1;
            info!("Processing {}/{}: {}", index, total, doc.filename);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_document_start(index, total, &doc.filename);
            }

            let result = classify_document(
                self.oracle.as_ref(),
                &doc.path,
                &doc.filename,
                &self.forms,
                &self.config,
            )
            .await;

            if let Some(ref cb) = self.config.progress_callback {
                match &result.error {
                    Some(diagnostic) => cb.on_document_error(index, total, &doc.filename, diagnostic),
                    None => cb.on_document_complete(index, total, &doc.filename, result.is_verified),
                }
            }
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            "Classified {} documents in {:.1}s: {} verified, {} not verified, {} errors",
            summary.total,
            started.elapsed().as_secs_f64(),
            summary.verified,
            summary.failed,
            summary.errors
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(summary.total, summary.verified);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use crate::forms::FormConfig;
    use crate::pipeline::oracle::{DocumentHandle, OracleResponse};
    use crate::progress::ClassificationProgressCallback;
    use crate::prompts::PromptPair;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers by looking up the uploaded file name; unknown names get garbage.
    struct ByNameOracle {
        answers: Vec<(&'static str, String)>,
        live_uploads: AtomicUsize,
        max_live_uploads: AtomicUsize,
    }

    #[async_trait]
    impl Oracle for ByNameOracle {
        fn model(&self) -> &str {
            "by-name"
        }

        async fn upload(&self, path: &Path) -> Result<DocumentHandle, DocumentError> {
            let live = self.live_uploads.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live_uploads.fetch_max(live, Ordering::SeqCst);
            Ok(DocumentHandle {
                name: path.file_name().unwrap().to_string_lossy().into_owned(),
                uri: String::new(),
                mime_type: "application/pdf".into(),
            })
        }

        async fn generate(
            &self,
            _prompts: PromptPair<'_>,
            handle: &DocumentHandle,
        ) -> Result<OracleResponse, DocumentError> {
            let text = self
                .answers
                .iter()
                .find(|(name, _)| *name == handle.name)
                .map(|(_, text)| text.clone())
                .unwrap_or_else(|| "not json".to_string());
            Ok(OracleResponse {
                text: Some(text),
                ..Default::default()
            })
        }

        async fn release(&self, _handle: &DocumentHandle) -> Result<(), DocumentError> {
            self.live_uploads.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ClassificationProgressCallback for Recorder {
        fn on_batch_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn on_document_complete(&self, index: usize, _total: usize, filename: &str, v: bool) {
            self.events.lock().unwrap().push(format!("ok {index} {filename} {v}"));
        }
        fn on_document_error(&self, index: usize, _total: usize, filename: &str, _d: &str) {
            self.events.lock().unwrap().push(format!("err {index} {filename}"));
        }
        fn on_batch_complete(&self, total: usize, verified: usize) {
            self.events.lock().unwrap().push(format!("done {total} {verified}"));
        }
    }

    fn answer(number: &str, title: &str, pages: u32) -> String {
        serde_json::json!({"form_classification": {
            "form_number": {"value": number},
            "form_title": {"value": title},
            "page_count": {"value": pages}
        }})
        .to_string()
    }

    fn forms() -> FormTable {
        FormTable::from_entries([FormConfig {
            form_number: "1234".into(),
            expected_title_1: "בקשה לקצבה".into(),
            expected_title_2: "טופס בקשה".into(),
            expected_pages: 3,
        }])
    }

    #[tokio::test]
    async fn one_result_per_document_in_name_order() {
        let dir = TempDir::new().unwrap();
        for name in ["c.pdf", "a.pdf", "b.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let oracle = Arc::new(ByNameOracle {
            answers: vec![
                ("a.pdf", answer("1234", "בקשה לקצבה", 3)),
                ("b.pdf", answer("1234", "בקשה לקצבה", 2)),
            ],
            live_uploads: AtomicUsize::new(0),
            max_live_uploads: AtomicUsize::new(0),
        });
        let recorder = Arc::new(Recorder::default());
        let config = ClassifierConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let classifier = FormClassifier::new(oracle.clone(), forms(), config);

        let results = classifier.classify_folder(dir.path()).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert!(results[0].is_verified);
        assert!(!results[1].is_verified && results[1].error.is_none());
        assert!(results[2].error.is_some());

        assert_eq!(oracle.max_live_uploads.load(Ordering::SeqCst), 1);
        assert_eq!(oracle.live_uploads.load(Ordering::SeqCst), 0);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start 3",
                "ok 1 a.pdf true",
                "ok 2 b.pdf false",
                "err 3 c.pdf",
                "done 3 1"
            ]
        );
    }

    #[tokio::test]
    async fn empty_folder_is_ok_and_empty() {
        let dir = TempDir::new().unwrap();
        let oracle = Arc::new(ByNameOracle {
            answers: vec![],
            live_uploads: AtomicUsize::new(0),
            max_live_uploads: AtomicUsize::new(0),
        });
        let classifier = FormClassifier::new(oracle, forms(), ClassifierConfig::default());
        assert!(classifier.classify_folder(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_fatal() {
        let oracle = Arc::new(ByNameOracle {
            answers: vec![],
            live_uploads: AtomicUsize::new(0),
            max_live_uploads: AtomicUsize::new(0),
        });
        let classifier = FormClassifier::new(oracle, forms(), ClassifierConfig::default());
        let err = classifier
            .classify_folder("/definitely/not/here")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::FolderNotFound { .. }));
    }
}
