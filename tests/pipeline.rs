//! Integration tests for form-classifier.
//!
//! Most tests drive the public API end to end with a scripted in-process
//! oracle, so they need no network. The live Gemini test at the bottom is
//! gated behind `E2E_ENABLED` and needs `GEMINI_API_KEY` plus forms in
//! `./test_cases/forms/` with a matching `./test_cases/forms.json`.
//!
//! Run the live test with:
//!   E2E_ENABLED=1 cargo test --test pipeline live_ -- --nocapture

use async_trait::async_trait;
use form_classifier::prompts::PromptPair;
use form_classifier::{
    load_results, save_results, save_stats_at, verify, ClassificationProgressCallback,
    ClassifierConfig, DocumentError, DocumentHandle, FormClassifier, FormConfig, FormTable,
    NoopProgressCallback, Oracle, OracleResponse, StatsTable, TokenUsage,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies with a fixed text per file name; unlisted files get an upload error.
struct ScriptedOracle {
    replies: HashMap<String, String>,
    released: AtomicUsize,
}

impl ScriptedOracle {
    fn new(replies: &[(&str, String)]) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .iter()
                .map(|(name, text)| (name.to_string(), text.clone()))
                .collect(),
            released: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn upload(&self, path: &Path) -> Result<DocumentHandle, DocumentError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if !self.replies.contains_key(&name) {
            return Err(DocumentError::UploadFailed {
                detail: "HTTP 400: unsupported file".into(),
            });
        }
        Ok(DocumentHandle {
            name,
            uri: String::new(),
            mime_type: "application/pdf".into(),
        })
    }

    async fn generate(
        &self,
        _prompts: PromptPair<'_>,
        handle: &DocumentHandle,
    ) -> Result<OracleResponse, DocumentError> {
        Ok(OracleResponse {
            text: self.replies.get(&handle.name).cloned(),
            usage: TokenUsage {
                input_tokens: 1200,
                output_tokens: 150,
                total_tokens: 1350,
            },
            ..Default::default()
        })
    }

    async fn release(&self, _handle: &DocumentHandle) -> Result<(), DocumentError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn forms() -> FormTable {
    FormTable::from_entries([
        FormConfig {
            form_number: "1234".into(),
            expected_title_1: "בקשה לקצבה".into(),
            expected_title_2: "טופס בקשה".into(),
            expected_pages: 3,
        },
        FormConfig {
            form_number: "1344".into(),
            expected_title_1: "הצהרת תושבות".into(),
            expected_title_2: "הצהרה על מקום מגורים".into(),
            expected_pages: 2,
        },
    ])
}

fn answer(number: &str, title: &str, pages: u32) -> String {
    serde_json::json!({
        "form_classification": {
            "form_number": {"value": number, "confidence_level": "High"},
            "form_title": {"value": title, "confidence_level": "High"},
            "page_count": {"value": pages, "confidence_level": "Medium"}
        },
        "processing_metadata": {"overall_confidence": "High"}
    })
    .to_string()
}

fn write_pdfs(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"%PDF-1.4\n%test\n").unwrap();
    }
}

fn at(minute: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(12, minute, 0)
        .unwrap()
}

// ── Verification scenarios ───────────────────────────────────────────────────

#[test]
fn verify_scenarios() {
    let forms = forms();
    assert!(verify("1234", "בקשה לקצבה והטבות", 3, &forms));
    assert!(!verify("1234", "בקשה לקצבה והטבות", 2, &forms));
    assert!(!verify("1234", "בקשה לקצבה והטבות", 4, &forms));
    assert!(!verify("4321", "בקשה לקצבה", 3, &forms));
    assert!(verify("1344", "טופס הצהרת תושבות לשנת 2024", 2, &forms));
}

// ── Full batch through the public API ────────────────────────────────────────

#[tokio::test]
async fn batch_to_reports() {
    let scans = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdfs(
        scans.path(),
        &["01.pdf", "02.pdf", "03.pdf", "04.pdf", "05.pdf"],
    );

    let oracle = ScriptedOracle::new(&[
        // verified by containment
        (
            "01.pdf",
            format!("```json\n{}\n```", answer("1234", "בקשה לקצבה והטבות", 3)),
        ),
        // right form, wrong page count
        ("02.pdf", answer("1234", "בקשה לקצבה", 2)),
        // verified by fuzzy match on the second title, with prose around the JSON
        (
            "03.pdf",
            format!("Result:\n{}", answer("1344", "הצהרה על מקום מגורם", 2)),
        ),
        // model did not answer in JSON
        ("04.pdf", "I could not read this document.".to_string()),
        // 05.pdf is not scripted: upload fails
    ]);
    let classifier = FormClassifier::new(oracle.clone(), forms(), ClassifierConfig::default());

    let results = classifier.classify_folder(scans.path()).await.unwrap();
    assert_eq!(results.len(), 5);

    let verified: Vec<bool> = results.iter().map(|r| r.is_verified).collect();
    assert_eq!(verified, vec![true, false, true, false, false]);
    assert!(results[..3].iter().all(|r| r.error.is_none()));
    assert!(results[3].error.as_deref().unwrap().contains("Unparseable"));
    assert!(results[4].error.as_deref().unwrap().contains("UploadFailed"));
    // Every successful upload was released.
    assert_eq!(oracle.released.load(Ordering::SeqCst), 4);

    let results_path = out.path().join("results.json");
    save_results(&results, &results_path).unwrap();
    assert_eq!(load_results(&results_path).unwrap(), results);

    let stats_path = out.path().join("stats.html");
    let summary = save_stats_at(&results, classifier.forms(), &stats_path, at(0)).unwrap();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.verified, 2);
    assert_eq!(summary.failed, 3);

    let table = StatsTable::load(&stats_path);
    let first = &table.rows()[0];
    assert_eq!(first.filename, "01.pdf");
    assert_eq!(first.title, "בקשה לקצבה והטבות");
    assert_eq!(first.expected_title, "בקשה לקצבה OR טופס בקשה");
    assert_eq!(first.input_tokens, "1200");
    let errored = &table.rows()[4];
    assert_eq!(errored.form_type, "");
    assert_eq!(errored.expected_pages, "");
}

#[tokio::test]
async fn repeated_runs_append_to_stats_but_replace_results() {
    let scans = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_pdfs(scans.path(), &["a.pdf", "b.pdf"]);

    let oracle = ScriptedOracle::new(&[
        ("a.pdf", answer("1234", "טופס בקשה", 3)),
        ("b.pdf", answer("1344", "הצהרת תושבות", 2)),
    ]);
    let classifier = FormClassifier::new(oracle, forms(), ClassifierConfig::default());
    let results_path = out.path().join("results.json");
    let stats_path = out.path().join("stats.html");

    for run in 0..4 {
        let results = classifier.classify_folder(scans.path()).await.unwrap();
        save_results(&results, &results_path).unwrap();
        save_stats_at(&results, classifier.forms(), &stats_path, at(run)).unwrap();
    }

    assert_eq!(load_results(&results_path).unwrap().len(), 2);
    let table = StatsTable::load(&stats_path);
    assert_eq!(table.len(), 8);
    assert_eq!(table.summary().verified, 8);
    assert_eq!(table.rows()[7].date, "2025-06-01 12:03");
}

#[tokio::test]
async fn extension_filter_is_configurable() {
    let scans = TempDir::new().unwrap();
    write_pdfs(scans.path(), &["a.pdf", "b.scan"]);

    let oracle = ScriptedOracle::new(&[("b.scan", answer("1234", "טופס בקשה", 3))]);
    let config = ClassifierConfig::builder()
        .document_extension("scan")
        .build()
        .unwrap();
    let classifier = FormClassifier::new(oracle, forms(), config);

    let results = classifier.classify_folder(scans.path()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "b.scan");
    assert!(results[0].is_verified);
}

#[tokio::test]
async fn callback_is_usable_across_tasks() {
    #[derive(Default)]
    struct Counter(AtomicUsize);
    impl ClassificationProgressCallback for Counter {
        fn on_document_start(&self, _i: usize, _t: usize, _f: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter::default());
    let cb = counter.clone();
    tokio::spawn(async move { cb.on_document_start(1, 1, "x.pdf") })
        .await
        .unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<FormClassifier>();
}

#[test]
fn forms_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forms.json");
    std::fs::write(
        &path,
        r#"[{"form_number": 1234, "expected_title_1": "בקשה לקצבה", "expected_title_2": "טופס בקשה", "expected_pages": 3}]"#,
    )
    .unwrap();

    let table = FormTable::load(&path).unwrap();
    assert_eq!(table.len(), 1);
    assert!(verify("1234", "טופס בקשה", 3, &table));
}

// ── Live Gemini ──────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

#[tokio::test]
async fn live_gemini_classifies_sample_forms() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 and GEMINI_API_KEY to run");
        return;
    }
    let forms_dir = test_cases_dir().join("forms");
    let config_path = test_cases_dir().join("forms.json");
    if !forms_dir.exists() || !config_path.exists() {
        println!(
            "SKIP: put sample PDFs in {} and expected values in {}",
            forms_dir.display(),
            config_path.display()
        );
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter("form_classifier=debug")
        .with_test_writer()
        .try_init();

    let forms = FormTable::load(&config_path).expect("forms.json loads");
    let classifier = FormClassifier::from_config(forms, ClassifierConfig::default())
        .expect("GEMINI_API_KEY must be set");
    let results = classifier.classify_folder(&forms_dir).await.unwrap();

    assert!(!results.is_empty(), "no PDFs in {}", forms_dir.display());
    for r in &results {
        println!(
            "{}: number={:?} title={:?} pages={} verified={} error={:?}",
            r.filename, r.form_number, r.form_title, r.page_count, r.is_verified, r.error
        );
        if r.error.is_none() {
            assert!(r.token_usage.total_tokens > 0, "{}: no token usage", r.filename);
        }
    }
}
