//! # form-classifier
//!
//! Classify scanned Hebrew government forms with a multimodal model and
//! check the answer against a table of expected values.
//!
//! Each PDF is sent to Google Gemini, which reports the form number, the
//! form title and the page count as JSON. A result is *verified* when the
//! form number is known, the page count matches exactly, and the title
//! either contains one of the two expected titles or is at least 85%
//! similar to one of them (fuzzy partial ratio).
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder of PDFs
//!  │
//!  ├─ 1. Input     list *.pdf (sorted), check %PDF magic
//!  ├─ 2. Oracle    upload → generateContent → delete (one document at a time)
//!  ├─ 3. Response  strip fences, recover JSON, read the three fields
//!  ├─ 4. Verify    known form + exact pages + title contains / fuzzy ≥ threshold
//!  └─ 5. Report    results JSON (per run) + statistics HTML (cumulative)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use form_classifier::{save_results, save_stats, ClassifierConfig, FormClassifier, FormTable};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from GEMINI_API_KEY
//!     let forms = FormTable::load("forms.json")?;
//!     let classifier = FormClassifier::from_config(forms, ClassifierConfig::default())?;
//!
//!     let results = classifier.classify_folder("scans/").await?;
//!     save_results(&results, "results.json")?;
//!     let summary = save_stats(&results, classifier.forms(), "classification_stats.html")?;
//!     eprintln!("{} of {} rows verified", summary.verified, summary.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `classify` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! form-classifier = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod forms;
pub mod fuzzy;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod verify;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::FormClassifier;
pub use config::{ClassifierConfig, ClassifierConfigBuilder};
pub use error::{ClassifierError, DocumentError};
pub use forms::{FormConfig, FormTable};
pub use output::{ClassificationResult, Confidence, RunSummary, TokenUsage};
pub use pipeline::classify::classify_document;
pub use pipeline::oracle::{DocumentHandle, GeminiOracle, Oracle, OracleResponse};
pub use progress::{ClassificationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::json::{load_results, save_results};
pub use report::stats::{save_stats, save_stats_at, StatsRow, StatsSummary, StatsTable};
pub use verify::{verify, Verifier};
