//! CLI binary for form-classifier.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClassifierConfig`, runs one batch and writes both reports.

use anyhow::{Context, Result};
use clap::Parser;
use form_classifier::config::{API_KEY_ENV, DEFAULT_MODEL};
use form_classifier::report::stats::DEFAULT_STATS_FILE;
use form_classifier::{
    load_results, save_results, save_stats, ClassificationProgressCallback, ClassifierConfig,
    FormClassifier, FormTable, ProgressCallback, RunSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the batch, one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Listing documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl ClassificationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} forms  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Classifying");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Classifying {total_documents} forms…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, filename: &str) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, filename: &str, is_verified: bool) {
        let (mark, label) = if is_verified {
            (green("✓"), green("verified"))
        } else {
            (yellow("•"), yellow("not verified"))
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            mark,
            index,
            total,
            filename,
            label,
            self.elapsed()
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, filename: &str, diagnostic: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            filename,
            red("error"),
            self.elapsed()
        ));
        self.bar.println(red(&"=".repeat(60)));
        for line in diagnostic.lines() {
            self.bar.println(line.to_string());
        }
        self.bar.println(red(&"=".repeat(60)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, verified_count: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} forms verified{}",
            if verified_count == total_documents {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&verified_count.to_string()),
            total_documents,
            if errors > 0 {
                format!("  ({} errors)", red(&errors.to_string()))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classify a folder of scanned forms
  classify scans/ forms.json results.json

  # Explicit key and statistics file
  classify scans/ forms.json results.json --api-key AIza... --stats stats.html

  # Stricter fuzzy title matching
  classify scans/ forms.json results.json --threshold 92

  # Rebuild the statistics table from a saved results file (no API key needed)
  classify scans/ forms.json results.json --regenerate-stats

CONFIG FILE (forms.json):
  [
    {"form_number": "1234", "expected_title_1": "בקשה לקצבה",
     "expected_title_2": "טופס בקשה", "expected_pages": 3}
  ]

VERIFICATION:
  A form is verified when its number is in the config file, its page count
  equals expected_pages, and its title contains either expected title or
  scores at least --threshold (default 85) on fuzzy partial-ratio similarity.

OUTPUTS:
  OUTPUT_FILE   JSON array of this run's results (overwritten every run)
  --stats FILE  HTML table of every run so far (rows are only ever appended)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Google Gemini API key (also read from a .env file)
  RUST_LOG         Override the log filter, e.g. RUST_LOG=form_classifier=debug
"#;

/// Classify Hebrew government PDF forms with Gemini and verify them.
#[derive(Parser, Debug)]
#[command(
    name = "classify",
    version,
    about = "Classify Hebrew government PDF forms with Gemini and verify them against expected values",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDF forms (not searched recursively).
    input_folder: PathBuf,

    /// JSON file with the expected values for each form number.
    config_file: PathBuf,

    /// Where to write this run's results as JSON.
    output_file: PathBuf,

    /// Gemini API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Cumulative statistics file (HTML).
    #[arg(long, default_value = DEFAULT_STATS_FILE)]
    stats: PathBuf,

    /// Gemini model ID.
    #[arg(long, env = "FORM_CLASSIFIER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Minimum fuzzy title score (0–100).
    #[arg(long, default_value_t = 85.0)]
    threshold: f64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per document.
    #[arg(long, default_value_t = 1500)]
    max_tokens: u32,

    /// Extension of the files to classify.
    #[arg(long, default_value = "pdf")]
    extension: String,

    /// Per-request API timeout in seconds.
    #[arg(long, default_value_t = 300)]
    api_timeout: u64,

    /// Rebuild the statistics file from OUTPUT_FILE instead of classifying.
    #[arg(long)]
    regenerate_stats: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before parsing so clap's `env` sees values from .env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar prints per-document lines itself, so library INFO
    // logs are muted while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.regenerate_stats;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn,form_classifier::pipeline::classify=off"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let forms = FormTable::load(&cli.config_file).context("Failed to load form config")?;

    // ── Regenerate-stats mode ────────────────────────────────────────────
    if cli.regenerate_stats {
        return regenerate_stats(&cli, &forms);
    }

    // ── Build config & classifier ────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ClassificationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let classifier = FormClassifier::from_config(forms, config)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let started = Instant::now();
    let results = classifier
        .classify_folder(&cli.input_folder)
        .await
        .context("Classification failed")?;

    save_results(&results, &cli.output_file).context("Failed to save results")?;
    let stats = save_stats(&results, classifier.forms(), &cli.stats)
        .context("Failed to update statistics")?;

    if !cli.quiet {
        print_summary(&RunSummary::from_results(&results), started.elapsed());
        eprintln!(
            "   results  →  {}",
            bold(&cli.output_file.display().to_string())
        );
        eprintln!(
            "   stats    →  {}  {}",
            bold(&cli.stats.display().to_string()),
            dim(&format!("({} rows total)", stats.total))
        );
    }

    Ok(())
}

/// Map CLI args to `ClassifierConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClassifierConfig> {
    let mut builder = ClassifierConfig::builder()
        .model(&cli.model)
        .fuzzy_threshold(cli.threshold)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .document_extension(&cli.extension)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Replace the statistics file with one built from a saved results file.
fn regenerate_stats(cli: &Cli, forms: &FormTable) -> Result<()> {
    let results = load_results(&cli.output_file).context("Failed to load results")?;

    if cli.stats.exists() {
        std::fs::remove_file(&cli.stats)
            .with_context(|| format!("Failed to remove {}", cli.stats.display()))?;
    }
    let stats = save_stats(&results, forms, &cli.stats).context("Failed to write statistics")?;

    if !cli.quiet {
        eprintln!(
            "{} Regenerated {} with {} rows ({} verified, {} not verified)",
            green("✔"),
            bold(&cli.stats.display().to_string()),
            stats.total,
            stats.verified,
            stats.failed
        );
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, elapsed: Duration) {
    eprintln!();
    eprintln!("{}", bold("=== CLASSIFICATION SUMMARY ==="));
    eprintln!("Total files processed:  {}", summary.total);
    eprintln!("Successfully verified:  {}", green(&summary.verified.to_string()));
    eprintln!("Failed verification:    {}", yellow(&summary.failed.to_string()));
    eprintln!("Processing errors:      {}", red(&summary.errors.to_string()));
    eprintln!(
        "Tokens:                 {} in  /  {} out  /  {} total",
        summary.input_tokens, summary.output_tokens, summary.total_tokens
    );
    eprintln!("Elapsed:                {:.1}s", elapsed.as_secs_f64());
}
