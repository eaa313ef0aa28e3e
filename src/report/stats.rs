//! Cumulative statistics table.
//!
//! The statistics file is an append-only log that happens to be stored as
//! HTML. Each save reads the rows already in the file, appends one row per
//! new result, and re-renders the whole document with
//! [`crate::report::html::render`]. Rows are never edited or dropped.
//!
//! A file that cannot be read or parsed is treated as empty, so a damaged
//! statistics file costs its history but never a run.

use crate::error::ClassifierError;
use crate::forms::FormTable;
use crate::output::ClassificationResult;
use crate::report::{html, write_atomic};
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tracing::{debug, info, warn};

/// Default statistics file name.
pub const DEFAULT_STATS_FILE: &str = "classification_stats.html";

/// Column headers, in order.
pub const HEADERS: [&str; 13] = [
    "File Name",
    "Date",
    "Form Type",
    "Conf (Type)",
    "Title",
    "Conf (Title)",
    "Pages",
    "Conf (Pages)",
    "Input Tokens",
    "Output Tokens",
    "Expected Title",
    "Expected Pages",
    "Success",
];

const ROW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static TBODY: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").unwrap());
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// One line of the statistics table. All cells are kept as display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub filename: String,
    pub date: String,
    pub form_type: String,
    pub type_confidence: String,
    pub title: String,
    pub title_confidence: String,
    pub pages: String,
    pub pages_confidence: String,
    pub input_tokens: String,
    pub output_tokens: String,
    pub expected_title: String,
    pub expected_pages: String,
    pub verified: bool,
}

impl StatsRow {
    /// Row for a fresh result. Expected values are blank for unknown forms.
    pub fn from_result(result: &ClassificationResult, forms: &FormTable, now: NaiveDateTime) -> Self {
        let expected = forms.get(&result.form_number);
        Self {
            filename: result.filename.clone(),
            date: now.format(ROW_DATE_FORMAT).to_string(),
            form_type: result.form_number.clone(),
            type_confidence: result.confidence.to_string(),
            title: result.form_title.clone(),
            title_confidence: result.title_confidence.to_string(),
            pages: result.page_count.to_string(),
            pages_confidence: result.pages_confidence.to_string(),
            input_tokens: result.token_usage.input_tokens.to_string(),
            output_tokens: result.token_usage.output_tokens.to_string(),
            expected_title: expected.map(|f| f.display_titles()).unwrap_or_default(),
            expected_pages: expected
                .map(|f| f.expected_pages.to_string())
                .unwrap_or_default(),
            verified: result.is_verified,
        }
    }

    /// Rebuild a row from the text of its cells. `None` when there are
    /// fewer than 13 cells or every cell is blank.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < HEADERS.len() || cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        let cell = |i: usize| cells[i].clone();
        Some(Self {
            filename: cell(0),
            date: cell(1),
            form_type: cell(2),
            type_confidence: cell(3),
            title: cell(4),
            title_confidence: cell(5),
            pages: cell(6),
            pages_confidence: cell(7),
            input_tokens: cell(8),
            output_tokens: cell(9),
            expected_title: cell(10),
            expected_pages: cell(11),
            verified: cells[12] == "Yes",
        })
    }

    pub fn success_label(&self) -> &'static str {
        if self.verified {
            "Yes"
        } else {
            "No"
        }
    }
}

/// Counts shown in the summary banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSummary {
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
}

impl StatsSummary {
    pub fn from_rows(rows: &[StatsRow]) -> Self {
        let verified = rows.iter().filter(|r| r.verified).count();
        Self {
            total: rows.len(),
            verified,
            failed: rows.len() - verified,
        }
    }
}

/// All rows of a statistics file, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTable {
    rows: Vec<StatsRow>,
}

impl StatsTable {
    /// Read the rows of an existing statistics file. Never fails.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No statistics file at {}; starting a new one", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let table = Self::parse(&content);
                info!(
                    "Loaded {} existing rows from {}",
                    table.len(),
                    path.display()
                );
                table
            }
            Err(e) => {
                warn!(
                    "Could not read statistics file {}: {}; starting a new table",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Parse rows out of statistics HTML. Anything unrecognisable yields
    /// an empty table.
    pub fn parse(content: &str) -> Self {
        if !content.contains("<table") || !content.contains("<tbody") {
            warn!("No table found in existing statistics file; starting a new table");
            return Self::default();
        }

        let document = Html::parse_document(content);
        let Some(tbody) = document
            .select(&TABLE)
            .next()
            .and_then(|table| table.select(&TBODY).next())
        else {
            warn!("No table body found in existing statistics file; starting a new table");
            return Self::default();
        };

        let rows = tbody
            .select(&TR)
            .filter_map(|tr| {
                let cells: Vec<String> = tr.select(&TD).map(cell_text).collect();
                StatsRow::from_cells(&cells)
            })
            .collect();
        Self { rows }
    }

    pub fn append(&mut self, rows: impl IntoIterator<Item = StatsRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from_rows(&self.rows)
    }
}

/// Text fragments of a cell, each trimmed, joined without separators.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

/// Append one row per result to the statistics file at `path`.
pub fn save_stats(
    results: &[ClassificationResult],
    forms: &FormTable,
    path: impl AsRef<Path>,
) -> Result<StatsSummary, ClassifierError> {
    save_stats_at(results, forms, path, Local::now().naive_local())
}

/// [`save_stats`] with an explicit clock.
pub fn save_stats_at(
    results: &[ClassificationResult],
    forms: &FormTable,
    path: impl AsRef<Path>,
    now: NaiveDateTime,
) -> Result<StatsSummary, ClassifierError> {
    let path = path.as_ref();
    let mut table = StatsTable::load(path);
    table.append(results.iter().map(|r| StatsRow::from_result(r, forms, now)));

    let document = html::render(table.rows(), now);
    write_atomic(path, document.as_bytes())?;

    let summary = table.summary();
    info!(
        "Statistics updated in {} ({} rows, {} verified)",
        path.display(),
        summary.total,
        summary.verified
    );
    Ok(summary)
}
