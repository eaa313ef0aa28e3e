//! Rendering of the statistics table as a standalone HTML page.
//!
//! Rendering is a pure function of the rows and a timestamp. Every cell is
//! HTML-escaped, so whatever text [`crate::report::stats::StatsTable::parse`]
//! reads back is exactly what went in.

use crate::report::stats::{StatsRow, StatsSummary, HEADERS};
use chrono::NaiveDateTime;
use html_escape::encode_text;
use std::fmt::Write;

const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STYLE: &str = r#"        body { font-family: Arial, sans-serif; margin: 20px; }
        h1 { color: #333; border-bottom: 2px solid #007acc; padding-bottom: 10px; }
        table { border-collapse: collapse; width: 100%; margin-top: 20px; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: top; }
        th { background-color: #f2f2f2; font-weight: bold; }
        tr:nth-child(even) { background-color: #f9f9f9; }
        tr:hover { background-color: #f0f8ff; }
        .success-yes { background-color: #d4edda; color: #155724; }
        .success-no { background-color: #f8d7da; color: #721c24; }
        .confidence-high { background-color: #d1ecf1; }
        .confidence-medium { background-color: #fff3cd; }
        .confidence-low { background-color: #f8d7da; }
        .wrap { max-width: 200px; word-wrap: break-word; }
        .timestamp { color: #666; font-size: 0.9em; }
        .stats-summary { background-color: #e7f3ff; padding: 15px; border-radius: 5px; margin: 20px 0; }
        .legend { margin-top: 20px; padding: 10px; background-color: #f0f0f0; border-radius: 5px; }
"#;

const LEGEND: &str = r#"    <div class="legend">
        <strong>Legend:</strong><br>
        • <strong>Blue confidence cells</strong>: High confidence<br>
        • <strong>Yellow confidence cells</strong>: Medium confidence<br>
        • <strong>Red confidence cells</strong>: Low confidence<br>
        • <strong>Green "Success"</strong>: verified classification<br>
        • <strong>Red "Success"</strong>: not verified<br>
        • <strong>Token counts</strong>: API usage (input/output tokens)<br>
        • New runs append rows; earlier rows are never removed
    </div>
"#;

/// CSS class for a confidence cell.
pub fn confidence_class(label: &str) -> &'static str {
    match label.trim() {
        "High" => "confidence-high",
        "Medium" => "confidence-medium",
        _ => "confidence-low",
    }
}

/// Render the complete statistics document.
pub fn render(rows: &[StatsRow], generated: NaiveDateTime) -> String {
    let summary = StatsSummary::from_rows(rows);

    let mut out = String::with_capacity(4096 + rows.len() * 600);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str("    <meta charset=\"utf-8\">\n");
    out.push_str("    <title>Form Classification Statistics</title>\n");
    out.push_str("    <style>\n");
    out.push_str(STYLE);
    out.push_str("    </style>\n</head>\n<body>\n");
    out.push_str("    <h1>Form Classification Statistics</h1>\n");
    let _ = writeln!(
        out,
        "    <div class=\"timestamp\">Generated: {}</div>",
        generated.format(GENERATED_FORMAT)
    );
    let _ = writeln!(
        out,
        "    <div class=\"stats-summary\"><strong>Summary:</strong> {} total classifications | \
         <strong>Verified:</strong> {} | <strong>Failed:</strong> {}</div>",
        summary.total, summary.verified, summary.failed
    );

    out.push_str("    <table>\n        <thead>\n            <tr>");
    for header in HEADERS {
        let _ = write!(out, "<th>{header}</th>");
    }
    out.push_str("</tr>\n        </thead>\n        <tbody>\n");
    for row in rows {
        render_row(&mut out, row);
    }
    out.push_str("        </tbody>\n    </table>\n");

    out.push_str(LEGEND);
    out.push_str("</body>\n</html>\n");
    out
}

fn render_row(out: &mut String, row: &StatsRow) {
    out.push_str("            <tr>");
    cell(out, &row.filename);
    cell(out, &row.date);
    cell(out, &row.form_type);
    classed_cell(out, confidence_class(&row.type_confidence), &row.type_confidence);
    text_cell(out, &row.title);
    classed_cell(out, confidence_class(&row.title_confidence), &row.title_confidence);
    cell(out, &row.pages);
    classed_cell(out, confidence_class(&row.pages_confidence), &row.pages_confidence);
    cell(out, &row.input_tokens);
    cell(out, &row.output_tokens);
    text_cell(out, &row.expected_title);
    cell(out, &row.expected_pages);

    let class = if row.verified { "success-yes" } else { "success-no" };
    let _ = write!(
        out,
        "<td class=\"{}\"><strong>{}</strong></td>",
        class,
        row.success_label()
    );
    out.push_str("</tr>\n");
}

fn cell(out: &mut String, text: &str) {
    let _ = write!(out, "<td>{}</td>", encode_text(text));
}

fn classed_cell(out: &mut String, class: &str, text: &str) {
    let _ = write!(out, "<td class=\"{}\">{}</td>", class, encode_text(text));
}

/// Free text that may be right-to-left.
fn text_cell(out: &mut String, text: &str) {
    let _ = write!(out, "<td class=\"wrap\" dir=\"auto\">{}</td>", encode_text(text));
}
