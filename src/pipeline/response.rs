//! Turning the model's text into typed fields.
//!
//! Models are told to answer with bare JSON but often wrap it in a Markdown
//! fence or add a sentence around it. [`parse_json`] strips fences, parses,
//! and on failure retries with the outermost `{ … }` span. The parsed value
//! is then read once into a [`FormResponse`]; missing or oddly-typed fields
//! fall back to defaults instead of failing.

use crate::error::DocumentError;
use crate::output::Confidence;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

static RE_OUTER_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Remove Markdown code fences around (and inside) a model answer.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(JSON_FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    } else if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest.strip_suffix(FENCE).unwrap_or(rest);
    }

    text.replace(FENCE, "").trim().to_string()
}

/// Parse a model answer into a JSON object.
///
/// A top-level value that is not an object is rejected: every field the
/// classifier reads lives under `form_classification`.
pub fn parse_json(raw: &str) -> Result<Value, DocumentError> {
    let text = strip_fences(raw);

    let value = match serde_json::from_str::<Value>(&text) {
        Ok(v) => Some(v),
        Err(_) => RE_OUTER_OBJECT
            .find(&text)
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok()),
    };

    match value {
        Some(v @ Value::Object(_)) => Ok(v),
        _ => Err(DocumentError::Unparseable {
            preview: text.chars().take(200).collect(),
        }),
    }
}

/// The fields the classifier reads from a parsed answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormResponse {
    pub form_number: String,
    pub form_title: String,
    pub page_count: u32,
    pub confidence: Confidence,
    pub title_confidence: Confidence,
    pub pages_confidence: Confidence,
}

impl FormResponse {
    /// Read `form_classification.{form_number,form_title,page_count}`.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.pointer(&format!("/form_classification/{name}"));
        let confidence = |name: &str| {
            field(name)
                .and_then(|f| f.get("confidence_level"))
                .and_then(Value::as_str)
                .map(Confidence::parse_lenient)
                .unwrap_or_default()
        };

        Self {
            form_number: field("form_number")
                .and_then(|f| f.get("value"))
                .map(text_value)
                .unwrap_or_default(),
            form_title: field("form_title")
                .and_then(|f| f.get("value"))
                .map(text_value)
                .unwrap_or_default(),
            page_count: field("page_count")
                .and_then(|f| f.get("value"))
                .and_then(count_value)
                .unwrap_or(0),
            confidence: confidence("form_number"),
            title_confidence: confidence("form_title"),
            pages_confidence: confidence("page_count"),
        }
    }
}

/// Strings pass through; numbers become their decimal text; anything else
/// (including `null`) is empty.
fn text_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Non-negative integers, integral floats and numeric strings.
fn count_value(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = r#"{"form_classification": {"form_number": {"value": "1234", "confidence_level": "High"}, "form_title": {"value": "בקשה לקצבה", "confidence_level": "Medium"}, "page_count": {"value": 3, "confidence_level": "High"}}}"#;

    #[test]
    fn fenced_and_bare_answers_parse_identically() {
        let bare = parse_json(BODY).unwrap();
        let json_fenced = parse_json(&format!("```json\n{BODY}\n```")).unwrap();
        let plain_fenced = parse_json(&format!("```\n{BODY}\n```")).unwrap();
        assert_eq!(bare, json_fenced);
        assert_eq!(bare, plain_fenced);
    }

    #[test]
    fn leading_fence_without_closing_fence() {
        assert!(parse_json(&format!("```json\n{BODY}")).is_ok());
        assert!(parse_json(&format!("```\n{BODY}")).is_ok());
    }

    #[test]
    fn prose_around_object_is_recovered() {
        let v = parse_json(&format!("Here is the classification:\n{BODY}\nHope this helps.")).unwrap();
        assert_eq!(v["form_classification"]["form_number"]["value"], "1234");
    }

    #[test]
    fn garbage_is_unparseable() {
        let err = parse_json("I cannot read this document.").unwrap_err();
        assert_eq!(err.kind(), "Unparseable");
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        assert!(parse_json("[1, 2, 3]").is_err());
        assert!(parse_json("\"text\"").is_err());
    }

    #[test]
    fn unparseable_preview_is_bounded() {
        let long = "x".repeat(1000);
        match parse_json(&long) {
            Err(DocumentError::Unparseable { preview }) => assert_eq!(preview.chars().count(), 200),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fields_are_read() {
        let r = FormResponse::from_value(&parse_json(BODY).unwrap());
        assert_eq!(r.form_number, "1234");
        assert_eq!(r.form_title, "בקשה לקצבה");
        assert_eq!(r.page_count, 3);
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.title_confidence, Confidence::Medium);
        assert_eq!(r.pages_confidence, Confidence::High);
    }

    #[test]
    fn missing_fields_default() {
        let r = FormResponse::from_value(&json!({"unexpected": true}));
        assert_eq!(r, FormResponse::default());
        assert_eq!(r.confidence, Confidence::Low);
    }

    #[test]
    fn loose_types_are_coerced() {
        let v = json!({"form_classification": {
            "form_number": {"value": 1344, "confidence_level": "high"},
            "form_title": {"value": null},
            "page_count": {"value": "4"}
        }});
        let r = FormResponse::from_value(&v);
        assert_eq!(r.form_number, "1344");
        assert_eq!(r.form_title, "");
        assert_eq!(r.page_count, 4);
        assert_eq!(r.confidence, Confidence::High);

        let v = json!({"form_classification": {"page_count": {"value": 2.0}}});
        assert_eq!(FormResponse::from_value(&v).page_count, 2);
        let v = json!({"form_classification": {"page_count": {"value": -1}}});
        assert_eq!(FormResponse::from_value(&v).page_count, 0);
    }
}
