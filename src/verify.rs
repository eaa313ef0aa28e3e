//! Verification of extracted fields against the expected-values table.
//!
//! A result is *verified* when the form number is known, the extracted
//! title matches either expected title, and the page count is exactly the
//! expected one. Titles match by containment or by fuzzy partial ratio;
//! any of the four checks (two titles, two methods) is enough.
//!
//! Only surrounding whitespace is trimmed before comparing. Case and
//! right-to-left text are compared as given.

use crate::forms::{FormConfig, FormTable};
use crate::fuzzy::partial_ratio;

/// Default minimum partial-ratio score (0–100) for a fuzzy title match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 85.0;

/// How a title matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMethod {
    /// The expected title occurs verbatim in the extracted title.
    Contains,
    /// Partial-ratio score at or above the threshold.
    Fuzzy(f64),
}

/// Which expected title matched, and how.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleMatch {
    /// 1 or 2.
    pub expected_title: u8,
    pub method: MatchMethod,
}

/// Full explanation of a verification decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub known_form: bool,
    pub title_match: Option<TitleMatch>,
    pub page_match: bool,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.known_form && self.title_match.is_some() && self.page_match
    }
}

/// Verifies extracted fields against a [`FormTable`].
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    forms: &'a FormTable,
    threshold: f64,
}

impl<'a> Verifier<'a> {
    pub fn new(forms: &'a FormTable) -> Self {
        Self {
            forms,
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Override the fuzzy threshold (clamped to 0–100).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 100.0);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn verify(&self, form_number: &str, form_title: &str, page_count: u32) -> bool {
        self.explain(form_number, form_title, page_count)
            .is_verified()
    }

    /// Like [`Verifier::verify`], but reports which check decided the outcome.
    pub fn explain(&self, form_number: &str, form_title: &str, page_count: u32) -> Verification {
        let Some(expected) = self.forms.get(form_number) else {
            return Verification {
                known_form: false,
                title_match: None,
                page_match: false,
            };
        };

        Verification {
            known_form: true,
            title_match: self.match_title(expected, form_title),
            page_match: page_count == expected.expected_pages,
        }
    }

    /// Containment is checked for both titles first, then fuzzy scores.
    fn match_title(&self, expected: &FormConfig, form_title: &str) -> Option<TitleMatch> {
        let extracted = form_title.trim();
        let candidates = [
            (1u8, expected.expected_title_1.trim()),
            (2u8, expected.expected_title_2.trim()),
        ];

        // A blank expected title is contained in any title and so accepts it.
        for &(index, title) in &candidates {
            if extracted.contains(title) {
                return Some(TitleMatch {
                    expected_title: index,
                    method: MatchMethod::Contains,
                });
            }
        }

        candidates
            .iter()
            .map(|&(index, title)| (index, partial_ratio(title, extracted)))
            .filter(|&(_, score)| score >= self.threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, score)| TitleMatch {
                expected_title: index,
                method: MatchMethod::Fuzzy(score),
            })
    }
}

/// Verify with the default fuzzy threshold.
pub fn verify(form_number: &str, form_title: &str, page_count: u32, forms: &FormTable) -> bool {
    Verifier::new(forms).verify(form_number, form_title, page_count)
}
