//! Expected-values table: what each known form should look like.
//!
//! The table is a JSON array on disk:
//!
//! ```json
//! [
//!   {
//!     "form_number": "1234",
//!     "expected_title_1": "בקשה לקצבה",
//!     "expected_title_2": "טופס בקשה",
//!     "expected_pages": 3
//!   }
//! ]
//! ```
//!
//! It is loaded once per run and only read afterwards.

use crate::error::ClassifierError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Expected values for one form number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Form number as printed on the document, e.g. `"1344"`.
    #[serde(deserialize_with = "string_or_number")]
    pub form_number: String,
    /// First accepted title.
    pub expected_title_1: String,
    /// Second accepted title.
    pub expected_title_2: String,
    /// Exact number of pages the document must have.
    pub expected_pages: u32,
}

impl FormConfig {
    /// Both expected titles joined the way the statistics report shows them.
    pub fn display_titles(&self) -> String {
        format!("{} OR {}", self.expected_title_1, self.expected_title_2)
    }
}

/// All known forms, keyed by form number.
#[derive(Debug, Clone, Default)]
pub struct FormTable {
    forms: HashMap<String, FormConfig>,
}

impl FormTable {
    /// Build a table from entries. A repeated form number replaces the
    /// earlier entry.
    pub fn from_entries(entries: impl IntoIterator<Item = FormConfig>) -> Self {
        let mut forms = HashMap::new();
        for entry in entries {
            if let Some(previous) = forms.insert(entry.form_number.clone(), entry) {
                warn!(
                    "Form {} appears more than once in the config; keeping the last entry",
                    previous.form_number
                );
            }
        }
        Self { forms }
    }

    /// Load the table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ClassifierError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ClassifierError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let table = Self::from_json(&text).map_err(|detail| ClassifierError::InvalidFormConfig {
            path: path.to_path_buf(),
            detail,
        })?;

        info!("Loaded {} form configurations", table.len());
        Ok(table)
    }

    /// Parse the table from JSON text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let entries: Vec<FormConfig> = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, form_number: &str) -> Option<&FormConfig> {
        self.forms.get(form_number)
    }

    pub fn contains(&self, form_number: &str) -> bool {
        self.forms.contains_key(form_number)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Accept `"1344"` or `1344` for the form number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
