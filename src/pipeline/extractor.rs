//! LLM field extraction — one completion per required field.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::TextGenerator;

/// Why a field has no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absence {
    /// The service answered with nothing (after trimming).
    Empty,
    /// The service call failed.
    ServiceError(String),
}

/// Extraction result for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Extracted(String),
    Absent(Absence),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Extracted(s) => Some(s),
            Self::Absent(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.as_str().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Field name → value, in the order the fields were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    entries: Vec<(String, FieldValue)>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping its first insertion position.
    pub fn insert(&mut self, field: &str, value: FieldValue) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((field.to_string(), value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `(field, value)` pairs that hold a value, in insertion order.
    pub fn present(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            let k = k.into();
            let v = v.into();
            let value = if v.trim().is_empty() {
                FieldValue::Absent(Absence::Empty)
            } else {
                FieldValue::Extracted(v)
            };
            fields.insert(&k, value);
        }
        fields
    }
}

/// Prompt asking for a single field.
pub fn extraction_prompt(field: &str, body: &str) -> String {
    format!("Extract the {field} from the following email body:\n\n{body}\n\n{field}:")
}

/// Asks a text generator for each required field independently.
pub struct FieldExtractor {
    llm: Arc<dyn TextGenerator>,
}

impl FieldExtractor {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Extract every field in `fields` from `body`.
    ///
    /// A failed call only affects its own field.
    pub async fn extract(&self, body: &str, fields: &[String]) -> ExtractedFields {
        let mut extracted = ExtractedFields::new();

        for field in fields {
            let prompt = extraction_prompt(field, body);
            let value = match self.llm.generate(&prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        FieldValue::Absent(Absence::Empty)
                    } else {
                        FieldValue::Extracted(text.to_string())
                    }
                }
                Err(e) => {
                    warn!(field = %field, model = self.llm.model_name(), error = %e, "Field extraction failed");
                    FieldValue::Absent(Absence::ServiceError(e.to_string()))
                }
            };
            debug!(field = %field, present = value.is_present(), "Field extracted");
            extracted.insert(field, value);
        }

        extracted
    }
}
