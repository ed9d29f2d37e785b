use serde::Deserialize;
use serde_json::Value;

use crate::example::RawRecord;

/// Which raw fields feed the canonical text and label.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    /// First entry is required; later entries are appended when present.
    pub text_fields: Vec<String>,
    /// Label or rating column. Absent or null values yield no raw label.
    #[serde(default)]
    pub label_field: Option<String>,
    /// Pick this key when the text value is a per-language object, e.g. `{"en": ..., "de": ...}`.
    #[serde(default)]
    pub translation_key: Option<String>,
}

impl FieldMapping {
    pub fn text(field: impl Into<String>) -> Self {
        Self {
            text_fields: vec![field.into()],
            label_field: None,
            translation_key: None,
        }
    }

    pub fn with_label(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    /// True when the record carries any declared text field at all, whatever its value.
    pub fn has_text_field(&self, record: &RawRecord) -> bool {
        self.text_fields.iter().any(|f| record.contains_key(f))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub raw_label: Option<Value>,
}

/// Pull `(text, raw_label)` out of one record. `None` when the required text
/// field is missing, empty or not a string.
pub fn extract(record: &RawRecord, mapping: &FieldMapping) -> Option<Extracted> {
    let (first, rest) = mapping.text_fields.split_first()?;
    let mut text = text_value(record.get(first)?, mapping.translation_key.as_deref())?;
    if text.trim().is_empty() {
        return None;
    }

    for field in rest {
        let extra = record
            .get(field)
            .and_then(|v| text_value(v, mapping.translation_key.as_deref()));
        if let Some(extra) = extra.filter(|s| !s.trim().is_empty()) {
            text.push(' ');
            text.push_str(&extra);
        }
    }

    let raw_label = mapping
        .label_field
        .as_ref()
        .and_then(|f| record.get(f))
        .filter(|v| !v.is_null())
        .cloned();

    Some(Extracted { text, raw_label })
}

fn text_value(value: &Value, translation_key: Option<&str>) -> Option<String> {
    match (value, translation_key) {
        (Value::String(s), None) => Some(s.clone()),
        (Value::String(s), Some(key)) => {
            // bilingual dumps sometimes store the object as an encoded string;
            // anything else, including an object without `key`, is kept verbatim
            let picked = match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(obj)) => obj.get(key).and_then(Value::as_str).map(str::to_owned),
                _ => None,
            };
            Some(picked.unwrap_or_else(|| s.clone()))
        }
        (Value::Object(obj), Some(key)) => obj.get(key).and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}
