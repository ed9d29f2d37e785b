use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream row, whatever shape the source gave it.
pub type RawRecord = Map<String, Value>;

/// Canonical label: a category name or its integer class id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Id(i64),
    Name(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Id(id) => write!(f, "{id}"),
            Label::Name(name) => f.write_str(name),
        }
    }
}

/// Output unit of the pipeline. Built once per accepted record and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalExample {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CanonicalExample {
    pub fn new(text: impl Into<String>, label: Option<Label>) -> Self {
        Self {
            text: text.into(),
            label,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Label rendered for reports and stratification; unlabeled rows share one bucket.
    pub fn label_key(&self) -> String {
        match &self.label {
            Some(label) => label.to_string(),
            None => "<unlabeled>".to_string(),
        }
    }

    pub fn source_key(&self) -> String {
        self.source.clone().unwrap_or_else(|| "<untagged>".to_string())
    }
}

/// A named, disjoint slice of the output.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    pub name: String,
    pub examples: Vec<CanonicalExample>,
}

impl Partition {
    pub fn new(name: impl Into<String>, examples: Vec<CanonicalExample>) -> Self {
        Self {
            name: name.into(),
            examples,
        }
    }
}
