use std::collections::HashSet;
use std::str::FromStr;

use serde::Deserialize;

use crate::example::{CanonicalExample, Label};

/// What counts as "the same record". Declared per dataset: merged sources
/// sometimes keep one text under two labels on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    Text,
    TextLabel,
}

impl FromStr for DedupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "text_label" => Ok(Self::TextLabel),
            other => Err(format!("unknown dedup key {other:?}, expected text or text_label")),
        }
    }
}

/// Exact-match seen set for one output pass. First occurrence wins.
#[derive(Debug)]
pub struct Deduplicator {
    key: DedupKey,
    seen: HashSet<(String, Option<Label>)>,
}

impl Deduplicator {
    pub fn new(key: DedupKey) -> Self {
        Self {
            key,
            seen: HashSet::new(),
        }
    }

    /// Returns `false` when the example's key was already admitted.
    pub fn admit(&mut self, example: &CanonicalExample) -> bool {
        let label = match self.key {
            DedupKey::Text => None,
            DedupKey::TextLabel => example.label.clone(),
        };
        self.seen.insert((example.text.clone(), label))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
