use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dedup::DedupKey;
use crate::error::{PipelineError, Result};
use crate::extract::FieldMapping;
use crate::fetch::SourceLocation;
use crate::filter::FilterConfig;
use crate::source::InputFormat;
use crate::split::{SplitMode, SplitPlan};
use crate::taxonomy::{LabelFormat, LabelPolicy};

/// One declarative dataset: where the raw rows come from and every policy
/// applied to them. Replaces a hand-written per-dataset script.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDescriptor {
    pub name: String,
    pub sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub label: Option<LabelConfig>,
    pub dedup_key: DedupKey,
    #[serde(default)]
    pub subsample: Option<SubsampleConfig>,
    #[serde(default)]
    pub split: Option<SplitPlan>,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDescriptor {
    /// Provenance tag; also written as `source` when `output.tag_source` is set.
    pub tag: String,
    pub location: SourceLocation,
    pub format: InputFormat,
    pub fields: FieldMapping,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelConfig {
    pub policy: LabelPolicy,
    #[serde(default)]
    pub format: LabelFormat,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsampleConfig {
    pub max_total: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    crate::split::DEFAULT_SEED
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// File stem; defaults to the dataset name.
    #[serde(default)]
    pub stem: Option<String>,
    #[serde(default)]
    pub tag_source: bool,
}

impl DatasetDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let descriptor: Self = serde_json::from_reader(BufReader::new(file))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(raw)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn stem(&self) -> &str {
        self.output.stem.as_deref().unwrap_or(&self.name)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(PipelineError::Config(format!("{}: {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(PipelineError::Config("dataset name is empty".into()));
        }
        if self.sources.is_empty() {
            return bad("no sources declared".into());
        }
        let mut tags = HashSet::new();
        for s in &self.sources {
            if !tags.insert(s.tag.as_str()) {
                return bad(format!("source tag {:?} used twice", s.tag));
            }
            if s.fields.text_fields.is_empty() {
                return bad(format!("source {:?} declares no text field", s.tag));
            }
        }

        self.filter.validate()?;
        if self.filter.require_label && self.label.is_none() {
            return bad("require_label set but no label policy declared".into());
        }
        if let Some(label) = &self.label {
            label.policy.validate()?;
            if self.sources.iter().any(|s| s.fields.label_field.is_none()) {
                return bad("label policy declared but a source has no label_field".into());
            }
        }
        if self.dedup_key == DedupKey::TextLabel && self.label.is_none() {
            return bad("dedup_key text_label needs a label policy".into());
        }
        if let Some(split) = &self.split {
            split.validate()?;
            if split.mode == SplitMode::BalancedSources && self.sources.len() != 2 {
                return bad("balanced_sources mode needs exactly two sources".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRUG_REVIEWS: &str = r#"{
        "name": "drug_reviews",
        "sources": [{
            "tag": "drugrev",
            "location": {"path": "data/raw/DrugReviews.csv"},
            "format": {"kind": "csv"},
            "fields": {"text_fields": ["Reviews"], "label_field": "Rating"}
        }],
        "filter": {"min_chars": 5, "require_label": true},
        "label": {"policy": {"kind": "strict_10pt"}},
        "dedup_key": "text",
        "split": {"partitions": [["train", 0.8], ["val", 0.1], ["test", 0.1]], "seed": 42},
        "output": {"dir": "data/processed"}
    }"#;

    #[test]
    fn parses_a_full_descriptor() {
        let d = DatasetDescriptor::from_json_str(DRUG_REVIEWS).unwrap();
        assert_eq!(d.stem(), "drug_reviews");
        assert_eq!(d.label.as_ref().unwrap().policy, LabelPolicy::Strict10pt);
        assert_eq!(d.label.as_ref().unwrap().format, LabelFormat::Name);
        assert_eq!(d.split.as_ref().unwrap().partitions.len(), 3);
        assert_eq!(d.split.as_ref().unwrap().mode, SplitMode::Stratified);
    }

    #[test]
    fn dedup_key_is_mandatory() {
        let raw = DRUG_REVIEWS.replace(r#""dedup_key": "text","#, "");
        assert!(matches!(DatasetDescriptor::from_json_str(&raw), Err(PipelineError::Json(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = DRUG_REVIEWS.replace(r#""dedup_key": "text","#, r#""dedup_key": "text", "dedupe": true,"#);
        assert!(DatasetDescriptor::from_json_str(&raw).is_err());
    }

    #[test]
    fn inconsistent_policies_are_config_errors() {
        let no_label = DRUG_REVIEWS.replace(r#""label": {"policy": {"kind": "strict_10pt"}},"#, "");
        assert!(matches!(DatasetDescriptor::from_json_str(&no_label), Err(PipelineError::Config(_))));

        let bad_ratio = DRUG_REVIEWS.replace(r#"["test", 0.1]"#, r#"["test", 0.3]"#);
        assert!(matches!(DatasetDescriptor::from_json_str(&bad_ratio), Err(PipelineError::Config(_))));

        let balanced = DRUG_REVIEWS.replace(r#""seed": 42}"#, r#""seed": 42, "mode": "balanced_sources"}"#);
        assert!(matches!(DatasetDescriptor::from_json_str(&balanced), Err(PipelineError::Config(_))));
    }
}
