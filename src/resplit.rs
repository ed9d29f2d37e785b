//! Re-splitting canonical JSONL files that were already prepared, possibly
//! by separate runs.

use std::path::PathBuf;

use log::info;

use crate::dedup::{DedupKey, Deduplicator};
use crate::error::{PipelineError, Result};
use crate::example::{CanonicalExample, Partition};
use crate::sink::read_jsonl;
use crate::split::{balance_sources, stratified_split, SplitMode, SplitPlan};

/// Rows of one input file, tagged with the file stem.
#[derive(Debug, Clone)]
pub struct ResplitInput {
    pub tag: String,
    pub examples: Vec<CanonicalExample>,
}

#[derive(Debug)]
pub struct ResplitOutcome {
    pub loaded: usize,
    pub duplicates: usize,
    pub balanced_cut: usize,
    pub partitions: Vec<Partition>,
}

pub fn load_inputs(paths: &[PathBuf]) -> Result<Vec<ResplitInput>> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let tag = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::Config(format!("no file name in {:?}", path)))?;
        let examples = read_jsonl(path)?;
        info!("Loaded {} examples from {:?}", examples.len(), path);
        inputs.push(ResplitInput { tag, examples });
    }
    Ok(inputs)
}

/// Merge `inputs`, drop duplicates across all of them (first file wins), then
/// split. In balanced mode rows without a `source` get their file's tag;
/// otherwise rows are written back in the shape they were read.
pub fn resplit(inputs: Vec<ResplitInput>, plan: &SplitPlan, dedup_key: DedupKey) -> Result<ResplitOutcome> {
    plan.validate()?;
    let balanced = plan.mode == SplitMode::BalancedSources;

    let mut dedup = Deduplicator::new(dedup_key);
    let mut merged = Vec::new();
    let (mut loaded, mut duplicates) = (0, 0);
    for input in inputs {
        loaded += input.examples.len();
        for mut ex in input.examples {
            if balanced && ex.source.is_none() {
                ex.source = Some(input.tag.clone());
            }
            if dedup.admit(&ex) {
                merged.push(ex);
            } else {
                duplicates += 1;
            }
        }
    }
    info!("merged {loaded} examples, {duplicates} duplicates dropped");

    let (partitions, balanced_cut) = if balanced {
        let (kept, cut) = balance_sources(merged, plan.seed)?;
        (stratified_split(kept, plan, |e| e.source_key())?, cut)
    } else {
        (stratified_split(merged, plan, |e| e.label_key())?, 0)
    };

    Ok(ResplitOutcome {
        loaded,
        duplicates,
        balanced_cut,
        partitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::Label;
    use std::collections::HashSet;

    fn input(tag: &str, texts: &[(&str, &str)]) -> ResplitInput {
        ResplitInput {
            tag: tag.into(),
            examples: texts
                .iter()
                .map(|(t, l)| CanonicalExample::new(*t, Some(Label::Name((*l).into()))))
                .collect(),
        }
    }

    #[test]
    fn duplicates_across_files_are_dropped_before_splitting() {
        let rows: Vec<(String, &str)> = (0..10).map(|i| (format!("dup {i}"), "positive")).collect();
        let rows: Vec<(&str, &str)> = rows.iter().map(|(t, l)| (t.as_str(), *l)).collect();
        let plan = SplitPlan::from_ratios(0.5, 0.0, 0.5, 42);

        let out = resplit(vec![input("a", &rows), input("b", &rows)], &plan, DedupKey::Text).unwrap();
        assert_eq!(out.loaded, 20);
        assert_eq!(out.duplicates, 10);

        let mut seen = HashSet::new();
        for p in &out.partitions {
            for e in &p.examples {
                assert!(seen.insert(e.text.clone()), "{} written twice", e.text);
                assert_eq!(e.source, None);
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn balanced_mode_tags_rows_with_their_file() {
        let bio = input("bio", &[("b1", "positive"), ("b2", "negative"), ("b3", "neutral"), ("b4", "neutral")]);
        let fin = input("fin", &[("f1", "positive"), ("f2", "negative")]);
        let mut plan = SplitPlan::from_ratios(0.5, 0.0, 0.5, 42);
        plan.mode = SplitMode::BalancedSources;

        let out = resplit(vec![bio, fin], &plan, DedupKey::TextLabel).unwrap();
        assert_eq!(out.balanced_cut, 2);
        for p in &out.partitions {
            assert_eq!(p.examples.len(), 2);
            let bio = p.examples.iter().filter(|e| e.source.as_deref() == Some("bio")).count();
            assert_eq!(bio, 1, "{}", p.name);
        }
    }
}
