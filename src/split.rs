use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::example::{CanonicalExample, Partition};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Preserve per-label proportions in every partition.
    #[default]
    Stratified,
    /// Down-sample the larger of two sources first, then stratify by source tag.
    BalancedSources,
}

/// Named fractions plus the seed that makes the partition reproducible.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitPlan {
    pub partitions: Vec<(String, f64)>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub mode: SplitMode,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl SplitPlan {
    /// train/val/test plan; zero-sized partitions are left out.
    pub fn from_ratios(train: f64, val: f64, test: f64, seed: u64) -> Self {
        let partitions = [("train", train), ("val", val), ("test", test)]
            .into_iter()
            .filter(|(_, f)| *f > 0.0)
            .map(|(n, f)| (n.to_string(), f))
            .collect();
        Self {
            partitions,
            seed,
            mode: SplitMode::Stratified,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(PipelineError::Config("split needs at least one partition".into()));
        }
        let mut names = std::collections::HashSet::new();
        for (name, fraction) in &self.partitions {
            if name.trim().is_empty() || !names.insert(name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "partition names must be unique and non-empty (got {name:?})"
                )));
            }
            if !(*fraction > 0.0 && *fraction <= 1.0) {
                return Err(PipelineError::Config(format!(
                    "partition {name:?} has fraction {fraction}, expected (0, 1]"
                )));
            }
        }
        let sum: f64 = self.partitions.iter().map(|(_, f)| f).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(PipelineError::Config(format!(
                "split fractions must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Split `examples` so each partition mirrors the per-stratum proportions of
/// the whole. Partitions are disjoint and together hold every input example.
///
/// Examples sharing a text (one text kept under two labels) travel together:
/// the whole group is assigned to one partition and stratified by its first
/// member, so no text appears in two partitions.
pub fn stratified_split<F>(
    examples: Vec<CanonicalExample>,
    plan: &SplitPlan,
    strata_key: F,
) -> Result<Vec<Partition>>
where
    F: Fn(&CanonicalExample) -> String,
{
    plan.validate()?;
    let k = plan.partitions.len();
    let fractions: Vec<f64> = plan.partitions.iter().map(|(_, f)| *f).collect();

    let mut strata: BTreeMap<String, Vec<Vec<CanonicalExample>>> = BTreeMap::new();
    for group in group_by_text(examples) {
        strata.entry(strata_key(&group[0])).or_default().push(group);
    }

    // fail before touching the rng so the error doesn't depend on stratum order
    for (key, groups) in &strata {
        if groups.len() < k {
            return Err(PipelineError::InsufficientSamples {
                label: key.clone(),
                members: groups.len(),
                partitions: k,
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(plan.seed);
    let mut buckets: Vec<Vec<CanonicalExample>> = vec![Vec::new(); k];

    for (key, mut groups) in strata {
        groups.shuffle(&mut rng);
        let counts = allocate(groups.len(), &fractions);
        debug!("stratum {key}: {} texts -> {:?}", groups.len(), counts);

        let mut rest = groups.into_iter();
        for (bucket, count) in buckets.iter_mut().zip(counts) {
            bucket.extend(rest.by_ref().take(count).flatten());
        }
    }

    let partitions = plan
        .partitions
        .iter()
        .zip(buckets)
        .map(|((name, _), mut bucket)| {
            bucket.shuffle(&mut rng);
            info!("partition {name}: {} examples", bucket.len());
            Partition::new(name.clone(), bucket)
        })
        .collect();
    Ok(partitions)
}

// groups in first-seen order, members in input order
fn group_by_text(examples: Vec<CanonicalExample>) -> Vec<Vec<CanonicalExample>> {
    let mut by_text: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<CanonicalExample>> = Vec::new();
    for ex in examples {
        match by_text.get(&ex.text) {
            Some(&i) => groups[i].push(ex),
            None => {
                by_text.insert(ex.text.clone(), groups.len());
                groups.push(vec![ex]);
            }
        }
    }
    groups
}

// largest-remainder apportionment; every partition gets at least one when n >= k
fn allocate(n: usize, fractions: &[f64]) -> Vec<usize> {
    let exact: Vec<f64> = fractions.iter().map(|f| n as f64 * f).collect();
    let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();

    while counts.iter().sum::<usize>() > n {
        let i = argmax(&counts);
        counts[i] -= 1;
    }

    let mut order: Vec<usize> = (0..fractions.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    let mut short = n - counts.iter().sum::<usize>();
    for &i in order.iter().cycle() {
        if short == 0 {
            break;
        }
        counts[i] += 1;
        short -= 1;
    }

    if n >= counts.len() {
        while let Some(empty) = counts.iter().position(|&c| c == 0) {
            let donor = argmax(&counts);
            counts[donor] -= 1;
            counts[empty] += 1;
        }
    }
    counts
}

fn argmax(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Equal share per label up to `max_total`, topped up at random from what is
/// left. Input order is kept. Returns the kept examples and how many were cut.
pub fn stratified_subsample(
    examples: Vec<CanonicalExample>,
    max_total: usize,
    seed: u64,
) -> (Vec<CanonicalExample>, usize) {
    let n = examples.len();
    if n <= max_total {
        return (examples, 0);
    }

    let mut by_label: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, ex) in examples.iter().enumerate() {
        by_label.entry(ex.label_key()).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = vec![false; n];
    let base = max_total / by_label.len();
    for (label, idxs) in &by_label {
        let take = idxs.len().min(base);
        for i in index::sample(&mut rng, idxs.len(), take) {
            keep[idxs[i]] = true;
        }
        debug!("subsample {label}: {take} of {}", idxs.len());
    }

    let taken = keep.iter().filter(|k| **k).count();
    let leftover: Vec<usize> = (0..n).filter(|i| !keep[*i]).collect();
    let extra = (max_total - taken).min(leftover.len());
    for i in index::sample(&mut rng, leftover.len(), extra) {
        keep[leftover[i]] = true;
    }

    let kept: Vec<CanonicalExample> = examples
        .into_iter()
        .zip(keep)
        .filter_map(|(ex, k)| k.then_some(ex))
        .collect();
    let cut = n - kept.len();
    (kept, cut)
}

/// Down-sample the larger of exactly two source tags to the size of the
/// smaller one. Input order is kept. Returns the balanced set and how many
/// examples were cut.
pub fn balance_sources(
    examples: Vec<CanonicalExample>,
    seed: u64,
) -> Result<(Vec<CanonicalExample>, usize)> {
    let mut by_source: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, ex) in examples.iter().enumerate() {
        by_source.entry(ex.source_key()).or_default().push(i);
    }
    if by_source.len() != 2 {
        return Err(PipelineError::Config(format!(
            "balanced mixing needs exactly two sources, found {:?}",
            by_source.keys().collect::<Vec<_>>()
        )));
    }

    let target = by_source.values().map(Vec::len).min().unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = vec![false; examples.len()];
    for (source, idxs) in &by_source {
        for i in index::sample(&mut rng, idxs.len(), target) {
            keep[idxs[i]] = true;
        }
        info!("balance {source}: keeping {target} of {}", idxs.len());
    }

    let n = examples.len();
    let kept: Vec<CanonicalExample> = examples
        .into_iter()
        .zip(keep)
        .filter_map(|(ex, k)| k.then_some(ex))
        .collect();
    let cut = n - kept.len();
    Ok((kept, cut))
}
