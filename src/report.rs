use std::collections::BTreeMap;

use log::info;

use crate::error::DropReason;
use crate::example::CanonicalExample;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSummary {
    pub partition: String,
    pub location: String,
    pub count: usize,
    pub labels: BTreeMap<String, usize>,
}

/// Aggregate diagnostics for one run; printed at the end instead of failing
/// on per-record problems.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub dataset: String,
    pub policy: Option<&'static str>,
    pub input_records: usize,
    pub per_source: Vec<(String, usize)>,
    pub accepted: usize,
    pub drops: BTreeMap<DropReason, usize>,
    pub label_distribution: BTreeMap<String, usize>,
    pub outputs: Vec<OutputSummary>,
}

impl RunReport {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Default::default()
        }
    }

    pub fn drop_record(&mut self, reason: DropReason) {
        self.add_drops(reason, 1);
    }

    pub fn add_drops(&mut self, reason: DropReason, n: usize) {
        if n > 0 {
            *self.drops.entry(reason).or_default() += n;
        }
    }

    pub fn dropped(&self, reason: DropReason) -> usize {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_dropped(&self) -> usize {
        self.drops.values().sum()
    }

    pub fn log(&self) {
        info!(
            "{}: {} input, {} accepted, {} dropped",
            self.dataset,
            self.input_records,
            self.accepted,
            self.total_dropped()
        );
        for (reason, n) in &self.drops {
            info!("  dropped {n} ({reason})");
        }
        for o in &self.outputs {
            info!("  {} -> {} ({} examples)", o.partition, o.location, o.count);
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Prep summary: {} ===", self.dataset);
        if let Some(policy) = self.policy {
            println!("Label policy       : {policy}");
        }
        println!("Input records      : {}", self.input_records);
        for (tag, n) in &self.per_source {
            println!("  {:<16} {}", tag, n);
        }
        println!("Accepted           : {}", self.accepted);
        println!("Dropped            : {}", self.total_dropped());
        for reason in DropReason::ALL {
            let n = self.dropped(reason);
            if n > 0 {
                println!("  {:<20} {}", reason.describe(), n);
            }
        }
        if !self.label_distribution.is_empty() {
            println!("Label distribution :");
            for (label, n) in &self.label_distribution {
                println!("  {:<16} {}", label, n);
            }
        }
        for o in &self.outputs {
            println!("Output {:<11} : {} ({} examples)", o.partition, o.location, o.count);
        }
    }
}

pub fn label_distribution<'a, I>(examples: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a CanonicalExample>,
{
    let mut dist = BTreeMap::new();
    for ex in examples {
        if ex.label.is_some() {
            *dist.entry(ex.label_key()).or_default() += 1;
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::Label;

    #[test]
    fn tallies_drops_by_reason() {
        let mut r = RunReport::new("t");
        r.drop_record(DropReason::AmbiguousLabel);
        r.drop_record(DropReason::AmbiguousLabel);
        r.add_drops(DropReason::Duplicate, 3);
        r.add_drops(DropReason::Subsampled, 0);
        assert_eq!(r.dropped(DropReason::AmbiguousLabel), 2);
        assert_eq!(r.total_dropped(), 5);
        assert!(!r.drops.contains_key(&DropReason::Subsampled));
    }

    #[test]
    fn distribution_skips_unlabeled() {
        let examples = vec![
            CanonicalExample::new("a", Some(Label::Name("positive".into()))),
            CanonicalExample::new("b", Some(Label::Name("positive".into()))),
            CanonicalExample::new("c", Some(Label::Id(0))),
            CanonicalExample::new("d", None),
        ];
        let dist = label_distribution(&examples);
        assert_eq!(dist.get("positive"), Some(&2));
        assert_eq!(dist.get("0"), Some(&1));
        assert_eq!(dist.len(), 2);
    }
}
