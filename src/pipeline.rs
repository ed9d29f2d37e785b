use std::collections::HashSet;

use log::{debug, info, warn};

use crate::config::DatasetDescriptor;
use crate::dedup::Deduplicator;
use crate::error::{DropReason, PipelineError, Result};
use crate::example::{CanonicalExample, Partition};
use crate::extract::extract;
use crate::filter::RecordFilter;
use crate::normalize::normalize;
use crate::report::{label_distribution, OutputSummary, RunReport};
use crate::sink::ExampleSink;
use crate::source::RecordSource;
use crate::split::{balance_sources, stratified_split, stratified_subsample, SplitMode};
use crate::taxonomy::LabelMapper;

/// Partition name used when a dataset is written without a split.
pub const UNSPLIT: &str = "all";

/// A validated descriptor with its filter and label mapper compiled.
#[derive(Debug)]
pub struct Pipeline {
    descriptor: DatasetDescriptor,
    filter: RecordFilter,
    mapper: Option<LabelMapper>,
}

impl Pipeline {
    pub fn new(descriptor: DatasetDescriptor) -> Result<Self> {
        descriptor.validate()?;
        let filter = RecordFilter::from_config(&descriptor.filter)?;
        let mapper = descriptor
            .label
            .as_ref()
            .map(|l| LabelMapper::new(l.policy.clone(), l.format))
            .transpose()?;
        Ok(Self {
            descriptor,
            filter,
            mapper,
        })
    }

    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    fn tags_sources(&self) -> bool {
        self.descriptor.output.tag_source
            || self
                .descriptor
                .split
                .as_ref()
                .is_some_and(|s| s.mode == SplitMode::BalancedSources)
    }

    // every declared source exactly once, nothing else
    fn check_supplied(&self, sources: &[Box<dyn RecordSource>]) -> Result<()> {
        let d = &self.descriptor;
        let mut supplied = HashSet::new();
        for source in sources {
            let tag = source.tag();
            if !d.sources.iter().any(|s| s.tag == tag) {
                return Err(PipelineError::Config(format!("source {tag:?} is not declared in {}", d.name)));
            }
            if !supplied.insert(tag) {
                return Err(PipelineError::Config(format!("source {tag:?} supplied twice")));
            }
        }
        let missing: Vec<&str> = d
            .sources
            .iter()
            .map(|s| s.tag.as_str())
            .filter(|tag| !supplied.contains(tag))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Config(format!(
                "{}: declared sources {missing:?} were not supplied",
                d.name
            )));
        }
        Ok(())
    }

    /// Run every stage in memory. Nothing is written, so a fatal error here
    /// leaves no output behind.
    pub fn process(&self, sources: &mut [Box<dyn RecordSource>]) -> Result<(Vec<Partition>, RunReport)> {
        self.check_supplied(sources)?;
        let d = &self.descriptor;
        let mut report = RunReport::new(d.name.clone());
        report.policy = self.mapper.as_ref().map(|m| m.policy().id());

        let mut dedup = Deduplicator::new(d.dedup_key);
        let mut accepted: Vec<CanonicalExample> = Vec::new();
        let tag_source = self.tags_sources();

        for source in sources.iter_mut() {
            let tag = source.tag().to_string();
            let declared = d
                .sources
                .iter()
                .find(|s| s.tag == tag)
                .ok_or_else(|| PipelineError::Config(format!("source {tag:?} is not declared in {}", d.name)))?;

            let batch = source.read()?;
            let seen = batch.records.len() + batch.malformed;
            report.input_records += seen;
            report.per_source.push((tag.clone(), seen));
            report.add_drops(DropReason::MalformedLine, batch.malformed);

            if !batch.records.is_empty() && !batch.records.iter().any(|r| declared.fields.has_text_field(r)) {
                return Err(PipelineError::SchemaMismatch {
                    source_tag: tag,
                    fields: declared.fields.text_fields.clone(),
                });
            }

            let before = accepted.len();
            for record in &batch.records {
                let Some(extracted) = extract(record, &declared.fields) else {
                    report.drop_record(DropReason::MissingRequiredField);
                    continue;
                };
                let text = normalize(&extracted.text);
                if let Err(reason) = self.filter.check(&text, extracted.raw_label.as_ref()) {
                    report.drop_record(reason);
                    continue;
                }

                let label = match (&self.mapper, extracted.raw_label.as_ref()) {
                    (None, _) => None,
                    (Some(_), None) => {
                        report.drop_record(DropReason::MissingLabel);
                        continue;
                    }
                    (Some(mapper), Some(raw)) => match mapper.map(raw) {
                        Some(label) => Some(label),
                        None => {
                            debug!("{tag}: unmappable label {raw}");
                            report.drop_record(DropReason::AmbiguousLabel);
                            continue;
                        }
                    },
                };

                let mut example = CanonicalExample::new(text, label);
                if tag_source {
                    example = example.with_source(tag.clone());
                }
                if !dedup.admit(&example) {
                    report.drop_record(DropReason::Duplicate);
                    continue;
                }
                accepted.push(example);
            }
            info!("{tag}: accepted {} of {seen}", accepted.len() - before);
        }

        if accepted.is_empty() {
            warn!("{}: no records survived filtering", d.name);
        }

        if let Some(sub) = &d.subsample {
            let (kept, cut) = stratified_subsample(accepted, sub.max_total, sub.seed);
            report.add_drops(DropReason::Subsampled, cut);
            accepted = kept;
        }

        let partitions = match &d.split {
            None => vec![Partition::new(UNSPLIT, accepted)],
            Some(plan) if plan.mode == SplitMode::BalancedSources => {
                let (balanced, cut) = balance_sources(accepted, plan.seed)?;
                report.add_drops(DropReason::Subsampled, cut);
                stratified_split(balanced, plan, |e| e.source_key())?
            }
            Some(plan) => stratified_split(accepted, plan, |e| e.label_key())?,
        };

        report.accepted = partitions.iter().map(|p| p.examples.len()).sum();
        report.label_distribution = label_distribution(partitions.iter().flat_map(|p| &p.examples));
        Ok((partitions, report))
    }

    /// `process`, then hand every partition to `sink`.
    pub fn run(&self, sources: &mut [Box<dyn RecordSource>], sink: &mut dyn ExampleSink) -> Result<RunReport> {
        let (partitions, mut report) = self.process(sources)?;
        let split = self.descriptor.split.is_some();
        for partition in &partitions {
            let location = sink.write_partition(partition, split)?;
            report.outputs.push(OutputSummary {
                partition: partition.name.clone(),
                location,
                count: partition.examples.len(),
                labels: label_distribution(&partition.examples),
            });
        }
        sink.finish()?;
        report.log();
        Ok(report)
    }
}
