//! Declarative dataset preparation: read raw rows from heterogeneous sources,
//! normalize and filter the text, map ratings onto a label taxonomy,
//! deduplicate, and write reproducible stratified JSONL splits.

pub mod config;
pub mod dedup;
pub mod error;
pub mod example;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod resplit;
pub mod sink;
pub mod source;
pub mod split;
pub mod taxonomy;

pub use config::DatasetDescriptor;
pub use error::{DropReason, PipelineError, Result};
pub use example::{CanonicalExample, Label, Partition, RawRecord};
pub use pipeline::Pipeline;
pub use report::RunReport;
pub use sink::{ExampleSink, JsonlDirSink, MemorySink};
pub use source::{FileSource, InMemorySource, RecordSource};
pub use split::{SplitMode, SplitPlan};
