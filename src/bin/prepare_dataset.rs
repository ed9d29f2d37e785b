/*
cargo run --bin prepare_dataset -- \
    --descriptor datasets/drug_reviews.json

financial phrasebank from the hub, token from HF_TOKEN
cargo run --bin prepare_dataset -- \
    --descriptor datasets/financial_phrasebank.json \
    --cache-dir  data/raw \
    --output-dir data/processed

same descriptor, different shuffle
cargo run --bin prepare_dataset -- \
    --descriptor datasets/bio_finance_mix.json \
    --seed 7
*/

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use corpus_prep::fetch::{self, FetchOptions};
use corpus_prep::source::SourceBatch;
use corpus_prep::{logging, DatasetDescriptor, FileSource, JsonlDirSink, Pipeline, RecordSource};

// CLI parameters
#[derive(Parser, Debug)]
#[command(version, about = "Normalize, label, dedup and split one dataset descriptor")]
struct Cli {
    #[arg(long, value_name = "JSON")]
    descriptor: PathBuf,
    // overrides output.dir
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    // overrides the split and subsample seeds
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_name = "DIR", default_value = "data/raw")]
    cache_dir: PathBuf,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    // HF access token (falls back to cached creds)
    #[arg(long, env = "HF_TOKEN")]
    token: Option<String>,
}

// spinner around a source while it is being parsed
struct Spinning(FileSource);

impl RecordSource for Spinning {
    fn tag(&self) -> &str {
        self.0.tag()
    }

    fn read(&mut self) -> corpus_prep::Result<SourceBatch> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("reading {} ({})", self.0.tag(), self.0.path().display()));
        spinner.enable_steady_tick(Duration::from_millis(120));
        let batch = self.0.read();
        spinner.finish_and_clear();
        batch
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut descriptor = DatasetDescriptor::load(&cli.descriptor)
        .with_context(|| format!("loading descriptor {:?}", cli.descriptor))?;

    // logging setup
    let log_path = logging::init(&cli.log_dir, &format!("prepare_{}", descriptor.name))?;
    info!("Starting dataset preparation for {}", descriptor.name);

    if let Some(dir) = &cli.output_dir {
        descriptor.output.dir = dir.clone();
    }
    if let Some(seed) = cli.seed {
        if let Some(split) = descriptor.split.as_mut() {
            split.seed = seed;
        }
        if let Some(sub) = descriptor.subsample.as_mut() {
            sub.seed = seed;
        }
        info!("seed overridden to {seed}");
    }

    // resolve every source before reading any of them
    let opts = FetchOptions {
        cache_dir: cli.cache_dir.clone(),
        token: cli.token.clone(),
    };
    let mut sources: Vec<Box<dyn RecordSource>> = Vec::with_capacity(descriptor.sources.len());
    for s in &descriptor.sources {
        let path = fetch::resolve(&s.tag, &s.location, &opts)
            .await
            .with_context(|| format!("resolving source {}", s.tag))?;
        info!("source {} -> {:?}", s.tag, path);
        sources.push(Box::new(Spinning(FileSource::new(&s.tag, path, s.format.clone()))));
    }

    let mut sink = JsonlDirSink::new(&descriptor.output.dir, descriptor.stem());
    let pipeline = Pipeline::new(descriptor).context("invalid descriptor")?;
    let report = pipeline
        .run(&mut sources, &mut sink)
        .with_context(|| format!("preparing {}", pipeline.descriptor().name))?;

    report.print_summary();
    println!("Log file           : {}", log_path.display());
    Ok(())
}
