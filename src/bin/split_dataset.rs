/*
cargo run --bin split_dataset -- -i data/processed/drug_reviews.jsonl -o data/splits --dedup-key text

bio + finance, 50/50 by source, no validation split
cargo run --bin split_dataset -- \
    -i data/processed/bio.jsonl data/processed/financial_phrasebank.jsonl \
    -o data/splits_mixed \
    -r 0.8 -v 0 -t 0.2 \
    --dedup-key text_label \
    --balance-sources --stem mixed
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use corpus_prep::dedup::DedupKey;
use corpus_prep::report::label_distribution;
use corpus_prep::resplit::{load_inputs, resplit};
use corpus_prep::split::DEFAULT_SEED;
use corpus_prep::{logging, ExampleSink, JsonlDirSink, SplitMode, SplitPlan};

#[derive(Parser, Debug)]
#[command(version, about = "Merge, dedup and re-split canonical JSONL files into stratified partitions")]
struct Args {
    // canonical JSONL inputs
    #[arg(short, long, num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    // output directory for splits and logs
    #[arg(short, long, default_value = "data/splits")]
    output_dir: PathBuf,

    #[arg(short = 'r', long, default_value_t = 0.8)]
    train_ratio: f64,

    #[arg(short = 'v', long, default_value_t = 0.1)]
    val_ratio: f64,

    #[arg(short = 't', long, default_value_t = 0.1)]
    test_ratio: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    // text | text_label, applied across all inputs
    #[arg(long, value_name = "KEY")]
    dedup_key: DedupKey,

    // equal share per input source instead of stratifying by label
    #[arg(long)]
    balance_sources: bool,

    #[arg(long, default_value = "split")]
    stem: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut plan = SplitPlan::from_ratios(args.train_ratio, args.val_ratio, args.test_ratio, args.seed);
    if args.balance_sources {
        plan.mode = SplitMode::BalancedSources;
    }
    plan.validate().context("bad split ratios")?;

    // logging setup
    let log_path = logging::init(&args.output_dir.join("logs"), "split_dataset")?;
    info!("Starting splitter, inputs {:?}", args.input);
    info!(
        "Ratios - Train: {}, Val: {}, Test: {}, seed {}, dedup {:?}",
        args.train_ratio, args.val_ratio, args.test_ratio, args.seed, args.dedup_key
    );

    let inputs = load_inputs(&args.input).context("reading inputs")?;
    if inputs.iter().all(|i| i.examples.is_empty()) {
        bail!("no examples in {:?}", args.input);
    }
    let outcome = resplit(inputs, &plan, args.dedup_key)?;

    let mut sink = JsonlDirSink::new(&args.output_dir, &args.stem);
    let mut written = Vec::with_capacity(outcome.partitions.len());
    for p in &outcome.partitions {
        let location = sink.write_partition(p, true)?;
        info!("{}: {:?}", p.name, label_distribution(&p.examples));
        written.push((p.name.clone(), location, p.examples.len()));
    }
    sink.finish()?;

    println!("\n=== Split summary ===");
    println!("Loaded examples    : {}", outcome.loaded);
    println!("Duplicates dropped : {}", outcome.duplicates);
    if args.balance_sources {
        println!("Balance cut        : {}", outcome.balanced_cut);
    }
    for (name, location, n) in &written {
        println!("{:<18} : {} ({} examples)", name, location, n);
    }
    println!("Log file           : {}", log_path.display());
    Ok(())
}
