/*
cargo run --bin label_counts -- data/processed/drug_reviews_train.jsonl data/processed/drug_reviews_test.jsonl
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use corpus_prep::report::label_distribution;
use corpus_prep::sink::read_jsonl;

#[derive(Parser, Debug)]
#[command(version, about = "Print the label distribution of canonical JSONL files")]
struct Args {
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    for path in &args.files {
        let examples = read_jsonl(path).with_context(|| format!("reading {:?}", path))?;
        let dist = label_distribution(&examples);
        let unlabeled = examples.len() - dist.values().sum::<usize>();

        println!("\n{} ({} examples)", path.display(), examples.len());
        for (label, n) in &dist {
            let pct = 100.0 * *n as f64 / examples.len() as f64;
            println!("  {:<16} {:>7}  {:>5.1}%", label, n, pct);
        }
        if unlabeled > 0 {
            println!("  {:<16} {:>7}", "<unlabeled>", unlabeled);
        }
    }
    Ok(())
}
