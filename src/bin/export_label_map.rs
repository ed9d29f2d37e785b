/*
cargo run --bin export_label_map -- --policy sentiment_3 -o data/processed/label_map.json

cargo run --bin export_label_map -- --labels anatomy,pharmacology,surgery -o data/processed/medmcqa_labels.json
*/

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use corpus_prep::taxonomy::LabelPolicy;

#[derive(Parser, Debug)]
#[command(version, about = "Write the name -> class id map of a label policy")]
struct Args {
    // built-in policy name, e.g. sentiment_3
    #[arg(long, conflicts_with = "labels")]
    policy: Option<String>,

    // categorical labels in id order
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    #[arg(short, long, default_value = "label_map.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let policy = match (&args.policy, args.labels.is_empty()) {
        (Some(name), _) => LabelPolicy::from_name(name)
            .with_context(|| format!("unknown policy {name:?}"))?,
        (None, false) => LabelPolicy::Categorical {
            labels: args.labels.clone(),
        },
        (None, true) => bail!("pass --policy or --labels"),
    };
    policy.validate()?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(
        File::create(&args.output).with_context(|| format!("creating {:?}", args.output))?,
    );
    serde_json::to_writer_pretty(&mut w, &policy.id_map())?;
    w.write_all(b"\n")?;
    w.flush()?;

    println!("{} -> {}", policy.id(), args.output.display());
    Ok(())
}
