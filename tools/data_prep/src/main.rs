use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use logdata::{read_jsonl, write_instance, Instance};

/// Shuffles a labelled JSON-lines file and splits it into train/dev/test.
#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    input: PathBuf,
    #[arg(short, long)]
    output_dir: PathBuf,
    #[arg(long, default_value_t = 0.6)]
    train_ratio: f64,
    #[arg(long, default_value_t = 0.1)]
    dev_ratio: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Sizes of the train and dev parts; the rest is test.
fn split_sizes(n: usize, train_ratio: f64, dev_ratio: f64) -> (usize, usize) {
    let train = ((n as f64) * train_ratio).floor() as usize;
    let dev = ((n as f64) * dev_ratio).floor() as usize;
    (train.min(n), dev.min(n - train.min(n)))
}

fn write_split(path: PathBuf, instances: &[Instance]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(&path)?);
    for inst in instances {
        write_instance(&mut writer, inst)?;
    }
    writer.flush()?;
    let anomalies = instances.iter().filter(|i| !i.is_normal()).count();
    println!("Wrote {:?}: {} instances, {} anomalous", path, instances.len(), anomalies);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.train_ratio < 0.0 || cli.dev_ratio < 0.0 || cli.train_ratio + cli.dev_ratio > 1.0 {
        bail!("ratios must be non-negative and sum to at most 1");
    }

    if !cli.output_dir.exists() {
        std::fs::create_dir_all(&cli.output_dir)?;
    }

    let mut instances = read_jsonl(&cli.input)?;
    let mut rng = StdRng::seed_from_u64(cli.seed);
    instances.shuffle(&mut rng);

    let (n_train, n_dev) = split_sizes(instances.len(), cli.train_ratio, cli.dev_ratio);
    let (train, rest) = instances.split_at(n_train);
    let (dev, test) = rest.split_at(n_dev);

    write_split(cli.output_dir.join("train.jsonl"), train)?;
    write_split(cli.output_dir.join("dev.jsonl"), dev)?;
    write_split(cli.output_dir.join("test.jsonl"), test)?;
    Ok(())
}
