use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tch::Device;

use detector_core::safetensors_util::load_safetensors;
use detector_core::{AttGru, ModelConfig};
use logdata::{read_jsonl, Vocab};
use trainer::{evaluate, Trainer, TrainerConfig};

#[derive(Parser)]
#[command(about = "Train and evaluate a GRU anomaly detector over event sequences")]
struct Cli {
    /// Trainer settings (YAML); defaults are used when the file is missing.
    #[arg(long, default_value = "configs/training_config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model, select it on the dev split and score it on the test split.
    Train {
        #[arg(long)]
        train: PathBuf,
        #[arg(long)]
        dev: Option<PathBuf>,
        #[arg(long)]
        test: PathBuf,
        /// Model settings (YAML); defaults are used when the file is missing.
        #[arg(long, default_value = "configs/model_config.yaml")]
        model_config: PathBuf,
        /// Where to write per-instance predictions of the selected model.
        #[arg(long)]
        predictions: Option<PathBuf>,
    },
    /// Score a saved model on a labelled split.
    Evaluate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        predictions: Option<PathBuf>,
    },
}

/// `checkpoints/model.safetensors` -> `checkpoints/model.<suffix>`
fn sidecar(model_path: &Path, suffix: &str) -> PathBuf {
    let stem = model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    model_path.with_file_name(format!("{}.{}", stem, suffix))
}

fn load_trainer_config(path: &Path) -> Result<TrainerConfig> {
    if path.exists() {
        TrainerConfig::load(path)
    } else {
        log::info!("No trainer config at {:?}, using defaults", path);
        Ok(TrainerConfig::default())
    }
}

fn select_device(config: &TrainerConfig) -> Device {
    if config.use_cuda {
        Device::cuda_if_available()
    } else {
        Device::Cpu
    }
}

fn train(
    config: TrainerConfig,
    train_path: &Path,
    dev_path: Option<&Path>,
    test_path: &Path,
    model_config_path: &Path,
    predictions: Option<&Path>,
) -> Result<()> {
    let train_data = read_jsonl(train_path)
        .with_context(|| format!("Failed to load training data from {:?}", train_path))?;
    let dev_data = dev_path
        .map(|p| read_jsonl(p).with_context(|| format!("Failed to load dev data from {:?}", p)))
        .transpose()?;
    let test_data = read_jsonl(test_path)
        .with_context(|| format!("Failed to load test data from {:?}", test_path))?;

    let vocab = Vocab::build(&train_data, config.min_count);
    log::info!("Vocabulary size: {}", vocab.len());

    let mut model_config: ModelConfig = if model_config_path.exists() {
        let content = fs::read_to_string(model_config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        ModelConfig::default()
    };
    // Embedding table must match the vocabulary built above.
    model_config.vocab_size = vocab.len() as i64;

    tch::manual_seed(config.seed as i64);
    let device = select_device(&config);
    log::info!("Using device: {:?}", device);

    let save_path = config.save_model_path.clone();
    let model = AttGru::new(&model_config, device);
    let mut trainer = Trainer::new(model, vocab, config)?;

    let report = trainer.train(&train_data, dev_data.as_deref(), &test_data, predictions)?;

    model_config.save(sidecar(&save_path, "config.json"))?;
    trainer.vocab().save(sidecar(&save_path, "vocab.json"))?;

    let (dev_p, dev_r, dev_f, final_p, final_r, final_f) = report.as_tuple();
    println!("Dev-selected model:  P = {:.4}, R = {:.4}, F1 = {:.4}", dev_p, dev_r, dev_f);
    println!("Final model:         P = {:.4}, R = {:.4}, F1 = {:.4}", final_p, final_r, final_f);
    println!(
        "Optimizer steps: {}, dev evaluations: {}, final learning rate: {:.6}",
        report.global_step,
        report.dev_evaluations,
        trainer.lr()
    );
    Ok(())
}

fn evaluate_saved(
    config: TrainerConfig,
    data_path: &Path,
    model_path: &Path,
    threshold: Option<f64>,
    predictions: Option<&Path>,
) -> Result<()> {
    let data = read_jsonl(data_path)
        .with_context(|| format!("Failed to load data from {:?}", data_path))?;
    let model_config = ModelConfig::load(sidecar(model_path, "config.json"))?;
    let vocab_path = sidecar(model_path, "vocab.json");
    let vocab = Vocab::load(&vocab_path)
        .with_context(|| format!("Failed to load vocabulary from {:?}", vocab_path))?;

    let mut model = AttGru::new(&model_config, select_device(&config));
    load_safetensors(model.var_store_mut(), model_path)?;

    let threshold = threshold.unwrap_or(config.threshold);
    let scores = evaluate(&data, &model, &vocab, &config, predictions, threshold)?;
    println!(
        "P = {:.4}, R = {:.4}, F1 = {:.4}",
        scores.precision, scores.recall, scores.f1
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_trainer_config(&cli.config)?;

    match cli.command {
        Command::Train {
            train: train_path,
            dev,
            test,
            model_config,
            predictions,
        } => train(
            config,
            &train_path,
            dev.as_deref(),
            &test,
            &model_config,
            predictions.as_deref(),
        ),
        Command::Evaluate {
            data,
            model,
            threshold,
            predictions,
        } => evaluate_saved(config, &data, &model, threshold, predictions.as_deref()),
    }
}
