//! Tickcast CLI: observation, evaluation, training and prediction commands.
//!
//! Commands:
//! - `observe`: assemble one observation from the live feeds and record it
//! - `evaluate`: walk-forward scores over the recorded history
//! - `train`: chronological 70/30 fit, optionally saved to the task's slot
//! - `predict`: load the saved model and predict from a fresh observation
//! - `sentiment`: classify texts with the hosted sentiment model
//! - `synth`: write a deterministic synthetic history for offline work

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use tickcast_core::config::{AppConfig, LoggingConfig, StorageConfig};
use tickcast_core::logging::init_logging;
use tickcast_core::sentiment::{dominant, SentimentClient, SentimentOptions, SentimentRequest};
use tickcast_core::synthetic::generate_history;
use tickcast_core::{record_observation, ObservationAssembler, ObservationHistory, SourceSet};
use tickcast_runner::{evaluate_with, mean_score, Dataset, Task, Trainer, WalkForwardConfig};

#[derive(Parser)]
#[command(
    name = "tickcast",
    about = "Tickcast: multi-source market snapshots and walk-forward baselines"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "tickcast.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble one observation from all feeds, print it and append it to history.
    Observe {
        /// Print only; do not append to history.
        #[arg(long, default_value_t = false)]
        no_append: bool,
    },
    /// Walk-forward evaluation over the recorded history.
    Evaluate {
        /// regression (lr) or classification (lgr).
        #[arg(long)]
        task: Task,

        /// Number of folds.
        #[arg(long, default_value_t = 5)]
        folds: usize,

        /// Smallest acceptable first training window.
        #[arg(long, default_value_t = 1)]
        min_train_rows: usize,

        /// History CSV. Defaults to the configured history path.
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Fit on the oldest 70% of the history and score on the newest 30%.
    Train {
        #[arg(long)]
        task: Task,

        /// Do not write the fitted model to its slot.
        #[arg(long, default_value_t = false)]
        no_save: bool,

        /// History CSV. Defaults to the configured history path.
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Predict from a fresh observation with the saved model.
    Predict {
        #[arg(long)]
        task: Task,
    },
    /// Classify texts with the hosted sentiment model.
    Sentiment {
        #[arg(required = true)]
        texts: Vec<String>,

        /// Ask the model not to serve cached results.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Fail instead of waiting while the model loads.
        #[arg(long, default_value_t = false)]
        no_wait: bool,
    },
    /// Write a synthetic history (no network, no configuration needed).
    Synth {
        #[arg(long, default_value_t = 1_000)]
        rows: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV. Defaults to the standard history path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn needs_config(&self) -> bool {
        !matches!(self, Commands::Synth { .. })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        Some(
            AppConfig::from_file(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?,
        )
    } else {
        None
    };
    let filter = match &config {
        Some(c) => c.logging.filter.clone(),
        None => LoggingConfig::default().filter,
    };
    init_logging(&filter)?;

    match cli.command {
        Commands::Observe { no_append } => run_observe(loaded(&config)?, no_append),
        Commands::Evaluate {
            task,
            folds,
            min_train_rows,
            history,
        } => run_evaluate(loaded(&config)?, task, folds, min_train_rows, history),
        Commands::Train {
            task,
            no_save,
            history,
        } => run_train(loaded(&config)?, task, !no_save, history),
        Commands::Predict { task } => run_predict(loaded(&config)?, task),
        Commands::Sentiment {
            texts,
            no_cache,
            no_wait,
        } => run_sentiment(loaded(&config)?, texts, no_cache, no_wait),
        Commands::Synth { rows, seed, output } => run_synth(rows, seed, output),
    }
}

fn loaded(config: &Option<AppConfig>) -> Result<&AppConfig> {
    config.as_ref().context("configuration was not loaded")
}

fn assembler(config: &AppConfig) -> Result<ObservationAssembler> {
    let sources = SourceSet::from_config(config)?;
    Ok(ObservationAssembler::new(sources)?)
}

fn load_dataset(config: &AppConfig, history: Option<PathBuf>, task: Task) -> Result<Dataset> {
    let path = history.unwrap_or_else(|| config.storage.history_path.clone());
    let observations = ObservationHistory::new(&path).load()?;
    if observations.is_empty() {
        bail!(
            "history {} is empty; record observations with `observe` or create one with `synth`",
            path.display()
        );
    }
    Dataset::build(&observations, task)
        .with_context(|| format!("building dataset from {}", path.display()))
}

fn run_observe(config: &AppConfig, no_append: bool) -> Result<()> {
    let assembler = assembler(config)?;
    let observation = if no_append {
        assembler.observe()?
    } else {
        let history = ObservationHistory::new(&config.storage.history_path);
        let observation = record_observation(&assembler, &history)?;
        info!(path = %history.path().display(), "observation appended");
        observation
    };
    println!("{}", serde_json::to_string_pretty(&observation)?);
    Ok(())
}

fn run_evaluate(
    config: &AppConfig,
    task: Task,
    folds: usize,
    min_train_rows: usize,
    history: Option<PathBuf>,
) -> Result<()> {
    let dataset = load_dataset(config, history, task)?;
    let wf = WalkForwardConfig {
        fold_count: folds,
        min_train_rows,
    };
    let scores = evaluate_with(&dataset, &wf)?;

    println!("Walk-forward: {task}, {} rows, {folds} folds", dataset.len());
    println!(
        "{:<5} {:>10} {:>10} {:<20} {:<20} {:>10}",
        "Fold",
        "Train",
        "Test",
        "Train end",
        "Test start",
        task.metric_name()
    );
    println!("{}", "-".repeat(80));
    for s in &scores {
        println!(
            "{:<5} {:>10} {:>10} {:<20} {:<20} {:>10.4}",
            s.fold_index,
            s.train_rows.len(),
            s.test_rows.len(),
            s.train_end.format("%Y-%m-%d %H:%M"),
            s.test_start.format("%Y-%m-%d %H:%M"),
            s.score
        );
    }
    if let Some(mean) = mean_score(&scores) {
        println!("Mean {}: {mean:.4}", task.metric_name());
    }
    Ok(())
}

fn run_train(
    config: &AppConfig,
    task: Task,
    persist: bool,
    history: Option<PathBuf>,
) -> Result<()> {
    let dataset = load_dataset(config, history, task)?;
    let trainer = Trainer::new(task, &config.storage.artifact_dir);
    let outcome = trainer.train(&dataset, persist)?;

    let (train, test) = (&outcome.split.train, &outcome.split.test);
    println!("Task: {task}");
    print_split("Train", train.rows.len(), &train.timestamps);
    print_split("Test", test.rows.len(), &test.timestamps);
    println!("Test {}: {:.4}", task.metric_name(), outcome.score);
    match &outcome.artifact {
        Some(path) => println!("Model saved to: {}", path.display()),
        None => println!("Model not saved"),
    }
    Ok(())
}

fn print_split(label: &str, rows: usize, timestamps: &[chrono::NaiveDateTime]) {
    if let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) {
        println!("{label:<5} {rows:>6} rows  {first} .. {last}");
    }
}

fn run_predict(config: &AppConfig, task: Task) -> Result<()> {
    let pipeline = Trainer::new(task, &config.storage.artifact_dir).load()?;
    let observation = assembler(config)?.observe()?;
    let prediction = pipeline.predict_observation(&observation)?;

    let report = json!({
        "timestamp": observation.timestamp,
        "open": observation.open,
        "prediction": prediction,
        "model": {
            "trained_at": pipeline.metadata.trained_at,
            "train_rows": pipeline.metadata.train_rows,
            "train_end": pipeline.metadata.train_end,
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_sentiment(
    config: &AppConfig,
    texts: Vec<String>,
    no_cache: bool,
    no_wait: bool,
) -> Result<()> {
    let client = SentimentClient::new(&config.hf, &config.http, config.proxies.as_ref())?;

    let mut request = if texts.len() == 1 {
        SentimentRequest::one(texts[0].clone())
    } else {
        SentimentRequest::many(texts.clone())
    };
    if no_cache || no_wait {
        request = request.with_options(SentimentOptions {
            use_cache: !no_cache,
            wait_for_model: !no_wait,
        });
    }

    let results = client.query(request)?;
    let report: Vec<_> = texts
        .iter()
        .zip(&results)
        .map(|(text, scores)| {
            json!({
                "text": text,
                "label": dominant(scores).map(|s| s.label),
                "scores": scores,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_synth(rows: usize, seed: u64, output: Option<PathBuf>) -> Result<()> {
    if rows == 0 {
        bail!("--rows must be positive");
    }
    let path = output.unwrap_or_else(|| StorageConfig::default().history_path);
    refuse_existing(&path)?;

    let history = ObservationHistory::new(&path);
    history.append_all(&generate_history(rows, seed))?;
    println!("Wrote {rows} synthetic observations to {}", path.display());
    Ok(())
}

fn refuse_existing(path: &Path) -> Result<()> {
    if path.exists() {
        bail!(
            "{} already exists; remove it or pass another --output",
            path.display()
        );
    }
    Ok(())
}
