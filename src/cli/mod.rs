//! caretrain CLI Module
//!
//! Command-line interface for training, prediction and model comparison.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::evaluation::compare;
use crate::model::TrainedModel;
use crate::preprocessing::ColumnKind;
use crate::training::{Algorithm, ModelType, SupervisedTrainer, TrainerConfig, TrainingRequest};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn metric_row(name: &str, value: Option<f64>) {
    if let Some(v) = value {
        println!("  {:<16} {}", muted(name), format!("{:.4}", v).white().bold());
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "caretrain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, explain and compare supervised models on tabular clinical data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on a CSV file
    Train {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Predicted column name
        #[arg(short, long)]
        target: String,

        /// Row identity column, never used as a feature
        #[arg(short, long)]
        grain: Option<String>,

        /// Task type (classification, regression)
        #[arg(long, default_value = "classification")]
        task: String,

        /// Algorithm (knn, logistic, linear, random_forest, ensemble)
        #[arg(short, long, default_value = "ensemble")]
        algorithm: String,

        /// Drop rows with missing feature values instead of imputing
        #[arg(long)]
        no_impute: bool,

        /// Columns to exclude from the features
        #[arg(long)]
        drop: Vec<String>,

        /// JSON trainer configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Score a CSV file with a trained model
    Predict {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Number of top factors per row
        #[arg(short = 'k', long, default_value = "3")]
        factors: usize,

        /// Write the warehouse layout with binding columns
        #[arg(long)]
        catalyst: bool,

        /// Output CSV file; prints a preview when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare holdout ROC curves of trained classifiers
    Compare {
        /// Trained model files
        #[arg(short, long, num_args = 1.., required = true)]
        model: Vec<PathBuf>,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

/// Read a CSV, treating the configured missing markers as nulls
pub fn load_data(path: &Path, missing_markers: &[String]) -> anyhow::Result<DataFrame> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext != "csv" {
        anyhow::bail!("Unsupported file format: {}", ext);
    }

    let null_values = NullValues::AllColumns(missing_markers.iter().map(|m| m.as_str().into()).collect());
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .map_parse_options(|opts| opts.with_null_values(Some(null_values.clone())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    Ok(df)
}

fn load_model(path: &Path) -> anyhow::Result<TrainedModel> {
    TrainedModel::load_from_file(path)
        .map_err(|e| anyhow::anyhow!("cannot load model {}: {}", path.display(), e))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    data_path: &Path,
    target: &str,
    grain: Option<&str>,
    task_type: &str,
    algorithm: &str,
    impute: bool,
    drop: &[String],
    config_path: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => TrainerConfig::from_json_file(path)?,
        None => TrainerConfig::default(),
    };
    for column in drop {
        config.preparation = config.preparation.clone().exclude_column(column.clone());
    }

    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(data_path, &config.preparation.missing_markers)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let model_type: ModelType = task_type.parse()?;
    let mut request = TrainingRequest::new(target, model_type).with_impute(impute);
    if let Some(grain) = grain {
        request = request.with_grain(grain);
    }

    step_run("Preparing");
    let trainer = SupervisedTrainer::new(&df, request, config)?;
    let prepared = trainer.prepared();
    let partition = prepared.partition()?;
    step_done(&format!(
        "{} features, {} train / {} holdout",
        prepared.n_features(),
        partition.train.len(),
        partition.holdout.len()
    ));
    let identifiers: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|c| c.as_str())
        .filter(|c| prepared.schema.column_kind(c) == Some(ColumnKind::Identifier))
        .collect();
    if !identifiers.is_empty() {
        println!("  {:<16} {}", muted("Identifiers"), identifiers.join(", ").white());
    }

    step_run(&format!("Training {}", algorithm.cyan()));
    let start = Instant::now();
    let model = if algorithm == "ensemble" {
        let outcome = trainer.ensemble()?;
        for failure in &outcome.failures {
            println!();
            println!(
                "  {} {} failed: {}",
                "!".yellow(),
                failure.algorithm.name(model_type),
                failure.error
            );
        }
        outcome.into_best()
    } else {
        let algorithm: Algorithm = algorithm.parse()?;
        trainer.train(algorithm)?
    };
    step_done(&format!("{} in {:?}", model.algorithm_name(), start.elapsed()));

    let metrics = model.metrics();
    println!();
    if model_type.is_classification() {
        metric_row("AUC", metrics.roc_auc);
        metric_row("PR AUC", metrics.pr_auc);
        metric_row("Accuracy", metrics.accuracy);
        metric_row("F1", metrics.f1_score);
    } else {
        metric_row("RMSE", metrics.rmse);
        metric_row("MAE", metrics.mae);
        metric_row("R²", metrics.r2);
    }
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", model.metadata().training_time_secs).white());

    section("Top features");
    for (name, weight) in model.ranked_feature_importances().into_iter().take(5) {
        println!("  {:<24} {}", muted(&name), format!("{:.4}", weight).white());
    }

    println!();
    model.save_to_file(output)?;
    step_ok(&format!("Saved → {}", output.display()));
    println!();

    Ok(())
}

pub fn cmd_predict(
    model_path: &Path,
    data_path: &Path,
    factors: usize,
    catalyst: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let model = load_model(model_path)?;
    step_done(model.algorithm_name());

    step_run("Loading data");
    let df = load_data(data_path, &model.schema().missing_markers)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Scoring");
    let start = Instant::now();
    let mut scored = if catalyst {
        model.create_catalyst_frame(&df, factors)?
    } else {
        model.make_predictions_with_k_factors(&df, factors)?
    };
    step_done(&format!("{:?}", start.elapsed()));

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            CsvWriter::new(&mut file).finish(&mut scored)?;
            step_ok(&format!("Saved → {}", path.display()));
        }
        None => {
            println!();
            println!("{}", scored.head(Some(10)));
        }
    }
    println!();

    Ok(())
}

pub fn cmd_compare(model_paths: &[PathBuf]) -> anyhow::Result<()> {
    section("Compare");

    let models = model_paths
        .iter()
        .map(|p| load_model(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let refs: Vec<&TrainedModel> = models.iter().collect();
    let series = compare(&refs)?;

    for (path, roc) in model_paths.iter().zip(series.iter()) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!(
            "  {:<24} {:<20} {} {}",
            name.white(),
            muted(&roc.algorithm),
            muted("AUC"),
            format!("{:.4}", roc.auc).white().bold()
        );
    }
    println!();

    Ok(())
}
