//! Command-line interface: train, score, inspect and serve.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifacts::ArtifactBundle;
use crate::dataset::{batch_from_dataframe, DataLoader};
use crate::error::RiskError;
use crate::evaluation::ModelMetrics;
use crate::inference::{ScoringFacade, ServingConfig};
use crate::model::Classifier;
use crate::record::Record;
use crate::schema::FeatureKind;
use crate::training::{Trainer, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<18} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "loan-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Loan default scoring with a shared training/serving feature pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit encoders, scaler and classifier, then save the artifact bundle
    Train {
        /// Training data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Training configuration (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Artifact output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Rows sampled to infer CSV column types
        #[arg(long, default_value_t = 1000)]
        infer_schema_length: usize,
    },

    /// Score records against a saved artifact bundle
    Score {
        /// Artifact directory
        #[arg(short, long)]
        artifacts: PathBuf,

        /// JSON file holding one record or an array of records
        #[arg(short, long, conflicts_with = "json")]
        record: Option<PathBuf>,

        /// Inline JSON record
        #[arg(long)]
        json: Option<String>,

        /// Classification threshold
        #[arg(short, long, default_value = "0.5")]
        threshold: f64,
    },

    /// Show the fields and encoded columns of a saved bundle
    Schema {
        /// Artifact directory
        #[arg(short, long)]
        artifacts: PathBuf,
    },

    /// Serve a saved bundle over HTTP
    Serve {
        /// Artifact directory
        #[arg(short, long)]
        artifacts: PathBuf,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    config_path: Option<&Path>,
    output: &Path,
    infer_schema_length: usize,
) -> anyhow::Result<()> {
    section("Train");

    let config = match config_path {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new()
        .with_infer_schema_length(infer_schema_length)
        .load_auto(data_path)?;
    let batch = batch_from_dataframe(&df)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run(&format!("Fitting {} features", config.features.features.len()));
    let start = Instant::now();
    let bundle = Trainer::new(config).fit(&batch).map_err(fit_failure)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    bundle.save(output)?;
    step_done(&bundle.fit_id().to_string());

    let report = bundle.report();
    println!();
    kv("Model", &report.model);
    kv("Columns", report.n_columns);
    kv("Rows (train/test)", format!("{}/{}", report.n_train, report.n_holdout));
    if !report.dropped_columns.is_empty() {
        kv("Dropped", report.dropped_columns.join(", "));
    }
    print_metrics("Train", &report.train_metrics);
    if let Some(holdout) = &report.holdout_metrics {
        print_metrics("Holdout", holdout);
    }
    println!();
    Ok(())
}

/// Fit-time errors point at the training data rather than the tool
fn fit_failure(err: RiskError) -> anyhow::Error {
    if err.is_fit_time() {
        anyhow::anyhow!("training data cannot be fitted: {}", err)
    } else {
        err.into()
    }
}

fn print_metrics(label: &str, m: &ModelMetrics) {
    let auc = m
        .roc_auc
        .map(|a| format!("{:.4}", a))
        .unwrap_or_else(|| "n/a".to_string());
    kv(&format!("{} AUC", label), auc.bold());
    kv(
        &format!("{} confusion", label),
        format!(
            "tp={} fp={} tn={} fn={}",
            m.confusion.true_positives,
            m.confusion.false_positives,
            m.confusion.true_negatives,
            m.confusion.false_negatives
        ),
    );
}

pub fn cmd_score(
    artifacts: &Path,
    record_path: Option<&Path>,
    inline: Option<&str>,
    threshold: f64,
) -> anyhow::Result<()> {
    let text = match (record_path, inline) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(json)) => json.to_string(),
        (None, None) => anyhow::bail!("provide a record with --record or --json"),
    };
    let records = parse_records(&text)?;

    let facade = ScoringFacade::load(artifacts)?;
    section("Score");
    for (i, result) in facade.score_batch(&records).into_iter().enumerate() {
        match result {
            Ok(p) => {
                let decision = if p >= threshold { "default".red() } else { "repay".green() };
                println!("  {:>4}  {}  {}", dim(&format!("#{}", i)), format!("{:.4}", p).white().bold(), decision);
            }
            Err(e) => println!("  {:>4}  {}", dim(&format!("#{}", i)), e.to_string().red()),
        }
    }
    println!();
    Ok(())
}

/// A JSON document holding a single record object or an array of them
pub fn parse_records(text: &str) -> anyhow::Result<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => anyhow::bail!("expected a JSON object or an array of objects"),
    };
    Ok(records)
}

pub fn cmd_schema(artifacts: &Path) -> anyhow::Result<()> {
    let bundle = ArtifactBundle::load(artifacts)?;
    let schema = bundle.schema();

    section("Artifacts");
    kv("Fit id", bundle.fit_id());
    kv("Fitted at", bundle.header().fitted_at.to_rfc3339());
    kv("Fingerprint", &schema.fingerprint()[..16]);
    kv("Model", bundle.model().name());
    kv("Target", schema.target());

    section("Fields");
    for field in schema.fields() {
        let kind = match field.kind {
            FeatureKind::OneHot => "one-hot",
            FeatureKind::Binary => "binary",
            FeatureKind::Numeric => "numeric",
        };
        let detail = bundle
            .encoder()
            .encoder(&field.name)
            .map(|e| match e.kind() {
                FeatureKind::Numeric => String::new(),
                _ => format!("{} categories", e.cardinality()),
            })
            .unwrap_or_default();
        println!("  {:<24} {:<8} {}", field.name.white(), muted(kind), dim(&detail));
    }

    section(&format!("Columns ({})", schema.n_columns()));
    for (column, params) in schema.columns().iter().zip(bundle.scaler().params()) {
        println!("  {:<40} {}", column, dim(&format!("[{}, {}]", params.min, params.max)));
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(artifacts: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let facade = ScoringFacade::load(artifacts)?;
    let mut config = ServingConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    crate::server::run_server(facade, config).await
}
