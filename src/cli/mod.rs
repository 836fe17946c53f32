//! Command-line interface
//!
//! `evaluate` runs the full pipeline on a CSV file, `features` inspects the
//! derived feature table, `config` prints the default configuration.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::SeriesLoader;
use crate::features::FeatureBuilder;
use crate::pipeline::{EvaluationReport, Forecaster, ForecasterConfig};
use crate::training::{LstmConfig, ModelConfig, RidgeConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
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

fn row(key: &str, val: String) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "loadcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Power-draw forecasting with residual anomaly detection")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModelKind {
    Lstm,
    Ridge,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit, score and forecast one step ahead
    Evaluate {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured model
        #[arg(short, long, value_enum)]
        model: Option<ModelKind>,

        /// Override LSTM training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Trailing share of windows held out of training
        #[arg(long)]
        holdout: Option<f64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the derived feature table layout
    Features {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ForecasterConfig> {
    Ok(match path {
        Some(p) => ForecasterConfig::from_json_file(p)?,
        None => ForecasterConfig::default(),
    })
}

/// Apply command-line overrides on top of the file configuration
pub fn apply_overrides(
    mut config: ForecasterConfig,
    model: Option<ModelKind>,
    epochs: Option<usize>,
    holdout: Option<f64>,
) -> anyhow::Result<ForecasterConfig> {
    match (model, &config.model) {
        (Some(ModelKind::Lstm), ModelConfig::Ridge(_)) => config.model = ModelConfig::Lstm(LstmConfig::default()),
        (Some(ModelKind::Ridge), ModelConfig::Lstm(_)) => config.model = ModelConfig::Ridge(RidgeConfig::default()),
        _ => {}
    }
    if let Some(epochs) = epochs {
        match &mut config.model {
            ModelConfig::Lstm(lstm) => lstm.epochs = epochs,
            ModelConfig::Ridge(_) => anyhow::bail!("--epochs only applies to the lstm model"),
        }
    }
    if let Some(holdout) = holdout {
        config.holdout_fraction = holdout;
    }
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_evaluate(
    data_path: &Path,
    config_path: Option<&Path>,
    model: Option<ModelKind>,
    epochs: Option<usize>,
    holdout: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let config = apply_overrides(load_config(config_path)?, model, epochs, holdout)?;
    let loader = SeriesLoader::new().with_mapping(config.columns.clone());

    if json {
        let series = loader.load_csv(data_path)?;
        let report = Forecaster::new(config)?.evaluate(&series)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    section("Evaluate");

    step_run("Loading data");
    let start = Instant::now();
    let series = loader.load_csv(data_path)?;
    step_done(&format!("{} rows in {:?}", series.len(), start.elapsed()));

    step_run(&format!("Fitting {}", config.model.name().cyan()));
    let start = Instant::now();
    let mut forecaster = Forecaster::new(config)?;
    let report = forecaster.evaluate(&series)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!();
    row("Input rows", report.input_rows.to_string());
    row("Feature rows", report.feature_rows.to_string());
    row("Windows", format!("{} ({} trained)", report.windows, report.train_windows));
    row("Final loss", format!("{:.6}", report.training.final_loss));
    println!();
    println!("  {:<22} {}", muted("MAE"), format!("{:.4}", report.metrics.mae).white().bold());
    println!("  {:<22} {}", muted("RMSE"), format!("{:.4}", report.metrics.rmse).white().bold());
    row("R²", format!("{:.4}", report.metrics.r2));
    println!();
    row("Anomaly threshold", format!("{:.4}", report.anomalies.threshold));
    let count = report.anomalies.count();
    let flagged = format!("{} ({:.2}%)", count, report.anomalies.rate() * 100.0);
    println!(
        "  {:<22} {}",
        muted("Anomalies"),
        if count == 0 { flagged.white() } else { flagged.yellow() }
    );
    for point in report.anomalous_points().take(10) {
        println!(
            "    {} {}",
            dim(&point.timestamp.to_string()),
            format!("actual {:.2}  predicted {:.2}", point.actual, point.predicted).yellow()
        );
    }
    if count > 10 {
        println!("    {}", dim(&format!("… {} more", count - 10)));
    }
    println!();
    println!(
        "  {:<22} {} {}",
        muted("Next step"),
        format!("{:.4}", report.next.value).white().bold(),
        dim(&format!("at {}", report.next.timestamp))
    );
    println!();
}

pub fn cmd_features(data_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    section("Features");

    step_run("Loading data");
    let series = SeriesLoader::new().with_mapping(config.columns.clone()).load_csv(data_path)?;
    step_done(&format!("{} rows", series.len()));

    let builder = FeatureBuilder::new(config.features.clone());
    let table = builder.build(&series)?;

    println!();
    row("Input rows", series.len().to_string());
    row("Warm-up rows", config.features.warmup().to_string());
    row("Feature rows", table.n_rows().to_string());
    row("Windows", table.n_rows().saturating_sub(config.lookback).to_string());
    if let (Some(first), Some(last)) = (table.timestamps().first(), table.timestamps().last()) {
        row("Span", format!("{} → {}", first, last));
    }
    println!();

    let target = table.schema().target_index();
    for (i, name) in table.schema().columns().iter().enumerate() {
        let label = if i == target { format!("{} (target)", name).bold() } else { name.normal() };
        println!("  {:>3}  {}", dim(&i.to_string()), label);
    }
    println!();
    Ok(())
}

pub fn cmd_config() -> anyhow::Result<()> {
    println!("{}", ForecasterConfig::default().to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_override() {
        let config = apply_overrides(ForecasterConfig::default(), Some(ModelKind::Ridge), None, Some(0.2)).unwrap();
        assert_eq!(config.model.name(), "ridge");
        assert_eq!(config.holdout_fraction, 0.2);
    }

    #[test]
    fn test_epochs_override() {
        let config = apply_overrides(ForecasterConfig::default(), None, Some(3), None).unwrap();
        match config.model {
            ModelConfig::Lstm(lstm) => assert_eq!(lstm.epochs, 3),
            other => panic!("unexpected model {:?}", other),
        }
        assert!(apply_overrides(ForecasterConfig::default(), Some(ModelKind::Ridge), Some(3), None).is_err());
    }

    #[test]
    fn test_invalid_holdout_rejected() {
        assert!(apply_overrides(ForecasterConfig::default(), None, None, Some(1.5)).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["loadcast", "evaluate", "--data", "x.csv", "--model", "ridge", "--json"]).unwrap();
        match cli.command {
            Commands::Evaluate { model, json, .. } => {
                assert!(matches!(model, Some(ModelKind::Ridge)));
                assert!(json);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
