//! Tribo Trainer CLI
//!
//! Deterministic offline trainer for the tribology prediction pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use tribo_core::manifest_path_for;
use tribo_trainer::{train_and_save, TrainingParams};

#[derive(Parser, Debug)]
#[command(name = "tribo-train")]
#[command(author = "Tribo Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the lubricant tribology random forest", long_about = None)]
struct Args {
    /// Input CSV dataset (feature columns, four target columns, optional Sample ID).
    /// Export the training spreadsheet to CSV with a header row first.
    #[arg(short, long)]
    input: PathBuf,

    /// Artifact path; the manifest is written next to it
    #[arg(short, long, default_value = "trained_rf_model.json")]
    output: PathBuf,

    /// Trees per target
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Share of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    test_fraction: f64,

    /// Seed for the holdout split and bootstrap sampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Tribo Random Forest Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("Data file: {}", args.input.display());
    info!("Artifact: {}", args.output.display());

    let params = TrainingParams {
        n_estimators: args.trees,
        max_depth: args.max_depth,
        min_samples_split: args.min_samples_split,
        min_samples_leaf: args.min_samples_leaf,
        test_fraction: args.test_fraction,
        seed: args.seed,
    };

    info!("Training configuration:");
    info!("  Trees per target: {}", params.n_estimators);
    match params.max_depth {
        Some(depth) => info!("  Max depth: {depth}"),
        None => info!("  Max depth: unlimited"),
    }
    info!("  Min samples split/leaf: {}/{}", params.min_samples_split, params.min_samples_leaf);
    info!("  Test fraction: {}", params.test_fraction);
    info!("  Seed: {}", params.seed);

    let outcome = train_and_save(&args.input, &args.output, params).context("Training failed")?;

    debug!("Feature ranges:");
    for (name, min, max) in &outcome.feature_ranges {
        debug!("  {name}: min={min}, max={max}");
    }

    info!("✓ Training completed successfully");
    info!("  Model: {}", args.output.display());
    info!("  Manifest: {}", manifest_path_for(&args.output).display());
    info!("  Hash: {}", outcome.manifest.model_hash);
    info!("  Features: {}", outcome.manifest.feature_order.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["tribo-train", "--input", "data.csv"]).unwrap();
        assert_eq!(args.output, PathBuf::from("trained_rf_model.json"));
        assert_eq!(args.trees, 100);
        assert_eq!(args.max_depth, None);
        assert_eq!(args.seed, 42);
        assert!(!args.verbose);

        assert!(Args::try_parse_from(["tribo-train"]).is_err());
    }

    #[test]
    fn test_input_help_mentions_csv_export() {
        let command = Args::command();
        let input = command
            .get_arguments()
            .find(|arg| arg.get_id() == "input")
            .unwrap();
        let help = input.get_long_help().or(input.get_help()).unwrap().to_string();
        assert!(help.contains("Export the training spreadsheet to CSV"));
    }
}
