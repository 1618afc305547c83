//! Model training stage CLI
//!
//! Fits the classifier on the processed partitions and logs test metrics.

use anyhow::{Context, Result};
use clap::Parser;
use mlops_core::{logging::init_tracing, PipelineConfig};
use mlops_model_training::ModelTraining;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "model-training")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage 2: fit the gradient boosted classifier and evaluate it", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Processed partitions directory (overrides paths.processed_dir)
    #[arg(short, long)]
    processed: Option<PathBuf>,

    /// Model output directory (overrides paths.model_dir)
    #[arg(short, long)]
    models: Option<PathBuf>,

    /// Number of boosting stages (overrides training.n_estimators)
    #[arg(long)]
    trees: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(processed) = args.processed {
        config.paths.processed_dir = processed;
    }
    if let Some(models) = args.models {
        config.paths.model_dir = models;
    }
    if let Some(trees) = args.trees {
        config.training.n_estimators = trees;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.verbose);
    info!("Model training v{}", env!("CARGO_PKG_VERSION"));

    let training = ModelTraining::new(
        &config.paths.processed_dir,
        &config.paths.model_dir,
        config.training.clone(),
    );
    training.run().context("Failed to train model")?;

    Ok(())
}
