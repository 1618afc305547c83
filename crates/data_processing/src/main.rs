//! Data processing stage CLI
//!
//! Reads the raw dataset and writes the processed partitions and scaler.

use anyhow::{Context, Result};
use clap::Parser;
use mlops_core::{logging::init_tracing, PipelineConfig};
use mlops_data_processing::DataProcessing;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "data-processing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage 1: encode, select, split and scale the raw dataset", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw CSV dataset (overrides paths.raw_data)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for partitions and scaler (overrides paths.processed_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(input) = args.input {
        config.paths.raw_data = input;
    }
    if let Some(output) = args.output {
        config.paths.processed_dir = output;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.verbose);
    info!("Data processing v{}", env!("CARGO_PKG_VERSION"));

    let processing = DataProcessing::new(
        &config.paths.raw_data,
        &config.paths.processed_dir,
        config.processing.clone(),
    );
    processing.run().context("Failed to process data")?;

    Ok(())
}
