//! MLOps pipeline command line interface
//!
//! Runs the data processing and model training stages, alone or in
//! sequence, and compiles the workflow description for a container
//! scheduler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mlops_cli::{compile_workflow, run_pipeline};
use mlops_core::{logging::init_tracing, PipelineConfig};
use mlops_data_processing::DataProcessing;
use mlops_model_training::ModelTraining;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "mlops-pipeline")]
#[command(about = "Survival prediction training pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run data processing, then model training
    Run,
    /// Run the data processing stage only
    Process {
        /// Raw CSV dataset
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output directory for partitions and scaler
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the model training stage only
    Train {
        /// Processed partitions directory
        #[arg(short, long)]
        processed: Option<PathBuf>,
        /// Model output directory
        #[arg(short, long)]
        models: Option<PathBuf>,
    },
    /// Write the workflow description as YAML
    Compile {
        #[arg(short, long, default_value = "mlops_pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging, cli.verbose);
    info!("MLOps pipeline v{}", mlops_cli::VERSION);

    match cli.command {
        Commands::Run => {
            let outcome = run_pipeline(&config).context("Pipeline failed")?;
            println!("{}", outcome.report);
        }
        Commands::Process { input, output } => {
            if let Some(input) = input {
                config.paths.raw_data = input;
            }
            if let Some(output) = output {
                config.paths.processed_dir = output;
            }
            config.validate().context("Invalid configuration")?;
            DataProcessing::new(
                &config.paths.raw_data,
                &config.paths.processed_dir,
                config.processing.clone(),
            )
            .run()
            .context("Failed to process data")?;
        }
        Commands::Train { processed, models } => {
            if let Some(processed) = processed {
                config.paths.processed_dir = processed;
            }
            if let Some(models) = models {
                config.paths.model_dir = models;
            }
            config.validate().context("Invalid configuration")?;
            let report = ModelTraining::new(
                &config.paths.processed_dir,
                &config.paths.model_dir,
                config.training.clone(),
            )
            .run()
            .context("Failed to train model")?;
            println!("{report}");
        }
        Commands::Compile { output } => {
            compile_workflow(&config.workflow, &output)
                .with_context(|| format!("Failed to compile workflow to {}", output.display()))?;
            println!("Workflow written to {}", output.display());
        }
    }

    Ok(())
}
