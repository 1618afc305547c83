//! Sequential composer for the two stages

use mlops_core::{PipelineConfig, Result};
use mlops_data_processing::DataProcessing;
use mlops_model_training::{EvaluationReport, ModelTraining};
use tracing::info;

/// What a full run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub train_rows: usize,
    pub test_rows: usize,
    pub selected_features: Vec<String>,
    pub report: EvaluationReport,
}

/// Run data processing, then model training on its output.
///
/// Training never starts when processing fails, so a failed run leaves the
/// model directory untouched.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutcome> {
    config.validate()?;

    let partitions = DataProcessing::new(
        &config.paths.raw_data,
        &config.paths.processed_dir,
        config.processing.clone(),
    )
    .run()?;
    info!(
        "Stage 1 complete: {} train rows, {} test rows",
        partitions.x_train.n_rows(),
        partitions.x_test.n_rows()
    );

    let report = ModelTraining::new(
        &config.paths.processed_dir,
        &config.paths.model_dir,
        config.training.clone(),
    )
    .run()?;
    info!("Stage 2 complete: {report}");

    Ok(PipelineOutcome {
        train_rows: partitions.x_train.n_rows(),
        test_rows: partitions.x_test.n_rows(),
        selected_features: partitions.x_train.columns.clone(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlops_core::ErrorKind;

    #[test]
    fn test_missing_raw_data_stops_before_training() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = PipelineConfig::default();
        config.paths.raw_data = dir.path().join("absent.csv");
        config.paths.processed_dir = dir.path().join("processed");
        config.paths.model_dir = dir.path().join("models");

        let err = run_pipeline(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
        assert!(!config.paths.model_dir.exists());
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = PipelineConfig::default();
        config.processing.top_k = 0;
        assert!(run_pipeline(&config).is_err());
    }
}
