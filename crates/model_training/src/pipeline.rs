//! Stage 2: model fit and evaluation
//!
//! Reads the four partitions written by the data processing stage, fits the
//! classifier on the train partition, persists it, then scores the held-out
//! test partition.

use crate::metrics::{self, EvaluationReport};
use crate::model::GradientBoostingModel;
use crate::trainer::{GbdtConfig, GbdtTrainer};
use mlops_core::{
    artifacts, names, ArtifactBatch, ArtifactStore, FeatureMatrix, Labels, PipelineError, Result,
    TrainingConfig,
};
use std::path::PathBuf;
use tracing::info;

/// The four co-indexed partitions, loaded once and read-only afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Labels,
    pub y_test: Labels,
}

/// Stage 2 entry point
#[derive(Debug, Clone)]
pub struct ModelTraining {
    processed: ArtifactStore,
    models: ArtifactStore,
    config: GbdtConfig,
}

impl ModelTraining {
    pub fn new(
        processed_dir: impl Into<PathBuf>,
        model_dir: impl Into<PathBuf>,
        config: TrainingConfig,
    ) -> Self {
        let training = Self {
            processed: ArtifactStore::new(processed_dir),
            models: ArtifactStore::new(model_dir),
            config: config.into(),
        };
        info!("Model training initialized");
        training
    }

    pub fn model_store(&self) -> &ArtifactStore {
        &self.models
    }

    /// Load the partitions written by stage 1
    pub fn load_data(&self) -> Result<TrainingData> {
        let data = TrainingData {
            x_train: self.processed.load(names::X_TRAIN)?,
            x_test: self.processed.load(names::X_TEST)?,
            y_train: self.processed.load(names::Y_TRAIN)?,
            y_test: self.processed.load(names::Y_TEST)?,
        };
        info!(
            "Data loaded for model: {} train rows, {} test rows, {} features",
            data.x_train.n_rows(),
            data.x_test.n_rows(),
            data.x_train.n_cols()
        );
        Ok(data)
    }

    /// Fit on the train partition and persist the model with its digest
    pub fn train(&self, data: &TrainingData) -> Result<GradientBoostingModel> {
        let model = GbdtTrainer::new(self.config.clone()).train(&data.x_train, &data.y_train)?;

        let bytes = artifacts::to_bytes(&model)?;
        let digest = artifacts::digest_hex(&bytes);
        self.models.commit(
            ArtifactBatch::new()
                .raw(names::MODEL, bytes)
                .raw(names::MODEL_HASH, digest.clone().into_bytes()),
        )?;

        info!("Model trained and saved ({})", digest);
        Ok(model)
    }

    /// Score the test partition and log the four metrics
    pub fn evaluate(&self, model: &GradientBoostingModel, data: &TrainingData) -> Result<EvaluationReport> {
        let y_pred = model.predict(&data.x_test)?;
        let report = metrics::evaluate(&data.y_test, &y_pred)?;

        info!(
            accuracy = report.accuracy,
            precision = report.precision,
            recall = report.recall,
            f1 = report.f1,
            support = report.support,
            "{report}"
        );
        info!("Model evaluation done");
        Ok(report)
    }

    /// Read back a persisted model, checking it against its digest
    pub fn load_model(&self) -> Result<GradientBoostingModel> {
        let bytes = self.models.read(names::MODEL)?;
        let expected = self.models.read(names::MODEL_HASH)?;
        let actual = artifacts::digest_hex(&bytes);
        if String::from_utf8_lossy(&expected).trim() != actual {
            return Err(PipelineError::DataLoad(format!(
                "{} does not match {}",
                names::MODEL,
                names::MODEL_HASH
            )));
        }
        artifacts::from_bytes(&bytes)
    }

    /// Load, train and evaluate in order; the first failure aborts the rest
    pub fn run(&self) -> Result<EvaluationReport> {
        let data = self.load_data().map_err(PipelineError::logged)?;
        let model = self.train(&data).map_err(PipelineError::logged)?;
        self.evaluate(&model, &data).map_err(PipelineError::logged)
    }
}
