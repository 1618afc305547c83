//! Pipeline configuration
//!
//! Every field has a default, so a missing or partial TOML file is valid.
//! The defaults reproduce the fixed paths and hyperparameters the stages
//! were originally deployed with.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level configuration shared by both stages
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Artifact locations
    pub paths: PathsConfig,
    /// Stage 1 parameters
    pub processing: ProcessingConfig,
    /// Stage 2 hyperparameters
    pub training: TrainingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Workflow description emitted by `mlops-pipeline compile`
    pub workflow: WorkflowConfig,
}

/// Artifact locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw CSV read by stage 1
    pub raw_data: PathBuf,
    /// Shared handoff directory: written by stage 1, read by stage 2
    pub processed_dir: PathBuf,
    /// Model artifact directory written by stage 2
    pub model_dir: PathBuf,
}

/// Data transformation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Identifier column dropped before anything else
    pub id_column: String,
    /// Categorical target column
    pub target_column: String,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed shared by both train/test splits
    pub seed: u64,
    /// Number of features retained by chi-squared selection
    pub top_k: usize,
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Container workflow description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub name: String,
    pub description: String,
    /// Image both stages run in
    pub image: String,
    /// Command prefix placed before the stage binary name
    pub launcher: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("artifacts/raw/data.csv"),
            processed_dir: PathBuf::from("artifacts/processed"),
            model_dir: PathBuf::from("artifacts/models"),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            id_column: "Patient_ID".to_string(),
            target_column: "Survival_Prediction".to_string(),
            test_size: 0.2,
            seed: 42,
            top_k: 5,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: "mlops_pipeline".to_string(),
            description: "MLOps pipeline for colorectal cancer survival prediction".to_string(),
            image: "mlops-pipeline:latest".to_string(),
            launcher: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::DataLoad(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: PipelineConfig = toml::from_str(&data).map_err(|e| {
            PipelineError::DataLoad(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Persistence(format!("cannot render config: {e}")))
    }

    /// Reject parameter combinations no stage can run with
    pub fn validate(&self) -> Result<()> {
        let p = &self.processing;
        let t = &self.training;
        let mut problems = Vec::new();

        if !(p.test_size > 0.0 && p.test_size < 1.0) {
            problems.push(format!("processing.test_size must be in (0, 1), got {}", p.test_size));
        }
        if p.top_k == 0 {
            problems.push("processing.top_k must be at least 1".to_string());
        }
        if p.id_column == p.target_column {
            problems.push("processing.id_column and target_column must differ".to_string());
        }
        if t.n_estimators == 0 {
            problems.push("training.n_estimators must be at least 1".to_string());
        }
        if t.max_depth == 0 {
            problems.push("training.max_depth must be at least 1".to_string());
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            problems.push(format!("training.learning_rate must be positive, got {}", t.learning_rate));
        }
        if t.min_samples_leaf == 0 || t.min_samples_split < 2 {
            problems.push("training.min_samples_leaf >= 1 and min_samples_split >= 2 required".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::DataLoad(format!("invalid configuration: {}", problems.join("; "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_deployed_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.paths.processed_dir, PathBuf::from("artifacts/processed"));
        assert_eq!(config.processing.top_k, 5);
        assert_eq!(config.processing.seed, 42);
        assert_eq!(config.training.n_estimators, 100);
        assert_eq!(config.training.max_depth, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[processing]\ntop_k = 3\n\n[training]\nlearning_rate = 0.05")?;
        file.flush()?;

        let config = PipelineConfig::load(file.path())?;
        assert_eq!(config.processing.top_k, 3);
        assert_eq!(config.processing.target_column, "Survival_Prediction");
        assert_eq!(config.training.learning_rate, 0.05);
        assert_eq!(config.training.n_estimators, 100);
        Ok(())
    }

    #[test]
    fn toml_roundtrip() -> anyhow::Result<()> {
        let config = PipelineConfig::default();
        let parsed: PipelineConfig = toml::from_str(&config.to_toml()?)?;
        assert_eq!(parsed, config);
        Ok(())
    }

    #[test]
    fn rejects_bad_test_size() {
        let mut config = PipelineConfig::default();
        config.processing.test_size = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_same_id_and_target() {
        let mut config = PipelineConfig::default();
        config.processing.id_column = config.processing.target_column.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = PipelineConfig::load(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DataLoad);
    }
}
