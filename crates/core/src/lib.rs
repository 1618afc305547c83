//! Shared plumbing for the two-stage MLOps pipeline
//!
//! Modules:
//! - `errors`: tagged error taxonomy every stage step returns
//! - `config`: TOML configuration with deployed defaults
//! - `logging`: tracing subscriber bootstrap
//! - `artifacts`: all-or-nothing artifact store for the stage handoff
//! - `deterministic`: seeded LCG used for every shuffle

pub mod artifacts;
pub mod config;
pub mod deterministic;
pub mod errors;
pub mod logging;

pub use artifacts::{names, ArtifactBatch, ArtifactStore, FeatureMatrix, Labels};
pub use config::{
    LoggingConfig, PathsConfig, PipelineConfig, ProcessingConfig, TrainingConfig, WorkflowConfig,
};
pub use deterministic::LcgRng;
pub use errors::{ErrorKind, PipelineError, Result};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
