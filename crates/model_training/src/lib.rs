//! Model fit and evaluation stage
//!
//! Trains a deterministic gradient boosted tree classifier on the processed
//! partitions and reports accuracy, precision, recall and F1 on the test set.

pub mod cart;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod trainer;
pub mod tree;

pub use cart::{CartBuilder, TreeConfig};
pub use metrics::{evaluate, EvaluationReport};
pub use model::{GradientBoostingModel, ModelMetadata};
pub use pipeline::{ModelTraining, TrainingData};
pub use trainer::{GbdtConfig, GbdtTrainer};
pub use tree::{Node, Tree};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
