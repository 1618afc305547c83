//! Data transformation stage
//!
//! Turns the raw survival dataset into scaled, feature-selected train/test
//! partitions and persists them for the model training stage.

pub mod dataset;
pub mod encoding;
pub mod pipeline;
pub mod scaler;
pub mod selection;
pub mod split;

pub use dataset::{Column, ColumnValues, RawDataset};
pub use encoding::{EncodingTable, LabelEncoder};
pub use pipeline::{
    persist, preprocess, select_features, split_and_scale, DataProcessing, Partitions,
    Preprocessed, Selected,
};
pub use scaler::StandardScaler;
pub use selection::{chi2_scores, rank_features, select_k_best, FeatureScore};
pub use split::{partition_sizes, shuffle_split, stratified_split, SplitError, SplitIndices};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
