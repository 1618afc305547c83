//! Stage 1: data transformation
//!
//! Each step consumes the record produced by the previous one and returns a
//! new record, so steps can be exercised in isolation:
//!
//! `RawDataset -> Preprocessed -> Selected -> Partitions -> artifacts on disk`

use crate::dataset::{ColumnValues, RawDataset};
use crate::encoding::{EncodingTable, LabelEncoder};
use crate::scaler::StandardScaler;
use crate::selection::{project, select_k_best, FeatureScore};
use crate::split::{shuffle_split, stratified_split};
use mlops_core::{
    names, ArtifactBatch, ArtifactStore, FeatureMatrix, Labels, PipelineError, ProcessingConfig,
    Result,
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Encoded features and target
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    pub features: FeatureMatrix,
    pub target: Labels,
    pub encoders: EncodingTable,
}

/// Features narrowed to the top-K columns, in rank order
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub features: FeatureMatrix,
    pub target: Labels,
    pub encoders: EncodingTable,
    pub scores: Vec<FeatureScore>,
}

impl Selected {
    pub fn feature_names(&self) -> &[String] {
        &self.features.columns
    }
}

/// Scaled, co-indexed train/test partitions plus the fitted scaler
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Labels,
    pub y_test: Labels,
    pub scaler: StandardScaler,
    pub encoders: EncodingTable,
}

/// Drop the id column, encode the target and every categorical feature
pub fn preprocess(raw: RawDataset, config: &ProcessingConfig) -> Result<Preprocessed> {
    let n_rows = raw.n_rows();
    if n_rows == 0 {
        return Err(PipelineError::Preprocessing("dataset has no rows".to_string()));
    }
    for required in [&config.id_column, &config.target_column] {
        if raw.column(required).is_none() {
            return Err(PipelineError::Preprocessing(format!(
                "expected column {required:?} not found; columns are {:?}",
                raw.column_names()
            )));
        }
    }

    let mut encoders = EncodingTable::new();
    let mut target = Labels::new();
    let mut feature_names = Vec::new();
    let mut feature_columns: Vec<Vec<f64>> = Vec::new();

    for column in raw.columns {
        if column.name == config.id_column {
            continue;
        }
        if let Some(row) = column.values.first_missing() {
            return Err(PipelineError::Preprocessing(format!(
                "numeric column {:?} has a missing or non-finite value at row {}",
                column.name,
                row + 1
            )));
        }
        if column.name == config.target_column {
            if let ColumnValues::Categorical(values) = &column.values {
                if let Some(row) = values.iter().position(String::is_empty) {
                    return Err(PipelineError::Preprocessing(format!(
                        "target {:?} is empty at row {}",
                        column.name,
                        row + 1
                    )));
                }
            }
            let (encoder, codes) = LabelEncoder::fit_transform(&column.values)?;
            debug!("Target {} has {} classes", column.name, encoder.n_classes());
            target = codes;
            encoders.insert(column.name, encoder);
            continue;
        }

        let values = match &column.values {
            ColumnValues::Numeric(v) => v.clone(),
            ColumnValues::Categorical(_) => {
                let (encoder, codes) = LabelEncoder::fit_transform(&column.values)?;
                debug!("Encoded {} into {} codes", column.name, encoder.n_classes());
                encoders.insert(column.name.clone(), encoder);
                codes.into_iter().map(f64::from).collect()
            }
        };
        feature_names.push(column.name);
        feature_columns.push(values);
    }

    let rows = (0..n_rows)
        .map(|r| feature_columns.iter().map(|col| col[r]).collect())
        .collect();

    info!(
        "Basic data processing completed: {} rows, {} features, {} encoders",
        n_rows,
        feature_names.len(),
        encoders.len()
    );

    Ok(Preprocessed {
        features: FeatureMatrix::new(feature_names, rows),
        target,
        encoders,
    })
}

/// Score features on an unstratified train split and keep the top `k`
pub fn select_features(pre: Preprocessed, config: &ProcessingConfig) -> Result<Selected> {
    let split = shuffle_split(pre.features.n_rows(), config.test_size, config.seed)
        .map_err(|e| PipelineError::FeatureSelection(e.to_string()))?;

    let x_train = pre.features.take_rows(&split.train);
    let y_train: Labels = split.train.iter().map(|&i| pre.target[i]).collect();

    let scores = select_k_best(&x_train, &y_train, config.top_k)?;
    let selected: Vec<String> = scores.iter().map(|s| s.name.clone()).collect();
    for s in &scores {
        debug!("  {}: chi2 = {:?}", s.name, s.score);
    }
    info!("Selected features: {:?}", selected);

    let features = project(&pre.features, &selected)?;
    info!("Feature selection done");

    Ok(Selected {
        features,
        target: pre.target,
        encoders: pre.encoders,
        scores,
    })
}

/// Stratified split, then standardize with statistics from the train partition
pub fn split_and_scale(selected: Selected, config: &ProcessingConfig) -> Result<Partitions> {
    let split = stratified_split(&selected.target, config.test_size, config.seed)
        .map_err(|e| PipelineError::Scaling(e.to_string()))?;

    let x_train = selected.features.take_rows(&split.train);
    let x_test = selected.features.take_rows(&split.test);
    let y_train = split.train.iter().map(|&i| selected.target[i]).collect();
    let y_test = split.test.iter().map(|&i| selected.target[i]).collect();

    let scaler = StandardScaler::fit(&x_train)?;
    let x_train = scaler.transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    info!(
        "Data splitting and scaling done: {} train rows, {} test rows",
        x_train.n_rows(),
        x_test.n_rows()
    );

    Ok(Partitions {
        x_train,
        x_test,
        y_train,
        y_test,
        scaler,
        encoders: selected.encoders,
    })
}

/// Write the partitions, scaler and encoding table in one atomic batch
pub fn persist(parts: &Partitions, store: &ArtifactStore) -> Result<()> {
    let batch = ArtifactBatch::new()
        .binary(names::X_TRAIN, &parts.x_train)?
        .binary(names::X_TEST, &parts.x_test)?
        .binary(names::Y_TRAIN, &parts.y_train)?
        .binary(names::Y_TEST, &parts.y_test)?
        .binary(names::SCALER, &parts.scaler)?
        .json(names::ENCODERS, &parts.encoders)?;
    store.commit(batch)?;
    info!("Saving data completed");
    Ok(())
}

/// Stage 1 entry point
#[derive(Debug, Clone)]
pub struct DataProcessing {
    input: PathBuf,
    store: ArtifactStore,
    config: ProcessingConfig,
}

impl DataProcessing {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, config: ProcessingConfig) -> Self {
        let processing = Self {
            input: input.into(),
            store: ArtifactStore::new(output),
            config,
        };
        info!("Data processing initialized");
        processing
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Load, preprocess, select, split and scale without touching the destination
    pub fn transform(&self) -> Result<Partitions> {
        let raw = RawDataset::from_csv(&self.input).map_err(PipelineError::logged)?;
        let pre = preprocess(raw, &self.config).map_err(PipelineError::logged)?;
        let selected = select_features(pre, &self.config).map_err(PipelineError::logged)?;
        split_and_scale(selected, &self.config).map_err(PipelineError::logged)
    }

    /// Run every step in order; the first failure aborts the rest
    pub fn run(&self) -> Result<Partitions> {
        let parts = self.transform()?;
        persist(&parts, &self.store).map_err(PipelineError::logged)?;
        info!("Data processing pipeline executed successfully");
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlops_core::ErrorKind;

    fn config() -> ProcessingConfig {
        ProcessingConfig {
            id_column: "id".to_string(),
            target_column: "label".to_string(),
            test_size: 0.2,
            seed: 42,
            top_k: 2,
        }
    }

    fn raw(csv: &str) -> RawDataset {
        RawDataset::from_reader(csv.as_bytes()).unwrap()
    }

    fn sample() -> RawDataset {
        let mut csv = String::from("id,x,y,z,color,label\n");
        for i in 0..20 {
            let label = if i % 2 == 0 { "pos" } else { "neg" };
            let color = ["red", "green", "blue"][i % 3];
            csv.push_str(&format!("{i},{},{},{},{color},{label}\n", i % 2 * 10, i, 5));
        }
        raw(&csv)
    }

    #[test]
    fn test_preprocess_drops_id_and_encodes() {
        let pre = preprocess(sample(), &config()).unwrap();
        assert_eq!(pre.features.columns, vec!["x", "y", "z", "color"]);
        assert_eq!(pre.target.len(), 20);
        // "neg" < "pos"
        assert_eq!(pre.target[0], 1);
        assert_eq!(pre.target[1], 0);
        assert!(pre.encoders.contains_key("label"));
        assert!(pre.encoders.contains_key("color"));
        assert!(!pre.encoders.contains_key("x"));
    }

    #[test]
    fn test_missing_id_column() {
        let err = preprocess(raw("x,label\n1,a\n2,b\n"), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }

    #[test]
    fn test_missing_target_column() {
        let err = preprocess(raw("id,x\n1,1\n2,2\n"), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }

    #[test]
    fn test_empty_dataset() {
        let err = preprocess(raw("id,x,label\n"), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }

    #[test]
    fn test_empty_target_cell() {
        let err = preprocess(raw("id,x,label\n1,1,a\n2,2,\n"), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }

    #[test]
    fn test_blank_numeric_feature_is_preprocessing_error() {
        let err = preprocess(raw("id,size,label\n1,9,a\n2,,b\n3,100,a\n"), &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }

    #[test]
    fn test_selection_picks_label_correlated_column() {
        let pre = preprocess(sample(), &config()).unwrap();
        let selected = select_features(pre, &config()).unwrap();
        assert_eq!(selected.feature_names().len(), 2);
        assert_eq!(selected.feature_names()[0], "x");
        assert_eq!(selected.features.n_rows(), 20);
    }

    #[test]
    fn test_split_and_scale_shapes() {
        let pre = preprocess(sample(), &config()).unwrap();
        let selected = select_features(pre, &config()).unwrap();
        let parts = split_and_scale(selected, &config()).unwrap();

        assert_eq!(parts.x_train.n_rows(), 16);
        assert_eq!(parts.x_test.n_rows(), 4);
        assert_eq!(parts.y_train.len(), 16);
        assert_eq!(parts.y_test.len(), 4);
        assert_eq!(parts.y_test.iter().filter(|&&y| y == 1).count(), 2);
        assert_eq!(parts.scaler.n_samples_seen, 16);
    }
}
