//! Fitted gradient boosted classifier
//!
//! Raw scores start from the class prior and accumulate `learning_rate`
//! times every tree's output. Two classes use a single logit column; more
//! classes keep one score column per class.

use crate::tree::Tree;
use mlops_core::{artifacts, FeatureMatrix, Labels, PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Training facts stored alongside the ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub train_rows: usize,
    /// Hex BLAKE3 digest of the ensemble parameters
    pub model_hash: String,
}

/// Boosted tree ensemble with its class mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoostingModel {
    /// Label code for each internal class index
    pub classes: Labels,
    pub feature_names: Vec<String>,
    pub learning_rate: f64,
    /// Prior raw score per score column
    pub init: Vec<f64>,
    /// One entry per boosting stage, one tree per score column
    pub stages: Vec<Vec<Tree>>,
    pub metadata: ModelMetadata,
}

/// Parameters that determine every prediction, in hashing order
#[derive(Serialize)]
struct HashedParams<'a> {
    classes: &'a [u32],
    learning_rate: f64,
    init: &'a [f64],
    stages: &'a [Vec<Tree>],
}

impl GradientBoostingModel {
    /// Digest over everything that affects predictions
    pub fn calculate_model_hash(
        classes: &[u32],
        learning_rate: f64,
        init: &[f64],
        stages: &[Vec<Tree>],
    ) -> Result<String> {
        let bytes = artifacts::to_bytes(&HashedParams {
            classes,
            learning_rate,
            init,
            stages,
        })?;
        Ok(artifacts::digest_hex(&bytes))
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn tree_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    /// Raw additive scores for one row
    pub fn decision_function(&self, row: &[f64]) -> Vec<f64> {
        let mut scores = self.init.clone();
        for stage in &self.stages {
            for (score, tree) in scores.iter_mut().zip(stage) {
                *score += self.learning_rate * tree.evaluate(row);
            }
        }
        scores
    }

    /// Class probabilities, columns ordered like `classes`
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        self.check_input(x)?;
        Ok(x.rows
            .iter()
            .map(|row| scores_to_proba(&self.decision_function(row)))
            .collect())
    }

    /// Most probable label code per row
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Labels> {
        let probas = self.predict_proba(x)?;
        Ok(probas
            .iter()
            .map(|p| self.classes[argmax(p)])
            .collect())
    }

    fn check_input(&self, x: &FeatureMatrix) -> Result<()> {
        if x.n_cols() != self.n_features() || !x.is_rectangular() {
            return Err(PipelineError::Evaluation(format!(
                "model expects {} features, got {}",
                self.n_features(),
                x.n_cols()
            )));
        }
        Ok(())
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

fn scores_to_proba(scores: &[f64]) -> Vec<f64> {
    match scores {
        [logit] => {
            let p = sigmoid(*logit);
            vec![1.0 - p, p]
        }
        _ => softmax(scores),
    }
}

/// First index of the maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn binary_model() -> GradientBoostingModel {
        let stump = Tree::new(vec![
            Node::internal(0, 0, 0.0, 1, 2),
            Node::leaf(1, -2.0),
            Node::leaf(2, 2.0),
        ]);
        GradientBoostingModel {
            classes: vec![3, 7],
            feature_names: vec!["x".into()],
            learning_rate: 0.5,
            init: vec![0.0],
            stages: vec![vec![stump.clone()], vec![stump]],
            metadata: ModelMetadata {
                version: "test".into(),
                n_estimators: 2,
                max_depth: 1,
                seed: 0,
                train_rows: 0,
                model_hash: String::new(),
            },
        }
    }

    #[test]
    fn test_decision_function_accumulates_stages() {
        let model = binary_model();
        assert_eq!(model.decision_function(&[1.0]), vec![2.0]);
        assert_eq!(model.decision_function(&[-1.0]), vec![-2.0]);
        assert_eq!(model.tree_count(), 2);
    }

    #[test]
    fn test_predict_maps_back_to_label_codes() {
        let model = binary_model();
        let x = FeatureMatrix::new(vec!["x".into()], vec![vec![-1.0], vec![1.0]]);
        assert_eq!(model.predict(&x).unwrap(), vec![3, 7]);

        let proba = model.predict_proba(&x).unwrap();
        assert!((proba[1][1] - sigmoid(2.0)).abs() < 1e-12);
        assert!((proba[0][0] + proba[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_feature_count_is_evaluation_error() {
        let model = binary_model();
        let x = FeatureMatrix::new(vec!["x".into(), "y".into()], vec![vec![1.0, 2.0]]);
        let err = model.predict(&x).unwrap_err();
        assert_eq!(err.kind(), mlops_core::ErrorKind::Evaluation);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1000.0, 1001.0, 999.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&p), 1);
    }

    #[test]
    fn test_hash_changes_with_parameters() {
        let model = binary_model();
        let h1 = GradientBoostingModel::calculate_model_hash(
            &model.classes,
            model.learning_rate,
            &model.init,
            &model.stages,
        )
        .unwrap();
        let h2 = GradientBoostingModel::calculate_model_hash(&model.classes, 0.1, &model.init, &model.stages)
            .unwrap();
        assert_ne!(h1, h2);
    }
}
