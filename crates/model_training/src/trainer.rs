//! Gradient Boosted Decision Tree (GBDT) classifier trainer
//!
//! Binomial deviance for two classes, multinomial deviance otherwise. Each
//! stage fits regression trees to the negative gradient and sets leaves by a
//! single Newton step. Every random choice flows from one seeded LCG.

use crate::cart::{CartBuilder, TreeConfig};
use crate::model::{sigmoid, softmax, GradientBoostingModel, ModelMetadata};
use mlops_core::{FeatureMatrix, LcgRng, PipelineError, Result, TrainingConfig};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct GbdtConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        TrainingConfig::default().into()
    }
}

impl From<TrainingConfig> for GbdtConfig {
    fn from(config: TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.seed,
        }
    }
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Fit an ensemble on `x` and label codes `y`
    pub fn train(&self, x: &FeatureMatrix, y: &[u32]) -> Result<GradientBoostingModel> {
        self.check_inputs(x, y)?;

        let classes: Vec<u32> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(PipelineError::Training(format!(
                "need at least two classes, found {}",
                classes.len()
            )));
        }
        // position of each label code in `classes`
        let targets: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let n_samples = x.n_rows();
        let n_classes = classes.len();
        let n_columns = if n_classes == 2 { 1 } else { n_classes };

        let init = Self::prior_scores(&targets, n_classes);
        let mut raw: Vec<Vec<f64>> = vec![init.clone(); n_samples];

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        let leaf_factor = if n_columns == 1 {
            1.0
        } else {
            (n_classes - 1) as f64 / n_classes as f64
        };

        let mut rng = LcgRng::new(self.config.seed);
        let mut stages = Vec::with_capacity(self.config.n_estimators);

        for stage_idx in 0..self.config.n_estimators {
            let probas: Vec<Vec<f64>> = raw.iter().map(|r| Self::column_probas(r)).collect();
            let mut stage = Vec::with_capacity(n_columns);

            for column in 0..n_columns {
                let (residuals, hessians) = Self::gradients_hessians(&targets, &probas, column, n_columns);

                let tree = CartBuilder::new(&x.rows, &residuals, &hessians, tree_config.clone())
                    .with_leaf_factor(leaf_factor)
                    .build(&mut rng);

                for (row, scores) in x.rows.iter().zip(raw.iter_mut()) {
                    scores[column] += self.config.learning_rate * tree.evaluate(row);
                }
                stage.push(tree);
            }

            if let Some(bad) = raw.iter().flatten().find(|v| !v.is_finite()) {
                return Err(PipelineError::Training(format!(
                    "raw score diverged to {bad} at stage {}",
                    stage_idx + 1
                )));
            }
            debug!(
                "Stage {}/{}: deviance {:.6}",
                stage_idx + 1,
                self.config.n_estimators,
                Self::deviance(&targets, &raw)
            );
            stages.push(stage);
        }

        let model_hash = GradientBoostingModel::calculate_model_hash(
            &classes,
            self.config.learning_rate,
            &init,
            &stages,
        )?;

        let model = GradientBoostingModel {
            classes,
            feature_names: x.columns.clone(),
            learning_rate: self.config.learning_rate,
            init,
            stages,
            metadata: ModelMetadata {
                version: crate::VERSION.to_string(),
                n_estimators: self.config.n_estimators,
                max_depth: self.config.max_depth,
                seed: self.config.seed,
                train_rows: n_samples,
                model_hash,
            },
        };

        info!(
            "Trained {} trees over {} samples ({} classes), hash {}",
            model.tree_count(),
            n_samples,
            n_classes,
            model.metadata.model_hash
        );
        Ok(model)
    }

    fn check_inputs(&self, x: &FeatureMatrix, y: &[u32]) -> Result<()> {
        if x.is_empty() {
            return Err(PipelineError::Training("training set is empty".to_string()));
        }
        if x.n_rows() != y.len() {
            return Err(PipelineError::Training(format!(
                "{} feature rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if x.n_cols() == 0 || !x.is_rectangular() {
            return Err(PipelineError::Training(format!(
                "feature rows must all have {} values",
                x.n_cols()
            )));
        }
        if x.rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PipelineError::Training("non-finite feature value".to_string()));
        }
        Ok(())
    }

    /// Log-odds of the positive class, or log class priors for multinomial
    fn prior_scores(targets: &[usize], n_classes: usize) -> Vec<f64> {
        let n = targets.len() as f64;
        let mut counts = vec![0usize; n_classes];
        for &t in targets {
            counts[t] += 1;
        }
        let priors: Vec<f64> = counts.iter().map(|&c| c as f64 / n).collect();

        if n_classes == 2 {
            vec![(priors[1] / priors[0]).ln()]
        } else {
            priors.iter().map(|p| p.max(f64::MIN_POSITIVE).ln()).collect()
        }
    }

    /// Per-column class probabilities from raw scores
    fn column_probas(raw: &[f64]) -> Vec<f64> {
        match raw {
            [logit] => vec![sigmoid(*logit)],
            _ => softmax(raw),
        }
    }

    /// Negative gradient `y - p` and curvature for one score column
    fn gradients_hessians(
        targets: &[usize],
        probas: &[Vec<f64>],
        column: usize,
        n_columns: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        // the binary logit column models class 1
        let positive = if n_columns == 1 { 1 } else { column };
        targets
            .iter()
            .zip(probas)
            .map(|(&t, p)| {
                let y = if t == positive { 1.0 } else { 0.0 };
                let residual = y - p[column];
                let hessian = if n_columns == 1 {
                    p[column] * (1.0 - p[column])
                } else {
                    residual.abs() * (1.0 - residual.abs())
                };
                (residual, hessian)
            })
            .unzip()
    }

    /// Mean negative log-likelihood, for progress logging
    fn deviance(targets: &[usize], raw: &[Vec<f64>]) -> f64 {
        let total: f64 = targets
            .iter()
            .zip(raw)
            .map(|(&t, scores)| {
                let p = match scores.as_slice() {
                    [logit] => {
                        let p1 = sigmoid(*logit);
                        if t == 1 { p1 } else { 1.0 - p1 }
                    }
                    _ => softmax(scores)[t],
                };
                -p.max(1e-300).ln()
            })
            .sum();
        total / targets.len() as f64
    }
}
