//! Chi-squared feature scoring and top-K selection
//!
//! Observed counts are per-class column sums, expected counts are the class
//! frequency times the column total. Inputs must be non-negative.

use mlops_core::{FeatureMatrix, PipelineError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Association score of one feature against the target
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScore {
    pub name: String,
    /// `None` when the statistic is undefined (all-zero column)
    pub score: Option<f64>,
}

/// Chi-squared statistic of every column of `features` against `target`
pub fn chi2_scores(features: &FeatureMatrix, target: &[u32]) -> Result<Vec<Option<f64>>> {
    if features.n_rows() != target.len() {
        return Err(PipelineError::FeatureSelection(format!(
            "{} feature rows but {} labels",
            features.n_rows(),
            target.len()
        )));
    }
    if features.is_empty() {
        return Err(PipelineError::FeatureSelection("no rows to score".to_string()));
    }

    let n_cols = features.n_cols();
    // class code -> (row count, per-column sums)
    let mut observed: BTreeMap<u32, (usize, Vec<f64>)> = BTreeMap::new();
    let mut totals = vec![0.0; n_cols];

    for (row, &label) in features.rows.iter().zip(target) {
        let entry = observed.entry(label).or_insert_with(|| (0, vec![0.0; n_cols]));
        entry.0 += 1;
        for (col, &value) in row.iter().enumerate() {
            if value < 0.0 || !value.is_finite() {
                return Err(PipelineError::FeatureSelection(format!(
                    "column {:?} holds {value}; chi-squared needs non-negative finite values",
                    features.columns[col]
                )));
            }
            entry.1[col] += value;
            totals[col] += value;
        }
    }

    let n = target.len() as f64;
    let scores = (0..n_cols)
        .map(|col| {
            if totals[col] == 0.0 {
                return None;
            }
            let stat = observed
                .values()
                .map(|(count, sums)| {
                    let expected = (*count as f64 / n) * totals[col];
                    let diff = sums[col] - expected;
                    diff * diff / expected
                })
                .sum::<f64>();
            Some(stat)
        })
        .collect();

    Ok(scores)
}

/// Rank columns by score, best first
///
/// Undefined scores rank after every defined one; ties keep column order.
pub fn rank_features(features: &FeatureMatrix, target: &[u32]) -> Result<Vec<FeatureScore>> {
    let scores = chi2_scores(features, target)?;
    let mut ranked: Vec<FeatureScore> = features
        .columns
        .iter()
        .zip(scores)
        .map(|(name, score)| FeatureScore {
            name: name.clone(),
            score,
        })
        .collect();

    ranked.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(ranked)
}

/// Names of the `k` best columns, in rank order
pub fn select_k_best(features: &FeatureMatrix, target: &[u32], k: usize) -> Result<Vec<FeatureScore>> {
    if features.n_cols() < k {
        return Err(PipelineError::FeatureSelection(format!(
            "need at least {k} numeric columns, found {}",
            features.n_cols()
        )));
    }
    let mut ranked = rank_features(features, target)?;
    ranked.truncate(k);
    Ok(ranked)
}

/// Restrict `features` to `names`, in that order
pub fn project(features: &FeatureMatrix, names: &[String]) -> Result<FeatureMatrix> {
    let positions = names
        .iter()
        .map(|name| {
            features.columns.iter().position(|c| c == name).ok_or_else(|| {
                PipelineError::FeatureSelection(format!("selected column {name:?} not present"))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let rows = features
        .rows
        .iter()
        .map(|row| positions.iter().map(|&p| row[p]).collect())
        .collect();
    Ok(FeatureMatrix::new(names.to_vec(), rows))
}
