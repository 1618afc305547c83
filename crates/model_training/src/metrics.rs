//! Classification metrics with support-weighted averaging
//!
//! Per-class ratios that divide by zero count as 0. The label set is the
//! union of labels present in the truth and in the predictions.

use mlops_core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Counts for one class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClassCounts {
    true_positive: usize,
    predicted: usize,
    actual: usize,
}

/// The four scalar scores computed on the test partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accuracy : {} ; Precision : {} ; Recall : {} ; F1-Score : {}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

fn check_lengths(y_true: &[u32], y_pred: &[u32]) -> Result<()> {
    if y_true.is_empty() {
        return Err(PipelineError::Evaluation("no samples to evaluate".to_string()));
    }
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::Evaluation(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

fn class_counts(y_true: &[u32], y_pred: &[u32]) -> BTreeMap<u32, ClassCounts> {
    let mut counts: BTreeMap<u32, ClassCounts> = BTreeMap::new();
    for (&t, &p) in y_true.iter().zip(y_pred) {
        counts.entry(t).or_default().actual += 1;
        counts.entry(p).or_default().predicted += 1;
        if t == p {
            counts.entry(t).or_default().true_positive += 1;
        }
    }
    counts
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Fraction of exact matches
pub fn accuracy(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(ratio(hits, y_true.len()))
}

/// Support-weighted mean of a per-class score
fn weighted(y_true: &[u32], y_pred: &[u32], score: impl Fn(&ClassCounts) -> f64) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let total = y_true.len() as f64;
    Ok(class_counts(y_true, y_pred)
        .values()
        .map(|c| score(c) * c.actual as f64 / total)
        .sum())
}

fn class_precision(c: &ClassCounts) -> f64 {
    ratio(c.true_positive, c.predicted)
}

fn class_recall(c: &ClassCounts) -> f64 {
    ratio(c.true_positive, c.actual)
}

fn class_f1(c: &ClassCounts) -> f64 {
    let p = class_precision(c);
    let r = class_recall(c);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

pub fn precision_weighted(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    weighted(y_true, y_pred, class_precision)
}

pub fn recall_weighted(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    weighted(y_true, y_pred, class_recall)
}

pub fn f1_weighted(y_true: &[u32], y_pred: &[u32]) -> Result<f64> {
    weighted(y_true, y_pred, class_f1)
}

/// All four scores at once
pub fn evaluate(y_true: &[u32], y_pred: &[u32]) -> Result<EvaluationReport> {
    Ok(EvaluationReport {
        accuracy: accuracy(y_true, y_pred)?,
        precision: precision_weighted(y_true, y_pred)?,
        recall: recall_weighted(y_true, y_pred)?,
        f1: f1_weighted(y_true, y_pred)?,
        support: y_true.len(),
    })
}
