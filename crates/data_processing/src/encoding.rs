//! Label encoding for categorical columns
//!
//! Each encoder is a bijection between the distinct values observed in one
//! column and the codes `0..n`, assigned in sorted value order. Encoders are
//! fit once per run and collected into an [`EncodingTable`] keyed by column.

use crate::dataset::ColumnValues;
use mlops_core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sorted class list; a value's code is its index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

/// Per-column encoders, including the target
pub type EncodingTable = BTreeMap<String, LabelEncoder>;

impl LabelEncoder {
    /// Fit on text values
    pub fn fit(values: &[String]) -> Self {
        let mut classes: Vec<String> = values.to_vec();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Fit on numeric values, ordered numerically
    pub fn fit_numeric(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        Self {
            classes: sorted.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Fit on a column and return its codes
    pub fn fit_transform(values: &ColumnValues) -> Result<(Self, Vec<u32>)> {
        let (encoder, keys) = match values {
            ColumnValues::Categorical(v) => (Self::fit(v), v.clone()),
            ColumnValues::Numeric(v) => (
                Self::fit_numeric(v),
                v.iter().map(|x| x.to_string()).collect(),
            ),
        };
        let codes = encoder.transform(&keys)?;
        Ok((encoder, codes))
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Code of a single value
    pub fn code_of(&self, value: &str) -> Option<u32> {
        // Numeric classes are not lexicographically sorted, so search linearly
        self.classes.iter().position(|c| c == value).map(|p| p as u32)
    }

    /// Encode values seen at fit time
    pub fn transform(&self, values: &[String]) -> Result<Vec<u32>> {
        values
            .iter()
            .map(|v| {
                self.code_of(v).ok_or_else(|| {
                    PipelineError::Preprocessing(format!("value {v:?} was not seen during fit"))
                })
            })
            .collect()
    }

    /// Decode codes back to the original values
    pub fn inverse_transform(&self, codes: &[u32]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&c| {
                self.classes.get(c as usize).cloned().ok_or_else(|| {
                    PipelineError::Preprocessing(format!("code {c} out of range"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlops_core::ErrorKind;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn codes_follow_sorted_order() {
        let values = strings(&["Yes", "No", "Yes", "Maybe"]);
        let encoder = LabelEncoder::fit(&values);
        assert_eq!(encoder.classes, strings(&["Maybe", "No", "Yes"]));
        assert_eq!(encoder.transform(&values).ok(), Some(vec![2, 1, 2, 0]));
    }

    #[test]
    fn inverse_recovers_values() {
        let values = strings(&["III", "I", "II", "I"]);
        let (encoder, codes) =
            LabelEncoder::fit_transform(&ColumnValues::Categorical(values.clone())).unwrap();
        assert_eq!(encoder.inverse_transform(&codes).ok(), Some(values));
    }

    #[test]
    fn numeric_target_sorted_numerically() {
        let (encoder, codes) =
            LabelEncoder::fit_transform(&ColumnValues::Numeric(vec![10.0, 2.0, 10.0, 1.0])).unwrap();
        assert_eq!(encoder.classes, strings(&["1", "2", "10"]));
        assert_eq!(codes, vec![2, 1, 2, 0]);
    }

    #[test]
    fn unseen_value_rejected() {
        let encoder = LabelEncoder::fit(&strings(&["a", "b"]));
        let err = encoder.transform(&strings(&["c"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Preprocessing);
    }
}
