//! Standardization to zero mean and unit variance
//!
//! The scaler is fit on the train partition only and persisted so the same
//! affine map can be reapplied to unseen data.

use mlops_core::{FeatureMatrix, PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Fitted per-column affine transform `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    /// Population variance (ddof = 0)
    pub var: Vec<f64>,
    /// `sqrt(var)`, or 1.0 for constant columns
    pub scale: Vec<f64>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit column statistics on `data`
    pub fn fit(data: &FeatureMatrix) -> Result<Self> {
        if data.is_empty() {
            return Err(PipelineError::Scaling("cannot fit scaler on zero rows".to_string()));
        }
        if !data.is_rectangular() {
            return Err(PipelineError::Scaling("ragged feature matrix".to_string()));
        }
        if let Some((row, col)) = first_non_finite(data) {
            return Err(PipelineError::Scaling(format!(
                "non-finite value in column {:?} at row {row}",
                data.columns[col]
            )));
        }

        let n = data.n_rows() as f64;
        let n_cols = data.n_cols();

        let mut mean = vec![0.0; n_cols];
        for row in &data.rows {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_cols];
        for row in &data.rows {
            for ((v, &x), &m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        for (v, &m) in var.iter_mut().zip(&mean) {
            *v /= n;
            if is_constant(*v, m) {
                *v = 0.0;
            }
        }

        let scale = var
            .iter()
            .map(|&v| if v == 0.0 { 1.0 } else { v.sqrt() })
            .collect();

        Ok(Self {
            columns: data.columns.clone(),
            mean,
            var,
            scale,
            n_samples_seen: data.n_rows(),
        })
    }

    /// Apply the fitted transform
    pub fn transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        self.check_shape(data)?;
        let rows = data
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(&x, (&m, &s))| (x - m) / s)
                    .collect()
            })
            .collect();
        Ok(FeatureMatrix::new(data.columns.clone(), rows))
    }

    /// Undo [`transform`](Self::transform)
    pub fn inverse_transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        self.check_shape(data)?;
        let rows = data
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(&z, (&m, &s))| z * s + m)
                    .collect()
            })
            .collect();
        Ok(FeatureMatrix::new(data.columns.clone(), rows))
    }

    fn check_shape(&self, data: &FeatureMatrix) -> Result<()> {
        if data.n_cols() != self.mean.len() || !data.is_rectangular() {
            return Err(PipelineError::Scaling(format!(
                "scaler fit on {} columns, got {}",
                self.mean.len(),
                data.n_cols()
            )));
        }
        Ok(())
    }
}

/// Variance within rounding noise of the mean counts as zero
fn is_constant(var: f64, mean: f64) -> bool {
    var <= (10.0 * f64::EPSILON * mean.abs()).powi(2)
}

fn first_non_finite(data: &FeatureMatrix) -> Option<(usize, usize)> {
    data.rows.iter().enumerate().find_map(|(r, row)| {
        row.iter().position(|x| !x.is_finite()).map(|c| (r, c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlops_core::ErrorKind;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let n_cols = rows.first().map_or(0, Vec::len);
        FeatureMatrix::new((0..n_cols).map(|i| format!("f{i}")).collect(), rows)
    }

    #[test]
    fn test_fit_statistics() {
        let scaler = StandardScaler::fit(&matrix(vec![vec![1.0, 5.0], vec![3.0, 5.0]])).unwrap();
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.var, vec![1.0, 0.0]);
        // constant column keeps scale 1
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.n_samples_seen, 2);
    }

    #[test]
    fn test_inexact_constant_column_keeps_unit_scale() {
        let train = matrix(vec![vec![0.1, 1.0], vec![0.1, 2.0], vec![0.1, 3.0]]);
        let scaler = StandardScaler::fit(&train).unwrap();
        assert_eq!(scaler.var[0], 0.0);
        assert_eq!(scaler.scale[0], 1.0);

        let z = scaler.transform(&train).unwrap();
        assert!(z.rows.iter().all(|r| r[0].abs() < 1e-12));

        let unseen = scaler.transform(&matrix(vec![vec![0.2, 2.0]])).unwrap();
        assert!((unseen.rows[0][0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_transformed_train_is_standardized() {
        let train = matrix(vec![vec![2.0], vec![4.0], vec![6.0], vec![8.0]]);
        let scaler = StandardScaler::fit(&train).unwrap();
        let z = scaler.transform(&train).unwrap();

        let values: Vec<f64> = z.rows.iter().map(|r| r[0]).collect();
        let mean = values.iter().sum::<f64>() / 4.0;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let train = matrix(vec![vec![1.5, -2.0], vec![3.0, 4.0], vec![0.5, 1.0]]);
        let scaler = StandardScaler::fit(&train).unwrap();
        let back = scaler.inverse_transform(&scaler.transform(&train).unwrap()).unwrap();
        for (a, b) in back.rows.iter().flatten().zip(train.rows.iter().flatten()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        let err = StandardScaler::fit(&matrix(vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scaling);

        let err = StandardScaler::fit(&matrix(vec![vec![1.0], vec![f64::NAN]])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scaling);
    }

    #[test]
    fn test_column_mismatch_rejected() {
        let scaler = StandardScaler::fit(&matrix(vec![vec![1.0, 2.0]])).unwrap();
        let err = scaler.transform(&matrix(vec![vec![1.0]])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scaling);
    }
}
