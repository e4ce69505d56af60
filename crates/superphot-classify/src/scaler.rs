//! Per-column standardization.

use crate::error::ClassifyError;

/// Zero-mean, unit-variance scaling fitted on training rows.
///
/// Columns with zero variance are centred but not scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::NoLabeledRows`] when `features` is empty.
    pub fn fit(features: &[Vec<f64>]) -> Result<Self, ClassifyError> {
        let Some(first) = features.first() else {
            return Err(ClassifyError::NoLabeledRows);
        };
        let n = features.len() as f64;
        let n_features = first.len();

        let mut mean = vec![0.0f64; n_features];
        for row in features {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0f64; n_features];
        for row in features {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 { std } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Apply the fitted transform to `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::RowWidth`] when a row is not as wide as the
    /// rows the scaler was fitted on.
    pub fn transform(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ClassifyError> {
        features
            .iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != self.mean.len() {
                    return Err(ClassifyError::RowWidth {
                        row,
                        expected: self.mean.len(),
                        got: values.len(),
                    });
                }
                Ok(values
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect())
            })
            .collect()
    }
}
