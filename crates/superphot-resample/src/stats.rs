//! Per-class sample statistics.

/// Row indices of each class, in input order.
pub(crate) fn class_indices(labels: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut indices = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        indices[label].push(i);
    }
    indices
}

/// Mean vector and unbiased covariance of one class.
#[derive(Debug, Clone)]
pub(crate) struct ClassStatistics {
    pub(crate) mean: Vec<f64>,
    /// Row-major `n_features x n_features`, `N - 1` denominator.
    pub(crate) covariance: Vec<f64>,
}

impl ClassStatistics {
    /// Estimate from the class rows. A single row yields a zero covariance.
    pub(crate) fn estimate(rows: &[&[f64]]) -> Self {
        let n_rows = rows.len();
        let n_features = rows.first().map_or(0, |r| r.len());

        let mut mean = vec![0.0f64; n_features];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n_rows as f64);

        let mut covariance = vec![0.0f64; n_features * n_features];
        if n_rows > 1 {
            for row in rows {
                for i in 0..n_features {
                    let di = row[i] - mean[i];
                    for j in i..n_features {
                        covariance[i * n_features + j] += di * (row[j] - mean[j]);
                    }
                }
            }
            let denom = (n_rows - 1) as f64;
            for i in 0..n_features {
                for j in i..n_features {
                    let c = covariance[i * n_features + j] / denom;
                    covariance[i * n_features + j] = c;
                    covariance[j * n_features + i] = c;
                }
            }
        }

        Self { mean, covariance }
    }
}
