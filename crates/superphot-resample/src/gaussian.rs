//! Multivariate Gaussian oversampling.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::eigen::SymmetricEigen;
use crate::error::ResampleError;
use crate::sampler::{Oversampler, Resampled, prepare, seeded_rng};
use crate::stats::{ClassStatistics, class_indices};
use crate::strategy::SamplingStrategy;

/// Draws synthetic rows for each class from a normal distribution with the
/// class's sample mean and unbiased covariance.
///
/// Singular covariances are handled through an eigendecomposition with
/// negative eigenvalues clamped to zero; a class with a single row yields
/// copies of that row.
///
/// # Defaults
///
/// | Parameter  | Default                  |
/// |------------|--------------------------|
/// | `strategy` | `SamplesPerClass(1000)`  |
/// | `seed`     | `None` (OS entropy)      |
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultivariateGaussian {
    strategy: SamplingStrategy,
    seed: Option<u64>,
}

impl MultivariateGaussian {
    /// Create a sampler with the given target strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::InvalidRatio`] for an out-of-range ratio.
    pub fn new(strategy: SamplingStrategy) -> Result<Self, ResampleError> {
        strategy.validate()?;
        Ok(Self {
            strategy,
            seed: None,
        })
    }

    /// Set the seed; `None` seeds from OS entropy on every call.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set the target strategy. Validated at `fit_resample` time.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Return the target strategy.
    #[must_use]
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Return the seed, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Oversampler for MultivariateGaussian {
    #[instrument(skip_all, fields(n_samples = features.len(), n_classes = n_classes))]
    fn fit_resample(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<Resampled, ResampleError> {
        self.strategy.validate()?;
        let mut out = prepare(features, labels, n_classes)?;
        let n_features = features[0].len();

        let indices = class_indices(labels, n_classes);
        let counts: Vec<usize> = indices.iter().map(Vec::len).collect();
        let targets = self.strategy.targets(&counts);
        let mut rng = seeded_rng(self.seed);

        for (class, rows_idx) in indices.iter().enumerate() {
            let n_draws = targets[class] - counts[class];
            if n_draws == 0 {
                continue;
            }

            let rows: Vec<&[f64]> = rows_idx.iter().map(|&i| features[i].as_slice()).collect();
            let stats = ClassStatistics::estimate(&rows);
            let factor = SymmetricEigen::jacobi(&stats.covariance, n_features).sqrt_factor();

            for _ in 0..n_draws {
                let z: Vec<f64> = (0..n_features).map(|_| rng.sample(StandardNormal)).collect();
                let row: Vec<f64> = (0..n_features)
                    .map(|i| {
                        let offset: f64 = factor[i * n_features..(i + 1) * n_features]
                            .iter()
                            .zip(&z)
                            .map(|(l, zj)| l * zj)
                            .sum();
                        stats.mean[i] + offset
                    })
                    .collect();
                out.push_synthetic(class, row);
            }

            debug!(class, original = counts[class], synthetic = n_draws, "class oversampled");
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.5],
            vec![5.0, 5.0],
        ];
        (features, vec![0, 0, 0, 1])
    }

    #[test]
    fn counts_reach_target() {
        let (features, labels) = two_blobs();
        let sampler = MultivariateGaussian::new(SamplingStrategy::SamplesPerClass(6))
            .unwrap()
            .with_seed(Some(1));
        let out = sampler.fit_resample(&features, &labels, 2).unwrap();
        assert_eq!(out.n_synthetic, vec![3, 5]);
        assert_eq!(out.labels.iter().filter(|&&l| l == 0).count(), 6);
        assert_eq!(out.labels.iter().filter(|&&l| l == 1).count(), 6);
        assert_eq!(&out.features[..4], features.as_slice());
    }

    #[test]
    fn single_row_class_yields_exact_copies() {
        let (features, labels) = two_blobs();
        let sampler = MultivariateGaussian::new(SamplingStrategy::NotMajority)
            .unwrap()
            .with_seed(Some(9));
        let out = sampler.fit_resample(&features, &labels, 2).unwrap();
        assert_eq!(out.n_synthetic, vec![0, 2]);
        for row in &out.features[4..] {
            assert_eq!(row, &vec![5.0, 5.0]);
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let (features, labels) = two_blobs();
        let sampler = MultivariateGaussian::new(SamplingStrategy::SamplesPerClass(10))
            .unwrap()
            .with_seed(Some(42));
        let a = sampler.fit_resample(&features, &labels, 2).unwrap();
        let b = sampler.fit_resample(&features, &labels, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn draws_follow_class_moments() {
        // Correlated 2-D class: y = 2x plus small noise.
        let features: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let x = i as f64 / 4.0;
                vec![x, 2.0 * x + if i % 2 == 0 { 0.1 } else { -0.1 }]
            })
            .collect();
        let labels = vec![0; 20];
        let sampler = MultivariateGaussian::new(SamplingStrategy::SamplesPerClass(5020))
            .unwrap()
            .with_seed(Some(5));
        let out = sampler.fit_resample(&features, &labels, 1).unwrap();

        let rows: Vec<&[f64]> = features.iter().map(Vec::as_slice).collect();
        let truth = ClassStatistics::estimate(&rows);
        let synth: Vec<&[f64]> = out.features[20..].iter().map(Vec::as_slice).collect();
        let drawn = ClassStatistics::estimate(&synth);

        for i in 0..2 {
            assert!((drawn.mean[i] - truth.mean[i]).abs() < 0.15, "mean {i}");
        }
        for (d, t) in drawn.covariance.iter().zip(&truth.covariance) {
            assert!((d - t).abs() < 0.1 * t.abs().max(1.0), "cov {d} vs {t}");
        }
    }

    #[test]
    fn absent_class_not_synthesized() {
        let (features, labels) = two_blobs();
        let sampler = MultivariateGaussian::new(SamplingStrategy::SamplesPerClass(4))
            .unwrap()
            .with_seed(Some(0));
        let out = sampler.fit_resample(&features, &labels, 3).unwrap();
        assert_eq!(out.n_synthetic, vec![1, 3, 0]);
    }
}
