//! The oversampler trait and the strategy enum selecting an implementation.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ResampleError;
use crate::gaussian::MultivariateGaussian;
use crate::smote::Smote;
use crate::strategy::SamplingStrategy;

/// Output of an oversampling pass.
///
/// `features` and `labels` start with the original rows in their original
/// order, followed by the synthetic rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    /// Original rows followed by synthetic rows.
    pub features: Vec<Vec<f64>>,
    /// Class index of every row in `features`.
    pub labels: Vec<usize>,
    /// Synthetic rows generated per class.
    pub n_synthetic: Vec<usize>,
}

impl Resampled {
    fn with_original(features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Self {
        Self {
            features: features.to_vec(),
            labels: labels.to_vec(),
            n_synthetic: vec![0; n_classes],
        }
    }

    pub(crate) fn push_synthetic(&mut self, class: usize, row: Vec<f64>) {
        self.features.push(row);
        self.labels.push(class);
        self.n_synthetic[class] += 1;
    }

    /// Total number of synthetic rows appended.
    #[must_use]
    pub fn total_synthetic(&self) -> usize {
        self.n_synthetic.iter().sum()
    }
}

/// A class-balancing strategy that appends synthetic rows.
pub trait Oversampler: Send + Sync {
    /// Oversample `features`/`labels` according to the configured strategy.
    ///
    /// `n_classes` is the size of the class set; every label must be below it.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                  |
    /// |-----------------------------------------|---------------------------------------|
    /// | [`ResampleError::EmptyDataset`]         | `features` is empty                   |
    /// | [`ResampleError::LabelCountMismatch`]   | `labels.len() != features.len()`      |
    /// | [`ResampleError::FeatureCountMismatch`] | rows have inconsistent lengths        |
    /// | [`ResampleError::NonFiniteValue`]       | any value is NaN or infinite          |
    /// | [`ResampleError::LabelOutOfRange`]      | a label is `>= n_classes`             |
    /// | [`ResampleError::InvalidRatio`]         | the strategy ratio is out of range    |
    fn fit_resample(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<Resampled, ResampleError>;
}

/// Validate the input and return the original rows as the start of the output.
pub(crate) fn prepare(
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
) -> Result<Resampled, ResampleError> {
    let Some(first) = features.first() else {
        return Err(ResampleError::EmptyDataset);
    };
    if labels.len() != features.len() {
        return Err(ResampleError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_features = first.len();
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ResampleError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ResampleError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if let Some(sample_index) = labels.iter().position(|&l| l >= n_classes) {
        return Err(ResampleError::LabelOutOfRange {
            sample_index,
            label: labels[sample_index],
            n_classes,
        });
    }
    Ok(Resampled::with_original(features, labels, n_classes))
}

/// ChaCha8 from a fixed seed, or from OS entropy when `seed` is `None`.
pub(crate) fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// The oversampling strategy used by a pipeline.
///
/// Serialized with a `kind` tag of `"mvg"` or `"smote"`, the same names
/// accepted by [`FromStr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Sampler {
    /// Per-class multivariate Gaussian draws.
    #[serde(rename = "mvg")]
    MultivariateGaussian(MultivariateGaussian),
    /// Interpolation between same-class nearest neighbours.
    #[serde(rename = "smote")]
    Smote(Smote),
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::MultivariateGaussian(MultivariateGaussian::default())
    }
}

impl Sampler {
    /// Short name of the strategy (`"mvg"` or `"smote"`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Sampler::MultivariateGaussian(_) => "mvg",
            Sampler::Smote(_) => "smote",
        }
    }

    /// Return the per-class target strategy.
    #[must_use]
    pub fn strategy(&self) -> SamplingStrategy {
        match self {
            Sampler::MultivariateGaussian(s) => s.strategy(),
            Sampler::Smote(s) => s.strategy(),
        }
    }

    /// Return the configured seed, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        match self {
            Sampler::MultivariateGaussian(s) => s.seed(),
            Sampler::Smote(s) => s.seed(),
        }
    }

    /// Replace the per-class target strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::InvalidRatio`] for an out-of-range ratio.
    pub fn with_strategy(self, strategy: SamplingStrategy) -> Result<Self, ResampleError> {
        strategy.validate()?;
        Ok(match self {
            Sampler::MultivariateGaussian(s) => {
                Sampler::MultivariateGaussian(s.with_strategy(strategy))
            }
            Sampler::Smote(s) => Sampler::Smote(s.with_strategy(strategy)),
        })
    }

    /// Replace the seed. `None` draws from OS entropy on every call.
    #[must_use]
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        match self {
            Sampler::MultivariateGaussian(s) => Sampler::MultivariateGaussian(s.with_seed(seed)),
            Sampler::Smote(s) => Sampler::Smote(s.with_seed(seed)),
        }
    }
}

impl Oversampler for Sampler {
    fn fit_resample(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<Resampled, ResampleError> {
        match self {
            Sampler::MultivariateGaussian(s) => s.fit_resample(features, labels, n_classes),
            Sampler::Smote(s) => s.fit_resample(features, labels, n_classes),
        }
    }
}

impl FromStr for Sampler {
    type Err = ResampleError;

    /// Parse `"mvg"` or `"smote"` into the strategy's default configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mvg" => Ok(Sampler::MultivariateGaussian(MultivariateGaussian::default())),
            "smote" => Ok(Sampler::Smote(Smote::default())),
            _ => Err(ResampleError::UnknownSampler {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!("mvg".parse::<Sampler>().unwrap().name(), "mvg");
        assert_eq!(" SMOTE ".parse::<Sampler>().unwrap().name(), "smote");
    }

    #[test]
    fn parse_unknown_name_fails() {
        let err = "adasyn".parse::<Sampler>().unwrap_err();
        assert!(matches!(err, ResampleError::UnknownSampler { ref name } if name == "adasyn"));
    }

    #[test]
    fn serde_tagged_by_kind() {
        let sampler = Sampler::default().with_seed(Some(3));
        let json = serde_json::to_string(&sampler).unwrap();
        assert!(json.contains(r#""kind":"mvg""#), "{json}");
        let back: Sampler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sampler);

        let smote: Sampler = serde_json::from_str(r#"{"kind":"smote","k_neighbors":3}"#).unwrap();
        assert_eq!(smote.name(), "smote");
        assert_eq!(smote.strategy(), SamplingStrategy::NotMajority);
    }

    #[test]
    fn with_strategy_rejects_bad_ratio() {
        let err = Sampler::default()
            .with_strategy(SamplingStrategy::Ratio(2.0))
            .unwrap_err();
        assert!(matches!(err, ResampleError::InvalidRatio { .. }));
    }

    #[test]
    fn prepare_rejects_out_of_range_label() {
        let err = prepare(&[vec![1.0], vec![2.0]], &[0, 3], 2).unwrap_err();
        assert!(matches!(
            err,
            ResampleError::LabelOutOfRange {
                sample_index: 1,
                label: 3,
                n_classes: 2
            }
        ));
    }

    #[test]
    fn prepare_rejects_ragged_rows() {
        let err = prepare(&[vec![1.0, 2.0], vec![2.0]], &[0, 0], 1).unwrap_err();
        assert!(matches!(err, ResampleError::FeatureCountMismatch { .. }));
    }
}
