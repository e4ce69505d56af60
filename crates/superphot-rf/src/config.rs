//! Hyperparameters of the forest and the `fit` entry point.

use serde::{Deserialize, Serialize};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::split::SplitCriterion;

/// Number of candidate features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`.
    Sqrt,
    /// `ceil(log2(n_features))`, at least one.
    Log2,
    /// `ceil(fraction * n_features)`.
    Fraction(f64),
    Fixed(usize),
    /// Every feature at every split.
    All,
}

impl MaxFeatures {
    /// Turn the strategy into a feature count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidMaxFeatures`] when the count is zero or exceeds `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let n = n_features as f64;
        let max_features = match self {
            MaxFeatures::Sqrt => n.sqrt().ceil() as usize,
            MaxFeatures::Log2 => n.log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(fraction) => (n * fraction).ceil() as usize,
            MaxFeatures::Fixed(count) => count,
            MaxFeatures::All => n_features,
        };
        if (1..=n_features).contains(&max_features) {
            Ok(max_features)
        } else {
            Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            })
        }
    }
}

/// Per-class weighting of training rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// Class `c` weighs `n_samples / (n_classes * count_c)` over the rows given to `fit`.
    Balanced,
}

/// Random forest hyperparameters.
///
/// Start from [`RandomForestConfig::new`] or `Default`, then chain `with_*`.
/// Deserialization fills absent fields from the defaults.
///
/// # Defaults
///
/// | Parameter            | Default            |
/// |----------------------|--------------------|
/// | `n_trees`            | 100                |
/// | `max_features`       | `All`              |
/// | `max_depth`          | `None`             |
/// | `min_samples_split`  | 2                  |
/// | `min_samples_leaf`   | 1                  |
/// | `criterion`          | `Entropy`          |
/// | `class_weight`       | `Balanced`         |
/// | `n_jobs`             | `None` (all cores) |
/// | `seed`               | 42                 |
/// | `bootstrap_fraction` | 1.0                |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) class_weight: ClassWeight,
    pub(crate) n_jobs: Option<usize>,
    pub(crate) seed: u64,
    pub(crate) bootstrap_fraction: f64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: MaxFeatures::All,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Entropy,
            class_weight: ClassWeight::Balanced,
            n_jobs: None,
            seed: 42,
            bootstrap_fraction: 1.0,
        }
    }
}

impl RandomForestConfig {
    /// Default config with `n_trees` trees.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidConfig`] when `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        let config = Self {
            n_trees,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checked again by `fit`.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// `None` grows every branch until it is pure or too small to split.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Thread count for growing trees.
    ///
    /// `None` runs on the current rayon pool, `Some(1)` grows trees one after
    /// another on the calling thread, and any other count builds a pool of that
    /// size for the duration of `fit`. The fitted forest is identical in all cases.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Bootstrap draws per tree as a fraction of the training rows.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    #[must_use]
    pub fn n_jobs(&self) -> Option<usize> {
        self.n_jobs
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Check every parameter that can be judged without seeing data.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<(), RfError> {
        if self.n_trees == 0 {
            return Err(RfError::config("n_trees", self.n_trees, "at least 1"));
        }
        if let Some(depth @ 0) = self.max_depth {
            return Err(RfError::config("max_depth", depth, "at least 1 or unset"));
        }
        if self.min_samples_split < 2 {
            return Err(RfError::config(
                "min_samples_split",
                self.min_samples_split,
                "at least 2",
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::config("min_samples_leaf", 0, "at least 1"));
        }
        if !(self.bootstrap_fraction > 0.0 && self.bootstrap_fraction <= 1.0) {
            return Err(RfError::config(
                "bootstrap_fraction",
                self.bootstrap_fraction,
                "in (0, 1]",
            ));
        }
        if let Some(jobs @ 0) = self.n_jobs {
            return Err(RfError::config("n_jobs", jobs, "at least 1 or unset"));
        }
        Ok(())
    }

    /// Fit a forest on row-major `features` with class-index `labels`.
    ///
    /// Every class in `0..n_classes` must have at least one row.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                   |
    /// |-----------------------------------|----------------------------------------|
    /// | [`RfError::InvalidConfig`]        | see [`RandomForestConfig::validate`]   |
    /// | [`RfError::EmptyDataset`]         | no rows                                |
    /// | [`RfError::ZeroFeatures`]         | rows are empty                         |
    /// | [`RfError::LabelCountMismatch`]   | one label per row is not given         |
    /// | [`RfError::FeatureCountMismatch`] | rows have different widths             |
    /// | [`RfError::NonFiniteValue`]       | a value is NaN or infinite             |
    /// | [`RfError::LabelOutOfRange`]      | a label is `>= n_classes`              |
    /// | [`RfError::MissingClass`]         | a class has no rows                    |
    /// | [`RfError::InvalidMaxFeatures`]   | `max_features` does not fit the width  |
    /// | [`RfError::ThreadPool`]           | a dedicated pool cannot be built       |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        feature_names: &[String],
    ) -> Result<RandomForest, RfError> {
        crate::forest::train(self, features, labels, n_classes, feature_names)
    }
}
