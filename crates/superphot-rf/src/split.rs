//! Split criteria and the exhaustive threshold search over candidate features.

use rand::Rng;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class-weighted counts.
    ///
    /// `total` is the sum of `class_weights`. Returns zero for an empty node.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_weights
                .iter()
                .filter(|&&w| w > 0.0)
                .map(|&w| {
                    let p = w / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        // Rounding can leave a pure node at -1e-17.
        value.max(0.0)
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Per-node inputs shared by every candidate feature.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `features[feature_idx][sample_idx]`.
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    /// Weight applied to every sample of a class.
    pub(crate) class_weights: &'a [f64],
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitContext<'_> {
    /// Sum the class weights of `sample_indices` per class.
    pub(crate) fn weighted_counts(&self, sample_indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0f64; self.class_weights.len()];
        for &si in sample_indices {
            let class = self.labels[si];
            counts[class] += self.class_weights[class];
        }
        counts
    }

    /// Find the best split among `max_features` randomly chosen features.
    ///
    /// For each candidate feature, sorts the samples by value and scans
    /// left-to-right with incremental weighted class counts, keeping the
    /// split with the largest weighted impurity decrease.
    ///
    /// Returns `None` when no valid split exists (all candidate values
    /// identical, or `min_samples_leaf` violated at every boundary).
    pub(crate) fn find_best_split(
        &self,
        sample_indices: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.features.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let parent_counts = self.weighted_counts(sample_indices);
        let parent_total: f64 = parent_counts.iter().sum();
        let parent_impurity = self.criterion.impurity(&parent_counts, parent_total);

        // Partial Fisher-Yates over the feature order.
        let mut feature_order: Vec<usize> = (0..n_features).collect();
        let take = self.max_features.min(n_features);
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }

        let mut best_decrease = f64::NEG_INFINITY;
        let mut best: Option<(usize, f64)> = None;

        for &feat_idx in &feature_order[..take] {
            let column = &self.features[feat_idx];
            let mut sorted: Vec<(f64, usize)> =
                sample_indices.iter().map(|&si| (column[si], si)).collect();
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0.0f64; parent_counts.len()];
            let mut right_counts = parent_counts.clone();
            let mut left_total = 0.0f64;

            for i in 0..(n_samples - 1) {
                let (value, si) = sorted[i];
                let class = self.labels[si];
                let w = self.class_weights[class];
                left_counts[class] += w;
                right_counts[class] -= w;
                left_total += w;

                let next_value = sorted[i + 1].0;
                if value == next_value {
                    continue;
                }

                let n_left = i + 1;
                let n_right = n_samples - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_total = parent_total - left_total;
                let left_impurity = self.criterion.impurity(&left_counts, left_total);
                let right_impurity = self.criterion.impurity(&right_counts, right_total);
                let decrease = parent_total * parent_impurity
                    - left_total * left_impurity
                    - right_total * right_impurity;

                if decrease > best_decrease {
                    best_decrease = decrease;
                    best = Some((feat_idx, (value + next_value) / 2.0));
                }
            }
        }

        let (feature, threshold) = best?;
        let column = &self.features[feature];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .partition(|&&si| column[si] <= threshold);

        Some(SplitResult {
            feature,
            threshold,
            left_indices,
            right_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitContext, SplitCriterion};

    fn context<'a>(
        features: &'a [Vec<f64>],
        labels: &'a [usize],
        class_weights: &'a [f64],
        min_samples_leaf: usize,
    ) -> SplitContext<'a> {
        SplitContext {
            features,
            labels,
            class_weights,
            criterion: SplitCriterion::Entropy,
            max_features: features.len(),
            min_samples_leaf,
        }
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5.0, 5.0], 10.0);
        assert!((imp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_pure_is_zero() {
        let imp = SplitCriterion::Entropy.impurity(&[4.0, 0.0, 0.0], 4.0);
        assert_eq!(imp, 0.0);
    }

    #[test]
    fn entropy_binary_balanced_is_ln2() {
        let imp = SplitCriterion::Entropy.impurity(&[2.5, 2.5], 5.0);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn weights_rebalance_entropy() {
        // 1 sample of class 0 weighted 3x against 3 samples of class 1.
        let imp = SplitCriterion::Entropy.impurity(&[3.0, 3.0], 6.0);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn separable_data_finds_gap() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let weights = vec![1.0, 1.0];
        let ctx = context(&features, &labels, &weights, 1);
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = ctx.find_best_split(&indices, &mut rng).expect("split exists");
        assert_eq!(split.feature, 0);
        assert!((split.threshold - 6.5).abs() < f64::EPSILON);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0; 4]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0, 1.0];
        let ctx = context(&features, &labels, &weights, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(ctx.find_best_split(&[0, 1, 2, 3], &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let weights = vec![1.0, 1.0];
        let ctx = context(&features, &labels, &weights, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(ctx.find_best_split(&[0, 1], &mut rng).is_none());
    }

    #[test]
    fn weighted_counts_apply_class_weight() {
        let features = vec![vec![0.0, 1.0, 2.0]];
        let labels = vec![0, 1, 1];
        let weights = vec![2.0, 0.5];
        let ctx = context(&features, &labels, &weights, 1);
        assert_eq!(ctx.weighted_counts(&[0, 1, 2]), vec![2.0, 1.0]);
    }
}
