//! SMOTE: interpolation between same-class nearest neighbours.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ResampleError;
use crate::sampler::{Oversampler, Resampled, prepare, seeded_rng};
use crate::stats::class_indices;
use crate::strategy::SamplingStrategy;

/// Squared distance paired with a row index, ordered for a max-heap.
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Synthetic Minority Over-sampling Technique.
///
/// Each synthetic row is `x + u (n - x)` for a random class row `x`, one of
/// its `k` nearest same-class neighbours `n`, and `u ~ U[0, 1)`.
///
/// # Defaults
///
/// | Parameter     | Default            |
/// |---------------|--------------------|
/// | `strategy`    | `NotMajority`      |
/// | `k_neighbors` | 5                  |
/// | `seed`        | `None` (OS entropy)|
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smote {
    strategy: SamplingStrategy,
    k_neighbors: usize,
    seed: Option<u64>,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::NotMajority,
            k_neighbors: 5,
            seed: None,
        }
    }
}

impl Smote {
    /// Create a sampler with the given strategy and neighbour count.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                     |
    /// |------------------------------------|--------------------------|
    /// | [`ResampleError::InvalidRatio`]    | ratio outside (0.0, 1.0] |
    /// | [`ResampleError::InvalidNeighbors`]| `k_neighbors` is zero    |
    pub fn new(strategy: SamplingStrategy, k_neighbors: usize) -> Result<Self, ResampleError> {
        strategy.validate()?;
        if k_neighbors == 0 {
            return Err(ResampleError::InvalidNeighbors);
        }
        Ok(Self {
            strategy,
            k_neighbors,
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

    /// Set the neighbour count. Validated at `fit_resample` time.
    #[must_use]
    pub fn with_k_neighbors(mut self, k_neighbors: usize) -> Self {
        self.k_neighbors = k_neighbors;
        self
    }

    /// Return the target strategy.
    #[must_use]
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Return the configured neighbour count.
    #[must_use]
    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Return the seed, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Positions (into `rows`) of the `k` rows nearest to `rows[of]`, excluding itself.
fn nearest_neighbors(rows: &[&[f64]], of: usize, k: usize) -> Vec<usize> {
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
    for (i, row) in rows.iter().enumerate() {
        if i == of {
            continue;
        }
        let candidate = DistIdx(squared_distance(rows[of], row), i);
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }
    heap.into_sorted_vec().into_iter().map(|d| d.1).collect()
}

impl Oversampler for Smote {
    #[instrument(skip_all, fields(n_samples = features.len(), n_classes = n_classes))]
    fn fit_resample(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<Resampled, ResampleError> {
        self.strategy.validate()?;
        if self.k_neighbors == 0 {
            return Err(ResampleError::InvalidNeighbors);
        }
        let mut out = prepare(features, labels, n_classes)?;

        let indices = class_indices(labels, n_classes);
        let counts: Vec<usize> = indices.iter().map(Vec::len).collect();
        let targets = self.strategy.targets(&counts);
        let mut rng = seeded_rng(self.seed);

        for (class, rows_idx) in indices.iter().enumerate() {
            let n_new = targets[class] - counts[class];
            if n_new == 0 {
                continue;
            }

            let rows: Vec<&[f64]> = rows_idx.iter().map(|&i| features[i].as_slice()).collect();
            let k = self.k_neighbors.min(rows.len() - 1);
            let mut neighbor_cache: Vec<Option<Vec<usize>>> = vec![None; rows.len()];

            for _ in 0..n_new {
                let base = rng.gen_range(0..rows.len());
                if k == 0 {
                    out.push_synthetic(class, rows[base].to_vec());
                    continue;
                }
                let neighbors =
                    neighbor_cache[base].get_or_insert_with(|| nearest_neighbors(&rows, base, k));
                let other = rows[neighbors[rng.gen_range(0..neighbors.len())]];
                let gap: f64 = rng.r#gen();
                let row = rows[base]
                    .iter()
                    .zip(other)
                    .map(|(&x, &n)| x + gap * (n - x))
                    .collect();
                out.push_synthetic(class, row);
            }

            debug!(class, original = counts[class], synthetic = n_new, k, "class oversampled");
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_sorted_by_distance() {
        let data = [[0.0], [1.0], [5.0], [2.5]];
        let rows: Vec<&[f64]> = data.iter().map(|r| r.as_slice()).collect();
        assert_eq!(nearest_neighbors(&rows, 0, 2), vec![1, 3]);
        assert_eq!(nearest_neighbors(&rows, 2, 1), vec![3]);
    }

    #[test]
    fn duplicates_are_valid_neighbors() {
        let data = [[1.0, 1.0], [1.0, 1.0], [9.0, 9.0]];
        let rows: Vec<&[f64]> = data.iter().map(|r| r.as_slice()).collect();
        assert_eq!(nearest_neighbors(&rows, 0, 1), vec![1]);
    }

    #[test]
    fn synthetic_rows_lie_on_segments() {
        // A 1-D class: every synthetic value stays inside the class range.
        let features: Vec<Vec<f64>> = vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0]];
        let labels = vec![0, 0, 0, 1];
        let sampler = Smote::new(SamplingStrategy::SamplesPerClass(8), 2)
            .unwrap()
            .with_seed(Some(3));
        let out = sampler.fit_resample(&features, &labels, 2).unwrap();
        assert_eq!(out.n_synthetic, vec![5, 7]);
        for (row, &label) in out.features[4..].iter().zip(&out.labels[4..]) {
            if label == 0 {
                assert!((0.0..=2.0).contains(&row[0]), "{row:?}");
            } else {
                assert_eq!(row[0], 10.0);
            }
        }
    }

    #[test]
    fn zero_neighbors_rejected() {
        assert!(matches!(
            Smote::new(SamplingStrategy::NotMajority, 0),
            Err(ResampleError::InvalidNeighbors)
        ));
    }

    #[test]
    fn same_seed_same_rows() {
        let features: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let labels = vec![0, 0, 0, 0, 1, 1];
        let sampler = Smote::default().with_seed(Some(11));
        let a = sampler.fit_resample(&features, &labels, 2).unwrap();
        let b = sampler.fit_resample(&features, &labels, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_synthetic, vec![0, 2]);
    }
}
