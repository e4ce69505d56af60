//! Probability averaging over the trees of a fitted forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::{RandomForest, TrainingSummary};
use crate::tree::DecisionTree;

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = idx;
        }
    }
    best
}

impl RandomForest {
    /// Mean of the tree leaf distributions for one row, one entry per class.
    ///
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] when the row width differs from training.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut mean = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in mean.iter_mut().zip(tree.leaf_proba(sample)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        for p in &mut mean {
            *p /= n_trees;
        }
        Ok(mean)
    }

    /// Most probable class of one row.
    ///
    /// # Errors
    ///
    /// As [`RandomForest::predict_proba`].
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        self.predict_proba(sample).map(|proba| argmax(&proba))
    }

    /// [`RandomForest::predict_proba`] over many rows in parallel.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// [`RandomForest::predict`] over many rows in parallel.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    #[must_use]
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::argmax;
    use crate::config::RandomForestConfig;
    use crate::error::RfError;

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn probabilities_cover_every_class() {
        let features = vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]];
        let forest = RandomForestConfig::new(4)
            .unwrap()
            .fit(&features, &[0, 0, 1, 1], 3, &["x".to_string()]);
        // Class 2 has no rows.
        assert!(forest.is_err());

        let forest = RandomForestConfig::new(4)
            .unwrap()
            .fit(&features, &[0, 0, 1, 1], 2, &["x".to_string()])
            .unwrap();
        let proba = forest.predict_proba(&[0.5]).unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(&[vec![0.0], vec![1.0]], &[0, 1], 2, &["x".to_string()])
            .unwrap();
        assert!(matches!(
            forest.predict(&[0.0, 1.0]),
            Err(RfError::PredictionFeatureMismatch {
                expected: 1,
                got: 2
            })
        ));
    }
}
