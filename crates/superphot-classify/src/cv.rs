//! Leave-one-group-out cross-validation.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::classes::ClassSet;
use crate::dataset::Dataset;
use crate::error::ClassifyError;
use crate::pipeline::Pipeline;

/// One train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// The held-out group.
    pub group: String,
    /// Rows of every other group.
    pub train_indices: Vec<usize>,
    /// Rows of the held-out group.
    pub test_indices: Vec<usize>,
}

/// Splits rows into one fold per distinct group.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveOneGroupOut;

impl LeaveOneGroupOut {
    /// One fold per distinct group, in order of first appearance.
    ///
    /// The test sets partition `0..groups.len()`.
    #[must_use]
    pub fn split<S: AsRef<str>>(groups: &[S]) -> Vec<Fold> {
        let mut order: Vec<&str> = Vec::new();
        let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, g) in groups.iter().enumerate() {
            let g = g.as_ref();
            members
                .entry(g)
                .or_insert_with(|| {
                    order.push(g);
                    Vec::new()
                })
                .push(i);
        }
        order
            .into_iter()
            .map(|g| Fold {
                group: g.to_string(),
                train_indices: (0..groups.len())
                    .filter(|&i| groups[i].as_ref() != g)
                    .collect(),
                test_indices: members.remove(g).unwrap_or_default(),
            })
            .collect()
    }
}

/// Out-of-fold probabilities for every row of a validation set.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    /// One probability vector per validation row, in row order.
    pub probabilities: Vec<Vec<f64>>,
    /// Number of folds evaluated.
    pub n_folds: usize,
}

/// Runs a pipeline through leave-one-group-out validation.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    classes: ClassSet,
}

impl CrossValidator {
    /// Create a validator for the given class set.
    #[must_use]
    pub fn new(classes: ClassSet) -> Self {
        Self { classes }
    }

    /// Return the class set.
    #[must_use]
    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Predict every row of `test` with a pipeline trained without its group.
    ///
    /// Folds are the distinct groups of `test`. For each, the pipeline (seed
    /// offset by the fold index) is fitted on the labeled rows of `train`
    /// whose group differs from the held-out one. Passing the same dataset
    /// twice gives plain leave-one-group-out.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                            |
    /// |--------------------------------------|-------------------------------------------------|
    /// | [`ClassifyError::FoldMissingClass`]  | a fold's training rows lack a class             |
    /// | [`ClassifyError::LengthMismatch`]    | `train` and `test` have different feature widths |
    /// | other variants                       | from [`Pipeline::fit`] or prediction            |
    #[instrument(skip_all, fields(n_train = train.len(), n_test = test.len()))]
    pub fn validate(
        &self,
        pipeline: &Pipeline,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<CrossValidation, ClassifyError> {
        if train.feature_names().len() != test.feature_names().len() {
            return Err(ClassifyError::LengthMismatch {
                what: "validation feature columns",
                expected: train.feature_names().len(),
                got: test.feature_names().len(),
            });
        }
        train.check_labels(&self.classes)?;
        test.check_labels(&self.classes)?;

        let folds = LeaveOneGroupOut::split(test.groups());
        let mut probabilities: Vec<Vec<f64>> = vec![Vec::new(); test.len()];

        for (fold_index, fold) in folds.iter().enumerate() {
            let train_rows: Vec<usize> = (0..train.len())
                .filter(|&i| train.groups()[i] != fold.group)
                .collect();
            let (features, labels) = train.labeled_rows(&train_rows);
            self.check_fold_classes(&fold.group, &labels)?;

            let fitted = pipeline.reseeded(fold_index as u64).fit(
                &features,
                &labels,
                &self.classes,
                train.feature_names(),
            )?;

            let held_out: Vec<Vec<f64>> = fold
                .test_indices
                .iter()
                .map(|&i| test.features()[i].clone())
                .collect();
            let fold_proba = fitted.predict_proba(&held_out)?;
            for (&row, proba) in fold.test_indices.iter().zip(fold_proba) {
                probabilities[row] = proba;
            }

            debug!(
                fold = fold_index,
                group = %fold.group,
                n_train = labels.len(),
                n_test = fold.test_indices.len(),
                "fold completed"
            );
        }

        info!(n_folds = folds.len(), "cross-validation complete");

        Ok(CrossValidation {
            probabilities,
            n_folds: folds.len(),
        })
    }

    fn check_fold_classes(&self, group: &str, labels: &[usize]) -> Result<(), ClassifyError> {
        let mut present = vec![false; self.classes.len()];
        for &l in labels {
            present[l] = true;
        }
        match present.iter().position(|p| !p) {
            Some(class) => Err(ClassifyError::FoldMissingClass {
                group: group.to_string(),
                class: self.classes.name(class).unwrap_or_default().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_partition_rows() {
        let groups = ["a", "b", "a", "c", "b"];
        let folds = LeaveOneGroupOut::split(&groups);
        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].group, "a");
        assert_eq!(folds[0].test_indices, vec![0, 2]);
        assert_eq!(folds[0].train_indices, vec![1, 3, 4]);
        assert_eq!(folds[2].group, "c");

        let mut covered: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_groups_give_no_folds() {
        assert!(LeaveOneGroupOut::split::<&str>(&[]).is_empty());
    }

    #[test]
    fn fold_missing_class_is_fatal() {
        let names = vec!["x".to_string()];
        let ds = Dataset::new(
            names,
            vec![vec![0.0], vec![0.1], vec![5.0]],
            vec![Some(0), Some(0), Some(1)],
            vec!["g1".into(), "g2".into(), "g3".into()],
        )
        .unwrap();
        let classes = ClassSet::new(["I", "II"]).unwrap();
        let pipeline = Pipeline::default()
            .with_classifier(superphot_rf::RandomForestConfig::new(5).unwrap());
        let err = CrossValidator::new(classes)
            .validate(&pipeline, &ds, &ds)
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::FoldMissingClass { ref group, ref class } if group == "g3" && class == "II"
        ));
    }
}
