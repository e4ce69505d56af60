//! Feature rows with optional labels and group keys.

use crate::classes::ClassSet;
use crate::error::ClassifyError;

/// A feature table ready for training or validation.
///
/// Rows with `labels[i] == None` are unlabeled: they are predicted but never
/// trained on or scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<Option<usize>>,
    groups: Vec<String>,
}

impl Dataset {
    /// Assemble a dataset, checking that the per-row vectors line up.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::LengthMismatch`] when `labels`, `groups` or a
    /// feature row disagrees in length with the rest.
    pub fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<Option<usize>>,
        groups: Vec<String>,
    ) -> Result<Self, ClassifyError> {
        let n_rows = features.len();
        if labels.len() != n_rows {
            return Err(ClassifyError::LengthMismatch {
                what: "labels",
                expected: n_rows,
                got: labels.len(),
            });
        }
        if groups.len() != n_rows {
            return Err(ClassifyError::LengthMismatch {
                what: "groups",
                expected: n_rows,
                got: groups.len(),
            });
        }
        if let Some(row) = features.iter().find(|r| r.len() != feature_names.len()) {
            return Err(ClassifyError::LengthMismatch {
                what: "feature row",
                expected: feature_names.len(),
                got: row.len(),
            });
        }
        Ok(Self {
            feature_names,
            features,
            labels,
            groups,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// `true` when the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Per-row labels; `None` marks an unlabeled row.
    #[must_use]
    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels
    }

    /// Per-row group keys.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Indices of the labeled rows, in order.
    #[must_use]
    pub fn labeled_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.labels[i].is_some()).collect()
    }

    /// Features and labels of the given rows, skipping unlabeled ones.
    pub(crate) fn labeled_rows(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
        indices
            .iter()
            .filter_map(|&i| self.labels[i].map(|l| (self.features[i].clone(), l)))
            .unzip()
    }

    /// Check that every label indexes into `classes`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Forest`] wrapping a label-out-of-range error.
    pub fn check_labels(&self, classes: &ClassSet) -> Result<(), ClassifyError> {
        for (sample_index, label) in self.labels.iter().enumerate() {
            if let Some(label) = *label
                && label >= classes.len()
            {
                return Err(superphot_rf::RfError::LabelOutOfRange {
                    sample_index,
                    label,
                    n_classes: classes.len(),
                }
                .into());
            }
        }
        Ok(())
    }
}
