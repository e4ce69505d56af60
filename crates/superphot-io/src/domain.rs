//! Domain types for superphot-io.

use std::collections::BTreeSet;

use superphot_classify::{ClassSet, ClassifyError, Dataset};

use crate::IoError;

/// An observation table: identifiers, optional type labels, metadata and
/// numeric features.
///
/// Produced by [`TableReader`](crate::TableReader). All per-row vectors are
/// parallel: `row_ids[i]`, `group_ids[i]`, `types[i]`, `metadata[i]` and
/// `features[i]` describe the same row.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    row_ids: Vec<String>,
    group_ids: Vec<String>,
    types: Vec<Option<String>>,
    metadata_names: Vec<String>,
    metadata: Vec<Vec<String>>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl ObservationTable {
    pub(crate) fn new(
        row_ids: Vec<String>,
        group_ids: Vec<String>,
        types: Vec<Option<String>>,
        metadata_names: Vec<String>,
        metadata: Vec<Vec<String>>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            row_ids,
            group_ids,
            types,
            metadata_names,
            metadata,
            feature_names,
            features,
        }
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the row identifiers.
    #[must_use]
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Return the group identifier of every row.
    #[must_use]
    pub fn group_ids(&self) -> &[String] {
        &self.group_ids
    }

    /// Return the type label of every row; `None` marks unlabeled rows.
    #[must_use]
    pub fn types(&self) -> &[Option<String>] {
        &self.types
    }

    /// Return the metadata column names.
    #[must_use]
    pub fn metadata_names(&self) -> &[String] {
        &self.metadata_names
    }

    /// Return the metadata values: `metadata[row][column]`.
    #[must_use]
    pub fn metadata(&self) -> &[Vec<String>] {
        &self.metadata
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix: `features[row][feature]`.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Build the class set from the distinct type labels.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::EmptyClassSet`] (wrapped) when no row is labeled.
    pub fn class_set(&self) -> Result<ClassSet, IoError> {
        let names: BTreeSet<&str> = self.types.iter().flatten().map(String::as_str).collect();
        Ok(ClassSet::new(names)?)
    }

    /// Convert into a [`Dataset`], encoding type labels against `classes`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownClass`] (wrapped) when a row carries a
    /// type that is not in `classes`.
    pub fn to_dataset(&self, classes: &ClassSet) -> Result<Dataset, IoError> {
        let labels = self
            .types
            .iter()
            .map(|t| t.as_deref().map(|name| classes.encode(name)).transpose())
            .collect::<Result<Vec<_>, ClassifyError>>()?;
        Ok(Dataset::new(
            self.feature_names.clone(),
            self.features.clone(),
            labels,
            self.group_ids.clone(),
        )?)
    }

    /// Class set and datasets for scoring this table by leave-one-group-out.
    ///
    /// `train` defaults to this table. Unlabeled rows are dropped from both
    /// sides, so every fold holds out a group that can be scored. The class
    /// set comes from the training rows.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Classify`] when the training rows carry no type, or
    /// when this table has a type the training rows lack.
    pub fn validation_datasets(
        &self,
        train: Option<&ObservationTable>,
    ) -> Result<(ClassSet, Dataset, Dataset), IoError> {
        let train = train.unwrap_or(self).labeled();
        let classes = train.class_set()?;
        let train_set = train.to_dataset(&classes)?;
        let test_set = self.labeled().to_dataset(&classes)?;
        Ok((classes, train_set, test_set))
    }

    /// Keep only the labeled rows.
    #[must_use]
    pub fn labeled(&self) -> Self {
        let keep: Vec<usize> = (0..self.n_rows()).filter(|&i| self.types[i].is_some()).collect();
        let pick = |v: &[String]| keep.iter().map(|&i| v[i].clone()).collect::<Vec<_>>();
        Self {
            row_ids: pick(&self.row_ids),
            group_ids: pick(&self.group_ids),
            types: keep.iter().map(|&i| self.types[i].clone()).collect(),
            metadata_names: self.metadata_names.clone(),
            metadata: keep.iter().map(|&i| self.metadata[i].clone()).collect(),
            feature_names: self.feature_names.clone(),
            features: keep.iter().map(|&i| self.features[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ObservationTable {
        ObservationTable::new(
            vec!["a1".into(), "a2".into(), "b1".into()],
            vec!["A".into(), "A".into(), "B".into()],
            vec![Some("SNIa".into()), Some("SNIa".into()), None],
            vec!["hostz".into()],
            vec![vec!["0.1".into()], vec!["0.1".into()], vec!["".into()]],
            vec!["x".into()],
            vec![vec![1.0], vec![2.0], vec![3.0]],
        )
    }

    #[test]
    fn class_set_ignores_unlabeled_rows() {
        let classes = table().class_set().unwrap();
        assert_eq!(classes.names(), &["SNIa".to_string()]);
    }

    #[test]
    fn dataset_keeps_unlabeled_rows_as_none() {
        let t = table();
        let ds = t.to_dataset(&t.class_set().unwrap()).unwrap();
        assert_eq!(ds.labels(), &[Some(0), Some(0), None]);
        assert_eq!(ds.groups()[2], "B");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let classes = ClassSet::new(["SNII"]).unwrap();
        let err = table().to_dataset(&classes).unwrap_err();
        assert!(matches!(
            err,
            IoError::Classify(ClassifyError::UnknownClass { .. })
        ));
    }

    #[test]
    fn validation_datasets_hold_only_labeled_rows() {
        let (classes, train, test) = table().validation_datasets(None).unwrap();
        assert_eq!(classes.names(), &["SNIa".to_string()]);
        assert_eq!(train.len(), 2);
        assert_eq!(test.groups(), &["A".to_string(), "A".to_string()]);
        assert!(test.labels().iter().all(Option::is_some));
    }

    #[test]
    fn labeled_drops_unlabeled_rows() {
        let labeled = table().labeled();
        assert_eq!(labeled.n_rows(), 2);
        assert_eq!(labeled.row_ids(), &["a1".to_string(), "a2".to_string()]);
    }
}
