/// Errors from oversampling operations.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    /// Returned when a sampler name is not recognized.
    #[error("unknown oversampling strategy {name:?} (expected \"mvg\" or \"smote\")")]
    UnknownSampler {
        /// The name that failed to parse.
        name: String,
    },

    /// Returned when a `Ratio` strategy is outside (0.0, 1.0].
    #[error("sampling ratio must be in (0.0, 1.0], got {ratio}")]
    InvalidRatio {
        /// The invalid ratio.
        ratio: f64,
    },

    /// Returned when SMOTE is configured with zero neighbours.
    #[error("k_neighbors must be at least 1")]
    InvalidNeighbors,

    /// Returned when the input has zero rows.
    #[error("cannot oversample an empty dataset")]
    EmptyDataset,

    /// Returned when the number of labels differs from the number of rows.
    #[error("got {n_labels} labels for {n_samples} rows")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a label is not a valid index into the class set.
    #[error("row {sample_index} has label {label}, but only {n_classes} classes are configured")]
    LabelOutOfRange {
        /// The zero-based index of the offending row.
        sample_index: usize,
        /// The offending label.
        label: usize,
        /// Number of configured classes.
        n_classes: usize,
    },

    /// Returned when a row has a different number of features than the first.
    #[error("row {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the row.
        got: usize,
        /// The zero-based index of the offending row.
        sample_index: usize,
    },

    /// Returned when an input value is NaN or infinite.
    #[error("non-finite value at row {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending row.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },
}
