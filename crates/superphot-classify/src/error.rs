use std::path::PathBuf;

use superphot_resample::ResampleError;
use superphot_rf::RfError;

/// Errors from the classification pipeline, validation, metrics and sweeps.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Returned when the forest rejects its configuration or data.
    #[error(transparent)]
    Forest(#[from] RfError),

    /// Returned when oversampling rejects its configuration or data.
    #[error(transparent)]
    Resample(#[from] ResampleError),

    /// Returned when a class set is built from zero names.
    #[error("class set must contain at least one class")]
    EmptyClassSet,

    /// Returned when a label name is not part of the class set.
    #[error("class {name:?} is not in the class set")]
    UnknownClass {
        /// The unrecognized class name.
        name: String,
    },

    /// Returned when a row's width differs from the columns the scaler was fitted on.
    #[error("row {row} has {got} features, expected {expected}")]
    RowWidth {
        /// Zero-based index of the row in the input.
        row: usize,
        /// Number of fitted columns.
        expected: usize,
        /// Width of the offending row.
        got: usize,
    },

    /// Returned when parallel per-row vectors disagree in length.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which vector is the wrong length.
        what: &'static str,
        /// Number of entries expected.
        expected: usize,
        /// Number of entries found.
        got: usize,
    },

    /// Returned when a fold's training rows lack a class of the class set.
    #[error("training rows for held-out group {group:?} contain no samples of class {class:?}")]
    FoldMissingClass {
        /// The held-out group.
        group: String,
        /// The class missing from the training rows.
        class: String,
    },

    /// Returned when training is requested on a dataset without labeled rows.
    #[error("dataset has no labeled rows")]
    NoLabeledRows,

    /// Returned when the rows of one group carry different labels.
    #[error("group {group:?} has rows with different labels")]
    ConflictingGroupLabel {
        /// The offending group.
        group: String,
    },

    /// Returned when metrics are requested for zero samples.
    #[error("cannot evaluate zero predictions")]
    EmptyEvaluation,

    /// Returned when a sweep parameter name does not address a pipeline field.
    #[error("unknown pipeline parameter {name:?}")]
    UnknownParameter {
        /// The parameter name.
        name: String,
    },

    /// Returned when a sweep parameter value has the wrong type or range.
    #[error("invalid value {value} for pipeline parameter {name:?}: {reason}")]
    InvalidParameterValue {
        /// The parameter name.
        name: String,
        /// The rejected value, as JSON.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Returned when a parameter grid is not an object (or list of objects) of lists.
    #[error("invalid parameter grid: {reason}")]
    InvalidParameterGrid {
        /// What is wrong with the grid.
        reason: String,
    },

    /// Returned when the sweep worker pool cannot be built.
    #[error("failed to build sweep thread pool")]
    ThreadPool {
        /// The underlying rayon error.
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when a sweep artifact cannot be written.
    #[error("failed to write sweep artifact {path}")]
    Artifact {
        /// The artifact path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Returned when a sweep artifact cannot be serialized.
    #[error("failed to serialize sweep artifact")]
    Json(#[from] serde_json::Error),
}
