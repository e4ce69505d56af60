/// Errors raised while configuring, training or querying a forest.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// A hyperparameter is outside its accepted range.
    #[error("invalid {parameter} = {value}: expected {expected}")]
    InvalidConfig {
        /// Name of the offending hyperparameter.
        parameter: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// Human-readable description of the accepted range.
        expected: &'static str,
    },

    /// `max_features` resolved to zero or to more columns than the data has.
    #[error("max_features resolved to {max_features}, must be in [1, {n_features}]")]
    InvalidMaxFeatures { max_features: usize, n_features: usize },

    #[error("could not build the training thread pool")]
    ThreadPool {
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    #[error("no training rows")]
    EmptyDataset,

    #[error("training rows have no feature columns")]
    ZeroFeatures,

    #[error("{n_labels} labels given for {n_samples} rows")]
    LabelCountMismatch { n_samples: usize, n_labels: usize },

    /// A label does not index into the class set.
    #[error("row {sample_index} has label {label} but there are {n_classes} classes")]
    LabelOutOfRange {
        sample_index: usize,
        label: usize,
        n_classes: usize,
    },

    /// A class of the class set has no training rows.
    #[error("class {class} has no training rows")]
    MissingClass { class: usize },

    /// Training rows have ragged widths.
    #[error("row {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        expected: usize,
        got: usize,
        sample_index: usize,
    },

    /// A row passed to prediction has a different width than the training rows.
    #[error("cannot predict a row of {got} features with a forest fitted on {expected}")]
    PredictionFeatureMismatch { expected: usize, got: usize },

    #[error("row {sample_index} feature {feature_index} is NaN or infinite")]
    NonFiniteValue {
        sample_index: usize,
        feature_index: usize,
    },
}

impl RfError {
    pub(crate) fn config(parameter: &'static str, value: impl ToString, expected: &'static str) -> Self {
        RfError::InvalidConfig {
            parameter,
            value: value.to_string(),
            expected,
        }
    }
}
