//! Supernova-type classification workflow.
//!
//! A [`Pipeline`] standardizes features, oversamples minority classes and
//! fits a class-weighted random forest. [`CrossValidator`] runs it through
//! leave-one-group-out validation, [`aggregate_by_group`] averages the
//! out-of-fold probabilities per object, [`Evaluation`] scores them, and
//! [`Sweep`] repeats all of that over a [`ParameterGrid`].

mod aggregate;
mod classes;
mod cv;
mod dataset;
mod error;
mod metrics;
mod params;
mod pipeline;
mod scaler;
mod sweep;

pub use aggregate::{GroupPrediction, aggregate_by_group};
pub use classes::ClassSet;
pub use cv::{CrossValidation, CrossValidator, Fold, LeaveOneGroupOut};
pub use dataset::Dataset;
pub use error::ClassifyError;
pub use metrics::{ClassMetrics, ConfusionMatrix, Evaluation};
pub use params::{ParamSet, ParameterGrid};
pub use pipeline::{FittedPipeline, Pipeline};
pub use scaler::StandardScaler;
pub use sweep::{Sweep, SweepRecord, artifact_name};
