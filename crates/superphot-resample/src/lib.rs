//! Synthetic oversampling for class-imbalanced feature tables.
//!
//! Two interchangeable strategies behind the [`Oversampler`] trait:
//! per-class multivariate Gaussian draws and SMOTE interpolation. Both keep
//! the original rows as an unchanged prefix and append synthetic rows.

mod eigen;
mod error;
mod gaussian;
mod sampler;
mod smote;
mod stats;
mod strategy;

pub use error::ResampleError;
pub use gaussian::MultivariateGaussian;
pub use sampler::{Oversampler, Resampled, Sampler};
pub use smote::Smote;
pub use strategy::SamplingStrategy;
