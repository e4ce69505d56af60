//! Per-class target counts for oversampling.

use serde::{Deserialize, Serialize};

use crate::error::ResampleError;

/// How many rows each class should have after oversampling.
///
/// Oversampling is additive only: a class is never reduced, and a class with
/// no rows in the input is never synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Raise every class, the majority included, to this many rows.
    SamplesPerClass(usize),
    /// Raise every class except the majority to the majority count.
    NotMajority,
    /// Raise every non-majority class to `floor(ratio * majority_count)`.
    Ratio(f64),
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::SamplesPerClass(1000)
    }
}

impl SamplingStrategy {
    /// Check the strategy's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::InvalidRatio`] when a `Ratio` lies outside (0.0, 1.0].
    pub fn validate(&self) -> Result<(), ResampleError> {
        match *self {
            SamplingStrategy::Ratio(ratio) if !(ratio > 0.0 && ratio <= 1.0) => {
                Err(ResampleError::InvalidRatio { ratio })
            }
            _ => Ok(()),
        }
    }

    /// Compute the total row count each class should end up with.
    ///
    /// The result has the same length as `class_counts` and is never below
    /// the original count. Absent classes keep a target of zero.
    #[must_use]
    pub fn targets(&self, class_counts: &[usize]) -> Vec<usize> {
        let majority = class_counts.iter().copied().max().unwrap_or(0);
        class_counts
            .iter()
            .map(|&count| {
                if count == 0 {
                    return 0;
                }
                let target = match *self {
                    SamplingStrategy::SamplesPerClass(t) => t,
                    SamplingStrategy::NotMajority => majority,
                    SamplingStrategy::Ratio(_) if count == majority => count,
                    SamplingStrategy::Ratio(r) => (r * majority as f64).floor() as usize,
                };
                target.max(count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SamplingStrategy;

    #[test]
    fn samples_per_class_includes_majority() {
        let targets = SamplingStrategy::SamplesPerClass(10).targets(&[12, 3, 0, 10]);
        assert_eq!(targets, vec![12, 10, 0, 10]);
    }

    #[test]
    fn not_majority_raises_to_majority() {
        let targets = SamplingStrategy::NotMajority.targets(&[2, 7, 5]);
        assert_eq!(targets, vec![7, 7, 7]);
    }

    #[test]
    fn ratio_floors_and_never_reduces() {
        let targets = SamplingStrategy::Ratio(0.5).targets(&[9, 1, 6]);
        assert_eq!(targets, vec![9, 4, 6]);
    }

    #[test]
    fn ratio_bounds_checked() {
        assert!(SamplingStrategy::Ratio(0.0).validate().is_err());
        assert!(SamplingStrategy::Ratio(1.5).validate().is_err());
        assert!(SamplingStrategy::Ratio(f64::NAN).validate().is_err());
        assert!(SamplingStrategy::Ratio(1.0).validate().is_ok());
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_string(&SamplingStrategy::SamplesPerClass(50)).unwrap();
        assert_eq!(json, r#"{"samples_per_class":50}"#);
        let parsed: SamplingStrategy = serde_json::from_str(r#""not_majority""#).unwrap();
        assert_eq!(parsed, SamplingStrategy::NotMajority);
    }
}
