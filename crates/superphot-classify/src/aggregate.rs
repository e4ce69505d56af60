//! Per-group averaging of row-level probabilities.

use std::collections::HashMap;

use crate::error::ClassifyError;

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |best, (idx, &v)| {
            if v > best.1 { (idx, v) } else { best }
        })
        .0
}

/// Mean class probabilities of all rows sharing a group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPrediction {
    /// The group key.
    pub group: String,
    /// The group's label, if any of its rows is labeled.
    pub label: Option<usize>,
    /// Mean probability per class, in class-set order.
    pub probabilities: Vec<f64>,
    /// Number of rows averaged.
    pub n_rows: usize,
    /// Index of the group's first row in the input.
    pub first_row: usize,
}

impl GroupPrediction {
    /// The most probable class for the group.
    #[must_use]
    pub fn predicted(&self) -> usize {
        argmax(&self.probabilities)
    }
}

/// Average `probabilities` per group, in order of first appearance.
///
/// # Errors
///
/// | Variant                                  | When                                          |
/// |------------------------------------------|-----------------------------------------------|
/// | [`ClassifyError::LengthMismatch`]        | the three inputs differ in length             |
/// | [`ClassifyError::ConflictingGroupLabel`] | two labeled rows of one group disagree        |
pub fn aggregate_by_group(
    groups: &[String],
    labels: &[Option<usize>],
    probabilities: &[Vec<f64>],
) -> Result<Vec<GroupPrediction>, ClassifyError> {
    for (what, got) in [("labels", labels.len()), ("probabilities", probabilities.len())] {
        if got != groups.len() {
            return Err(ClassifyError::LengthMismatch {
                what,
                expected: groups.len(),
                got,
            });
        }
    }

    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<GroupPrediction> = Vec::new();

    for (row, ((group, label), proba)) in groups.iter().zip(labels).zip(probabilities).enumerate() {
        let slot = *position.entry(group.as_str()).or_insert_with(|| {
            out.push(GroupPrediction {
                group: group.clone(),
                label: None,
                probabilities: vec![0.0; proba.len()],
                n_rows: 0,
                first_row: row,
            });
            out.len() - 1
        });
        let entry = &mut out[slot];
        match (entry.label, *label) {
            (Some(a), Some(b)) if a != b => {
                return Err(ClassifyError::ConflictingGroupLabel {
                    group: group.clone(),
                });
            }
            (None, Some(b)) => entry.label = Some(b),
            _ => {}
        }
        for (acc, p) in entry.probabilities.iter_mut().zip(proba) {
            *acc += p;
        }
        entry.n_rows += 1;
    }

    for entry in &mut out {
        let n = entry.n_rows as f64;
        entry.probabilities.iter_mut().for_each(|p| *p /= n);
    }
    Ok(out)
}
