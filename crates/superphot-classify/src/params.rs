//! Hyperparameter grids and random sampling from them.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::warn;

use crate::error::ClassifyError;

/// One combination of parameter values, keyed by parameter name.
pub type ParamSet = BTreeMap<String, Value>;

/// A grid (or union of grids) of candidate parameter values.
///
/// Within one grid, combinations are enumerated with keys in sorted order
/// and the last key varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    grids: Vec<BTreeMap<String, Vec<Value>>>,
}

impl ParameterGrid {
    /// Parse a grid from JSON: an object of `name -> [values]`, or a list of
    /// such objects. A scalar value counts as a one-element list.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidParameterGrid`] for any other shape or
    /// for an empty value list.
    pub fn from_json(value: &Value) -> Result<Self, ClassifyError> {
        let objects: Vec<&serde_json::Map<String, Value>> = match value {
            Value::Object(object) => vec![object],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object()
                        .ok_or_else(|| ClassifyError::InvalidParameterGrid {
                            reason: "list entries must be objects".into(),
                        })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(ClassifyError::InvalidParameterGrid {
                    reason: "expected an object or a list of objects".into(),
                });
            }
        };

        let mut grids = Vec::with_capacity(objects.len());
        for object in objects {
            let mut grid = BTreeMap::new();
            for (name, values) in object {
                let values = match values {
                    Value::Array(items) if items.is_empty() => {
                        return Err(ClassifyError::InvalidParameterGrid {
                            reason: format!("parameter {name:?} has no values"),
                        });
                    }
                    Value::Array(items) => items.clone(),
                    scalar => vec![scalar.clone()],
                };
                grid.insert(name.clone(), values);
            }
            grids.push(grid);
        }
        Ok(Self { grids })
    }

    /// Total number of combinations across all grids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.iter().map(grid_size).sum()
    }

    /// `true` when the grid has no combinations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, in enumeration order.
    #[must_use]
    pub fn combinations(&self) -> Vec<ParamSet> {
        (0..self.len()).filter_map(|i| self.combination(i)).collect()
    }

    /// `n_iter` distinct combinations drawn uniformly without replacement.
    ///
    /// When `n_iter` is at least the grid size, the full grid is returned.
    #[must_use]
    pub fn sample(&self, n_iter: usize, seed: u64) -> Vec<ParamSet> {
        let total = self.len();
        if n_iter >= total {
            if n_iter > total {
                warn!(n_iter, grid_size = total, "n_iter exceeds the grid size; using the full grid");
            }
            return self.combinations();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rand::seq::index::sample(&mut rng, total, n_iter)
            .into_iter()
            .filter_map(|i| self.combination(i))
            .collect()
    }

    /// The combination at position `index` in enumeration order.
    fn combination(&self, mut index: usize) -> Option<ParamSet> {
        for grid in &self.grids {
            let size = grid_size(grid);
            if index >= size {
                index -= size;
                continue;
            }
            let mut set = ParamSet::new();
            for (name, values) in grid.iter().rev() {
                set.insert(name.clone(), values[index % values.len()].clone());
                index /= values.len();
            }
            return Some(set);
        }
        None
    }
}

fn grid_size(grid: &BTreeMap<String, Vec<Value>>) -> usize {
    grid.values().map(Vec::len).product()
}
