//! Class-weighted random forest classifier.
//!
//! CART trees split on Gini or entropy impurity, grown on bootstrap draws
//! with per-class row weights, optionally on a dedicated rayon pool.
//! Fitting is deterministic for a given seed regardless of thread count.

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod split;
mod tree;

pub use config::{ClassWeight, MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use forest::{RandomForest, TrainingSummary};
pub use node::{Node, NodeStats};
pub use split::SplitCriterion;
pub use tree::DecisionTree;
