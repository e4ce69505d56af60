//! Arena nodes of a fitted decision tree.

/// Counts recorded at a node while the tree was grown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats {
    /// Training rows that reached the node, bootstrap repeats included.
    pub n_samples: usize,
    /// Sum of the class weights of those rows.
    pub weight: f64,
    /// Impurity of the weighted class counts under the tree's criterion.
    pub impurity: f64,
}

/// A node of a tree arena. Children are indices into the same arena.
#[derive(Debug, Clone)]
pub enum Node {
    /// Rows with `sample[feature] <= threshold` descend to `left`.
    Branch {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        stats: NodeStats,
    },
    /// Terminal node holding the normalized, class-weighted distribution.
    Leaf { proba: Vec<f64>, stats: NodeStats },
}

impl Node {
    /// Return the growth-time counts of this node.
    #[must_use]
    pub fn stats(&self) -> NodeStats {
        match self {
            Node::Branch { stats, .. } | Node::Leaf { stats, .. } => *stats,
        }
    }

    /// Return `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Arena index of the child `sample` descends to; `None` at a leaf.
    pub(crate) fn next(&self, sample: &[f64]) -> Option<usize> {
        match self {
            Node::Branch {
                feature,
                threshold,
                left,
                right,
                ..
            } => Some(if sample[*feature] <= *threshold { *left } else { *right }),
            Node::Leaf { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeStats};

    const STATS: NodeStats = NodeStats {
        n_samples: 4,
        weight: 4.0,
        impurity: 0.5,
    };

    #[test]
    fn branch_routes_on_threshold() {
        let branch = Node::Branch {
            feature: 1,
            threshold: 2.5,
            left: 1,
            right: 2,
            stats: STATS,
        };
        assert_eq!(branch.next(&[9.0, 2.5]), Some(1));
        assert_eq!(branch.next(&[9.0, 2.6]), Some(2));
        assert!(!branch.is_leaf());
    }

    #[test]
    fn leaf_stops_descent() {
        let leaf = Node::Leaf {
            proba: vec![1.0, 0.0],
            stats: STATS,
        };
        assert_eq!(leaf.next(&[0.0, 0.0]), None);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.stats().n_samples, 4);
    }
}
