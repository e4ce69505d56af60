//! CART decision trees grown on bootstrap samples.

use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::node::{Node, NodeStats};
use crate::split::SplitContext;

/// A fitted decision tree stored as a node arena; the root is at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class distribution of the leaf `sample` falls into.
    ///
    /// `sample` must have the width the tree was grown on.
    pub(crate) fn leaf_proba(&self, sample: &[f64]) -> &[f64] {
        let mut at = 0;
        while let Some(child) = self.nodes[at].next(sample) {
            at = child;
        }
        match &self.nodes[at] {
            Node::Leaf { proba, .. } => proba,
            Node::Branch { .. } => &[],
        }
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the length of the longest root-to-leaf path; a lone root leaf is 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(0usize, 0usize)];
        while let Some((at, d)) = pending.pop() {
            match self.nodes.get(at) {
                Some(Node::Branch { left, right, .. }) => {
                    pending.push((*left, d + 1));
                    pending.push((*right, d + 1));
                }
                Some(Node::Leaf { .. }) => deepest = deepest.max(d),
                None => {}
            }
        }
        deepest
    }
}

/// Grows one tree depth-first into an arena.
pub(crate) struct TreeGrower<'a> {
    ctx: SplitContext<'a>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl<'a> TreeGrower<'a> {
    pub(crate) fn new(
        ctx: SplitContext<'a>,
        max_depth: Option<usize>,
        min_samples_split: usize,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            ctx,
            max_depth,
            min_samples_split,
            rng,
            nodes: Vec::new(),
        }
    }

    /// Grow over `sample_indices`, which may repeat (bootstrap draws).
    pub(crate) fn grow(mut self, sample_indices: &[usize]) -> DecisionTree {
        self.grow_node(sample_indices, 0);
        trace!(n_nodes = self.nodes.len(), "tree grown");
        DecisionTree { nodes: self.nodes }
    }

    fn grow_node(&mut self, sample_indices: &[usize], depth: usize) -> usize {
        let counts = self.ctx.weighted_counts(sample_indices);
        let weight: f64 = counts.iter().sum();
        let stats = NodeStats {
            n_samples: sample_indices.len(),
            weight,
            impurity: self.ctx.criterion.impurity(&counts, weight),
        };

        let at_limit = self.max_depth.is_some_and(|max| depth >= max)
            || stats.n_samples < self.min_samples_split
            || stats.impurity == 0.0;
        let split = if at_limit {
            None
        } else {
            self.ctx.find_best_split(sample_indices, &mut self.rng)
        };

        let at = self.nodes.len();
        let Some(split) = split else {
            let proba = if weight > 0.0 {
                counts.iter().map(|c| c / weight).collect()
            } else {
                vec![1.0 / counts.len() as f64; counts.len()]
            };
            self.nodes.push(Node::Leaf { proba, stats });
            return at;
        };

        // Placeholder until both subtrees have their indices.
        self.nodes.push(Node::Leaf {
            proba: Vec::new(),
            stats,
        });
        let left = self.grow_node(&split.left_indices, depth + 1);
        let right = self.grow_node(&split.right_indices, depth + 1);
        self.nodes[at] = Node::Branch {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            stats,
        };
        at
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::forest::to_column_major;
    use crate::split::SplitCriterion;

    fn grow(rows: &[Vec<f64>], labels: &[usize], class_weights: &[f64], max_depth: Option<usize>) -> DecisionTree {
        let columns = to_column_major(rows, rows[0].len());
        let ctx = SplitContext {
            features: &columns,
            labels,
            class_weights,
            criterion: SplitCriterion::Entropy,
            max_features: columns.len(),
            min_samples_leaf: 1,
        };
        let indices: Vec<usize> = (0..rows.len()).collect();
        TreeGrower::new(ctx, max_depth, 2, ChaCha8Rng::seed_from_u64(7)).grow(&indices)
    }

    fn xor() -> (Vec<Vec<f64>>, Vec<usize>) {
        let rows = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        (rows, vec![0, 1, 1, 0])
    }

    #[test]
    fn pure_node_stays_a_leaf() {
        let tree = grow(&[vec![1.0], vec![2.0]], &[1, 1], &[1.0, 1.0], None);
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.leaf_proba(&[5.0]), &[0.0, 1.0]);
    }

    #[test]
    fn xor_is_learned_at_depth_two() {
        let (rows, labels) = xor();
        let tree = grow(&rows, &labels, &[1.0, 1.0], None);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 4);
        for (row, &label) in rows.iter().zip(&labels) {
            assert_eq!(tree.leaf_proba(row)[label], 1.0);
        }
    }

    #[test]
    fn depth_limit_is_respected() {
        let (rows, labels) = xor();
        let tree = grow(&rows, &labels, &[1.0, 1.0], Some(1));
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn class_weights_shape_leaf_distribution() {
        // Identical rows cannot be split, so the root is the only leaf.
        let rows = vec![vec![0.0]; 4];
        let tree = grow(&rows, &[0, 1, 1, 1], &[3.0, 1.0], None);
        let proba = tree.leaf_proba(&[0.0]);
        assert!((proba[0] - 0.5).abs() < 1e-12);
        assert!((proba[1] - 0.5).abs() < 1e-12);
        let root = tree.nodes()[0].stats();
        assert_eq!(root.n_samples, 4);
        assert!((root.weight - 6.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_indices_count_twice() {
        let columns = vec![vec![0.0, 1.0]];
        let ctx = SplitContext {
            features: &columns,
            labels: &[0, 1],
            class_weights: &[1.0, 1.0],
            criterion: SplitCriterion::Gini,
            max_features: 1,
            min_samples_leaf: 1,
        };
        let tree = TreeGrower::new(ctx, Some(0), 2, ChaCha8Rng::seed_from_u64(0)).grow(&[0, 0, 0, 1]);
        assert_eq!(tree.leaf_proba(&[0.5]), &[0.75, 0.25]);
    }
}
