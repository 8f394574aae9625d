//! Flattened decision trees
//!
use std::collections::HashSet;

use ndarray::{ArrayBase, Data, Ix1};

use super::NodeIter;
use crate::error::{Error, Result};

/// Value in the serialized `feature` array marking a leaf node.
pub(crate) const LEAF_SENTINEL: i64 = -2;

/// A node in a decision tree.
///
/// The serialized encoding flattens the tree into parallel arrays indexed by
/// node id; in memory each id resolves to one of these variants instead of
/// relying on the `-2` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Internal node: observations with `x[feature] <= threshold` continue
    /// in `left`, the others in `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding the per-class weights `[negative, positive]`.
    Leaf { value: Vec<f64> },
}

impl TreeNode {
    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }
}

/// A single binary decision tree of a loaded [`Forest`](super::Forest).
///
/// ### Structure
///
/// Nodes live in an index-addressed arena with the root at id 0. Each
/// internal node specifies a decision, represented by a choice of feature
/// and a split threshold such that all observations for which
/// `feature <= threshold` holds fall in the left subtree, while the others
/// fall in the right subtree. Leaf nodes carry a class-weight pair whose
/// second entry is the positive-class score.
///
/// ### Predictions
///
/// To score a sample, the tree is traversed from the root to a leaf,
/// choosing between left and right children according to the values of the
/// features of the sample. A feature value exactly equal to the threshold
/// routes left; this matches the split convention of the training-time
/// exporter and is reproduced bit-for-bit in `f64`.
///
/// ### Validation
///
/// Construction verifies the structural invariants of the serialized
/// encoding: all parallel arrays agree on the node count, child ids are in
/// bounds and no node is its own ancestor. Traversal therefore always
/// terminates; the only per-call failure modes are an undersized input
/// vector and a leaf without a score.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Builds a tree from the parallel-array encoding, consuming the
    /// per-node `value` rows.
    pub(crate) fn from_arrays(
        feature: &[i64],
        threshold: &[f64],
        left: &[i64],
        right: &[i64],
        value: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n = feature.len();
        if n == 0 {
            return Err(Error::MalformedModel("tree has no nodes".into()));
        }
        if threshold.len() != n || left.len() != n || right.len() != n || value.len() != n {
            return Err(Error::MalformedModel(format!(
                "parallel arrays disagree on node count: feature {}, threshold {}, left {}, right {}, value {}",
                n,
                threshold.len(),
                left.len(),
                right.len(),
                value.len()
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for (id, row) in value.into_iter().enumerate() {
            let node = if feature[id] == LEAF_SENTINEL {
                TreeNode::Leaf { value: row }
            } else if feature[id] < 0 {
                return Err(Error::MalformedModel(format!(
                    "node {}: feature index {} is neither non-negative nor the leaf sentinel",
                    id, feature[id]
                )));
            } else {
                TreeNode::Split {
                    feature: feature[id] as usize,
                    threshold: threshold[id],
                    left: child_id(left[id], id, n)?,
                    right: child_id(right[id], id, n)?,
                }
            };
            nodes.push(node);
        }

        check_acyclic(&nodes)?;

        Ok(DecisionTree { nodes })
    }

    /// Returns the positive-class score of the leaf reached by `x`.
    ///
    /// Fails with [`Error::FeatureOutOfBounds`] if a visited split tests a
    /// feature beyond the end of `x`, and with [`Error::MissingLeafScore`]
    /// if the reached leaf has no second value entry. Neither failure
    /// affects the tree; subsequent calls behave as if it never happened.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<f64> {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                TreeNode::Leaf { value } => {
                    return value
                        .get(1)
                        .copied()
                        .ok_or(Error::MissingLeafScore { node: id });
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let xi = *x.get(*feature).ok_or(Error::FeatureOutOfBounds {
                        index: *feature,
                        len: x.len(),
                    })?;
                    // ties route left
                    id = if xi <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Create a node iterator in pre-order (DFT)
    pub fn iter_nodes(&self) -> NodeIter {
        NodeIter::new(&self.nodes)
    }

    /// Return the feature indices tested by the splits of this tree,
    /// sorted and deduplicated
    pub fn features(&self) -> Vec<usize> {
        let mut fitted_features = HashSet::new();

        for (node, _) in self.iter_nodes() {
            if let TreeNode::Split { feature, .. } = node {
                fitted_features.insert(*feature);
            }
        }

        let mut features: Vec<_> = fitted_features.into_iter().collect();
        features.sort_unstable();
        features
    }

    /// Return the number of nodes in this tree
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves in this tree
    pub fn num_leaves(&self) -> usize {
        self.iter_nodes().filter(|(node, _)| node.is_leaf()).count()
    }

    /// Return max depth of the tree, with the root at depth 0
    pub fn max_depth(&self) -> usize {
        self.iter_nodes()
            .fold(0, |max, (_, depth)| usize::max(max, depth))
    }

    /// Minimum feature-vector length accepted by every traversal of this
    /// tree: one past the largest feature index any split tests.
    pub(crate) fn min_input_len(&self) -> usize {
        self.iter_nodes()
            .filter_map(|(node, _)| match node {
                TreeNode::Split { feature, .. } => Some(feature + 1),
                TreeNode::Leaf { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }
}

fn child_id(child: i64, parent: usize, num_nodes: usize) -> Result<usize> {
    if child < 0 || child as usize >= num_nodes {
        return Err(Error::MalformedModel(format!(
            "node {}: child id {} out of range for {} nodes",
            parent, child, num_nodes
        )));
    }
    Ok(child as usize)
}

/// Walks the arena from the root and rejects trees in which a node is
/// reachable from itself, which would make traversal loop forever.
fn check_acyclic(nodes: &[TreeNode]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    let mut marks = vec![Mark::New; nodes.len()];
    let mut stack = vec![(0usize, false)];

    while let Some((id, leaving)) = stack.pop() {
        if leaving {
            marks[id] = Mark::Done;
            continue;
        }
        match marks[id] {
            Mark::Open => {
                return Err(Error::MalformedModel(format!(
                    "node {} is its own ancestor",
                    id
                )))
            }
            Mark::Done => continue,
            Mark::New => {}
        }
        marks[id] = Mark::Open;
        stack.push((id, true));
        if let TreeNode::Split { left, right, .. } = &nodes[id] {
            stack.push((*left, false));
            stack.push((*right, false));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    /// A three-node stump splitting on feature 0 at 0.5: left leaf predicts
    /// the negative class, right leaf the positive one.
    fn stump() -> DecisionTree {
        DecisionTree::from_arrays(
            &[0, LEAF_SENTINEL, LEAF_SENTINEL],
            &[0.5, 0.0, 0.0],
            &[1, -1, -1],
            &[2, -1, -1],
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn threshold_tie_routes_left() {
        let tree = stump();

        // strictly below and exactly at the threshold go left
        assert_eq!(tree.predict(&array![0.2]).unwrap(), 0.0);
        assert_eq!(tree.predict(&array![0.5]).unwrap(), 0.0);
        // strictly above goes right
        assert_eq!(tree.predict(&array![0.6]).unwrap(), 1.0);
    }

    #[test]
    fn traversal_reaches_leaf_at_any_depth() {
        // chain of splits on features 0..2 ending in leaves
        let tree = DecisionTree::from_arrays(
            &[0, 1, 2, LEAF_SENTINEL, LEAF_SENTINEL, LEAF_SENTINEL, LEAF_SENTINEL],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            &[1, 2, 3, -1, -1, -1, -1],
            &[6, 5, 4, -1, -1, -1, -1],
            vec![
                vec![],
                vec![],
                vec![],
                vec![0.0, 0.1],
                vec![0.0, 0.2],
                vec![0.0, 0.3],
                vec![0.0, 0.4],
            ],
        )
        .unwrap();

        assert_eq!(tree.max_depth(), 3);
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(tree.features(), vec![0, 1, 2]);

        // deepest path: all comparisons route left
        assert_eq!(tree.predict(&array![-1.0, -1.0, -1.0]).unwrap(), 0.1);
        // first comparison routes right
        assert_eq!(tree.predict(&array![1.0, 0.0, 0.0]).unwrap(), 0.4);
    }

    #[test]
    fn undersized_input_is_recoverable() {
        let tree = stump();

        match tree.predict(&array![]) {
            Err(Error::FeatureOutOfBounds { index: 0, len: 0 }) => {}
            other => panic!("expected FeatureOutOfBounds, got {:?}", other),
        }

        // the failed call must not poison the tree
        assert_eq!(tree.predict(&array![1.0]).unwrap(), 1.0);
    }

    #[test]
    fn short_leaf_row_is_reported() {
        let tree = DecisionTree::from_arrays(
            &[LEAF_SENTINEL],
            &[0.0],
            &[-1],
            &[-1],
            vec![vec![]],
        )
        .unwrap();

        match tree.predict(&array![0.0]) {
            Err(Error::MissingLeafScore { node: 0 }) => {}
            other => panic!("expected MissingLeafScore, got {:?}", other),
        }
    }

    #[test]
    fn rejects_mismatched_array_lengths() {
        let res = DecisionTree::from_arrays(
            &[0, LEAF_SENTINEL],
            &[0.5],
            &[1, -1],
            &[1, -1],
            vec![vec![0.0, 1.0], vec![0.0, 1.0]],
        );
        assert!(matches!(res, Err(Error::MalformedModel(_))));
    }

    #[test]
    fn rejects_negative_feature_index() {
        let res = DecisionTree::from_arrays(
            &[-1],
            &[0.0],
            &[-1],
            &[-1],
            vec![vec![0.0, 1.0]],
        );
        assert!(matches!(res, Err(Error::MalformedModel(_))));
    }

    #[test]
    fn rejects_out_of_range_children() {
        let res = DecisionTree::from_arrays(
            &[0],
            &[0.5],
            &[7],
            &[0],
            vec![vec![]],
        );
        assert!(matches!(res, Err(Error::MalformedModel(_))));
    }

    #[test]
    fn rejects_cyclic_links() {
        // node 1 routes back to the root
        let res = DecisionTree::from_arrays(
            &[0, 1, LEAF_SENTINEL],
            &[0.5, 0.5, 0.0],
            &[1, 0, -1],
            &[2, 2, -1],
            vec![vec![], vec![], vec![0.0, 1.0]],
        );
        assert!(matches!(res, Err(Error::MalformedModel(_))));
    }

    #[test]
    fn rejects_empty_tree() {
        let res = DecisionTree::from_arrays(&[], &[], &[], &[], vec![]);
        assert!(matches!(res, Err(Error::MalformedModel(_))));
    }

    #[test]
    fn shared_subtrees_are_not_cycles() {
        // both children of the root point at the same leaf; unusual but
        // terminating, so it must load
        let tree = DecisionTree::from_arrays(
            &[0, LEAF_SENTINEL],
            &[0.5, 0.0],
            &[1, -1],
            &[1, -1],
            vec![vec![], vec![0.0, 0.9]],
        )
        .unwrap();

        assert_eq!(tree.predict(&array![0.0]).unwrap(), 0.9);
        assert_eq!(tree.predict(&array![1.0]).unwrap(), 0.9);
    }

    #[test]
    fn min_input_len_spans_all_splits() {
        let tree = stump();
        assert_eq!(tree.min_input_len(), 1);

        let leaf = DecisionTree::from_arrays(
            &[LEAF_SENTINEL],
            &[0.0],
            &[-1],
            &[-1],
            vec![vec![0.3, 0.7]],
        )
        .unwrap();
        assert_eq!(leaf.min_input_len(), 0);
    }
}
