use std::iter::Iterator;

use super::TreeNode;

/// Pre-order (DFT) iterator over the nodes of a decision tree, yielding
/// each node together with its depth (root at depth 0)
pub struct NodeIter<'a> {
    nodes: &'a [TreeNode],
    stack: Vec<(usize, usize)>,
}

impl<'a> NodeIter<'a> {
    pub(crate) fn new(nodes: &'a [TreeNode]) -> Self {
        let stack = if nodes.is_empty() { vec![] } else { vec![(0, 0)] };

        NodeIter { nodes, stack }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (&'a TreeNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|(id, depth)| {
            let node = &self.nodes[id];

            if let TreeNode::Split { left, right, .. } = node {
                self.stack.push((*right, depth + 1));
                self.stack.push((*left, depth + 1));
            }

            (node, depth)
        })
    }
}
