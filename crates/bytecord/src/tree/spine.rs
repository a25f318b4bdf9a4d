//! Ownership-aware walks along one edge of a tree.
//!
//! An edit at the front or back of a tree descends along that edge, pushing
//! every node it passes onto a stack together with a flag saying whether the
//! node is exclusively owned. A node only counts as owned if all of its
//! ancestors are too: a unique child of a shared parent can still be reached
//! through the parent's other owners.
//!
//! While descending, an owned parent gives up its child (the slot is left as
//! a hole) so the child's reference count stays exact; a shared parent only
//! lends a cloned reference. After the edit the stack is unwound bottom-up,
//! feeding each level the result of the level below.

use alloc::sync::Arc;

use smallvec::SmallVec;

use super::{Edge, MAX_DEPTH, MAX_HEIGHT, TreeNode, edit::rebuild, tree_mut};
use crate::node::{Node, NodeRef, is_unique};

/// Outcome of editing one node of the spine.
pub(crate) enum OpResult {
    /// The node was edited in place.
    Mutated(NodeRef),
    /// A shared node was replaced by an edited copy.
    Copied(NodeRef),
    /// The node was full; `sibling` must be added next to it one level up.
    Popped { node: NodeRef, sibling: NodeRef },
}

pub(crate) struct Spine {
    edge: Edge,
    max_height: usize,
    stack: SmallVec<[(NodeRef, bool); MAX_DEPTH]>,
}

impl Spine {
    pub(crate) fn new(edge: Edge) -> Self {
        Self {
            edge,
            max_height: MAX_HEIGHT,
            stack: SmallVec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_height(edge: Edge, max_height: usize) -> Self {
        Self {
            max_height,
            ..Self::new(edge)
        }
    }

    /// Walks `depth` levels down the spine of `tree` and returns the node
    /// found there with its ownership flag.
    pub(crate) fn descend(&mut self, tree: NodeRef, depth: usize) -> (NodeRef, bool) {
        let mut node = tree;
        let mut owned = is_unique(&node);
        for _ in 0..depth {
            let child = if owned {
                let tree = tree_mut(&mut node);
                let index = tree.index_at(self.edge);
                tree.take(index)
            } else {
                Arc::clone(node.tree().edge_at(self.edge))
            };
            self.stack.push((node, owned));
            owned = owned && is_unique(&child);
            node = child;
        }
        (node, owned)
    }

    /// Adds `child` at the spine edge of `node`. A full node is left alone
    /// and `child` is returned wrapped in a new sibling of the same height.
    pub(crate) fn add_edge(&self, mut node: NodeRef, owned: bool, child: NodeRef) -> OpResult {
        let tree = node.tree();
        if tree.is_full() {
            let sibling = Node::new_tree(TreeNode::with_edge(tree.height(), child));
            return OpResult::Popped { node, sibling };
        }
        if owned {
            tree_mut(&mut node).add(self.edge, child);
            OpResult::Mutated(node)
        } else {
            let mut copy = tree.copy();
            copy.add(self.edge, child);
            OpResult::Copied(Node::new_tree(copy))
        }
    }

    /// Propagates `result` up the recorded spine and returns the new root.
    /// `delta` is the number of bytes the edit added below the spine.
    pub(crate) fn unwind(mut self, mut result: OpResult, delta: usize) -> NodeRef {
        while let Some((mut node, owned)) = self.stack.pop() {
            let index = node.tree().index_at(self.edge);
            result = match result {
                OpResult::Mutated(child) | OpResult::Copied(child) if owned => {
                    let tree = tree_mut(&mut node);
                    tree.put(index, child);
                    tree.add_length(delta);
                    OpResult::Mutated(node)
                }
                OpResult::Mutated(child) | OpResult::Copied(child) => {
                    let mut copy = node.tree().copy();
                    copy.replace(index, child);
                    copy.add_length(delta);
                    OpResult::Copied(Node::new_tree(copy))
                }
                OpResult::Popped {
                    node: child,
                    sibling,
                } => {
                    if owned {
                        tree_mut(&mut node).put(index, child);
                    }
                    self.add_edge(node, owned, sibling)
                }
            };
        }
        self.finalize(result)
    }

    fn finalize(&self, result: OpResult) -> NodeRef {
        match result {
            OpResult::Mutated(root) | OpResult::Copied(root) => root,
            OpResult::Popped { node, sibling } => {
                let root = match self.edge {
                    Edge::Back => TreeNode::from_pair(node, sibling),
                    Edge::Front => TreeNode::from_pair(sibling, node),
                };
                let height = root.height();
                let root = Node::new_tree(root);
                if height > self.max_height {
                    rebuild(root)
                } else {
                    root
                }
            }
        }
    }
}
