//! Reference-counted rope nodes.
//!
//! Every node is an `Arc<Node>`: either a [`Fragment`] holding bytes or a
//! [`TreeNode`] holding up to six children. No weak references are ever
//! created, so a strong count of one means the node is exclusively owned and
//! may be edited in place. Writers still go through `Arc::get_mut`, which
//! repeats that check at the moment of writing.

use alloc::sync::Arc;

use crate::{fragment::Fragment, tree::TreeNode};

pub(crate) type NodeRef = Arc<Node>;

pub(crate) enum Node {
    Fragment(Fragment),
    Tree(TreeNode),
}

impl Node {
    #[inline]
    pub(crate) fn new_fragment(fragment: Fragment) -> NodeRef {
        Arc::new(Node::Fragment(fragment))
    }

    #[inline]
    pub(crate) fn new_tree(tree: TreeNode) -> NodeRef {
        Arc::new(Node::Tree(tree))
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Fragment(fragment) => fragment.len(),
            Node::Tree(tree) => tree.len(),
        }
    }

    #[inline]
    pub(crate) fn as_tree(&self) -> Option<&TreeNode> {
        match self {
            Node::Tree(tree) => Some(tree),
            Node::Fragment(_) => None,
        }
    }

    #[inline]
    pub(crate) fn as_fragment(&self) -> Option<&Fragment> {
        match self {
            Node::Fragment(fragment) => Some(fragment),
            Node::Tree(_) => None,
        }
    }

    /// The tree node behind a reference the tree shape says is a tree node.
    #[track_caller]
    pub(crate) fn tree(&self) -> &TreeNode {
        match self {
            Node::Tree(tree) => tree,
            Node::Fragment(_) => unreachable!("expected a tree node, found a fragment"),
        }
    }

    /// The bytes behind a reference the tree shape says is a fragment.
    #[track_caller]
    pub(crate) fn data(&self) -> &[u8] {
        match self {
            Node::Fragment(fragment) => fragment.data(),
            Node::Tree(_) => unreachable!("expected a fragment, found a tree node"),
        }
    }

    /// Fragments sit at level -1, one below the leaf-level tree nodes.
    #[inline]
    pub(crate) fn level(&self) -> isize {
        match self {
            Node::Fragment(_) => -1,
            Node::Tree(tree) => tree.level(),
        }
    }
}

#[inline]
pub(crate) fn is_unique(node: &NodeRef) -> bool {
    Arc::strong_count(node) == 1
}
