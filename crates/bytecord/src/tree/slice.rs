//! Zero-copy extraction of byte ranges.
//!
//! Whole children inside a range are shared by bumping their reference
//! count; only the nodes along the range's boundary spines are allocated, and
//! fragments cut by a boundary are replaced by views.

use smallvec::SmallVec;

use super::{Edge, MAX_DEPTH, TreeNode};
use crate::{
    fragment,
    node::{Node, NodeRef},
};

/// A copied range and the level it sits at; fragments are level -1.
pub(crate) struct Cut {
    pub(crate) node: NodeRef,
    pub(crate) level: isize,
}

impl Cut {
    fn new(node: NodeRef) -> Self {
        let level = node.level();
        Self { node, level }
    }

    /// Wraps the cut in single-child nodes until it reaches `level`.
    pub(crate) fn raise(mut self, level: isize) -> NodeRef {
        while self.level < level {
            let height = usize::try_from(self.level + 1).unwrap_or_default();
            self.node = Node::new_tree(TreeNode::with_edge(height, self.node));
            self.level += 1;
        }
        self.node
    }
}

/// The first `n` bytes of `tree`.
///
/// Levels whose front child already covers the whole prefix are skipped, so
/// the result is never a chain of single-child nodes.
pub(crate) fn copy_prefix(tree: &NodeRef, n: usize) -> Cut {
    debug_assert!(n > 0 && n <= tree.len());
    let mut node = tree;
    let top = loop {
        match &**node {
            Node::Fragment(_) => return Cut::new(fragment::view(node, 0, n)),
            Node::Tree(inner) if n < inner.len() => {
                let front = inner.edge_at(Edge::Front);
                if front.len() >= n {
                    node = front;
                } else {
                    break inner;
                }
            }
            Node::Tree(_) => return Cut::new(node.clone()),
        }
    };

    let mut levels: SmallVec<[TreeNode; MAX_DEPTH]> = SmallVec::new();
    let mut current = top;
    let mut n = n;
    let bottom = loop {
        let pos = current.index_of_length(n);
        let mut copy = current.copy_range(current.begin(), pos.index + 1, n);
        let edge = current.edge(pos.index);
        if pos.n == edge.len() {
            break copy;
        }
        match &**edge {
            Node::Fragment(_) => {
                let back = copy.index_at(Edge::Back);
                copy.replace(back, fragment::view(edge, 0, pos.n));
                break copy;
            }
            Node::Tree(inner) => {
                levels.push(copy);
                current = inner;
                n = pos.n;
            }
        }
    };
    assemble(levels, bottom, Edge::Back)
}

/// Everything from byte `offset` of `tree` to its end.
///
/// Levels whose back child already covers the whole suffix are skipped.
pub(crate) fn copy_suffix(tree: &NodeRef, offset: usize) -> Cut {
    debug_assert!(offset < tree.len());
    let len = tree.len() - offset;
    let mut node = tree;
    let mut offset = offset;
    let top = loop {
        match &**node {
            Node::Fragment(_) => return Cut::new(fragment::view(node, offset, len)),
            Node::Tree(inner) if offset > 0 => {
                let back = inner.edge_at(Edge::Back);
                if back.len() >= len {
                    offset = back.len() - len;
                    node = back;
                } else {
                    break inner;
                }
            }
            Node::Tree(_) => return Cut::new(node.clone()),
        }
    };

    let mut levels: SmallVec<[TreeNode; MAX_DEPTH]> = SmallVec::new();
    let mut current = top;
    let mut length = len;
    let bottom = loop {
        let pos = current.index_of(offset);
        let mut copy = current.copy_range(pos.index, current.end(), length);
        let edge = current.edge(pos.index);
        if pos.n == 0 {
            break copy;
        }
        match &**edge {
            Node::Fragment(_) => {
                let front = copy.index_at(Edge::Front);
                copy.replace(front, fragment::view(edge, pos.n, edge.len() - pos.n));
                break copy;
            }
            Node::Tree(inner) => {
                levels.push(copy);
                current = inner;
                length = edge.len() - pos.n;
                offset = pos.n;
            }
        }
    };
    assemble(levels, bottom, Edge::Front)
}

/// Links copied levels bottom-up, replacing each level's boundary child at
/// `edge` with the level below it.
fn assemble(mut levels: SmallVec<[TreeNode; MAX_DEPTH]>, bottom: TreeNode, edge: Edge) -> Cut {
    let mut node = Node::new_tree(bottom);
    while let Some(mut level) = levels.pop() {
        let index = level.index_at(edge);
        level.replace(index, node);
        node = Node::new_tree(level);
    }
    Cut::new(node)
}

/// `n` bytes of `tree` starting at `offset`, or `None` when `n` is zero.
///
/// A range inside a single fragment comes back as that fragment or a view
/// of it. Otherwise the result is a new tree whose boundary spines are
/// copied and whose interior children are shared with `tree`.
pub(crate) fn sub_tree(tree: &NodeRef, offset: usize, n: usize) -> Option<NodeRef> {
    debug_assert!(offset + n <= tree.len());
    if n == 0 {
        return None;
    }
    if offset == 0 && n == tree.len() {
        return Some(tree.clone());
    }

    // Descend while the range fits inside a single child.
    let mut node = tree;
    let mut offset = offset;
    let inner = loop {
        match &**node {
            Node::Fragment(_) => return Some(fragment::view(node, offset, n)),
            Node::Tree(inner) => {
                let pos = inner.index_of(offset);
                let edge = inner.edge(pos.index);
                if pos.n + n <= edge.len() {
                    node = edge;
                    offset = pos.n;
                } else {
                    break inner;
                }
            }
        }
    };

    let front = inner.index_of(offset);
    let back = inner.index_of_length(offset + n);
    debug_assert!(front.index < back.index);
    let left = inner.edge(front.index);
    let right = inner.edge(back.index);

    let (height, prefix, suffix) = if inner.height() == 0 {
        (
            0,
            fragment::view(left, front.n, left.len() - front.n),
            fragment::view(right, 0, back.n),
        )
    } else {
        let prefix = copy_suffix(left, front.n);
        let suffix = copy_prefix(right, back.n);
        // Adjacent boundary children may both shrink; the new node then sits
        // just above the taller of the two.
        let level = if front.index + 1 == back.index {
            prefix.level.max(suffix.level) + 1
        } else {
            inner.level()
        };
        let height = usize::try_from(level).unwrap_or_default();
        (height, prefix.raise(level - 1), suffix.raise(level - 1))
    };

    let mut sub = TreeNode::new(height);
    sub.add(Edge::Back, prefix);
    for index in front.index + 1..back.index {
        sub.add(Edge::Back, inner.edge(index).clone());
    }
    sub.add(Edge::Back, suffix);
    debug_assert_eq!(sub.len(), n);
    Some(Node::new_tree(sub))
}

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec::Vec};

    use rstest::rstest;

    use super::*;
    use crate::tree::{
        build,
        tests::{flatten, leaf},
    };

    /// A height 1 tree over the alphabet, two letters per fragment.
    fn alphabet() -> NodeRef {
        let letters = b"abcdefghijklmnopqrstuvwxyz";
        let fragments: Vec<NodeRef> = letters
            .chunks(2)
            .map(|chunk| fragment::owned(chunk, 0))
            .collect();
        build(fragments)
    }

    #[test]
    fn alphabet_is_two_levels_tall() {
        let tree = alphabet();
        assert_eq!(tree.level(), 1);
        assert_eq!(flatten(&tree), b"abcdefghijklmnopqrstuvwxyz");
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(12)]
    #[case(13)]
    #[case(25)]
    #[case(26)]
    fn copy_prefix_keeps_the_leading_bytes(#[case] n: usize) {
        let tree = alphabet();
        let prefix = copy_prefix(&tree, n);
        assert_eq!(flatten(&prefix.node), &b"abcdefghijklmnopqrstuvwxyz"[..n]);
        assert_eq!(prefix.node.level(), prefix.level);
        assert_eq!(flatten(&tree), b"abcdefghijklmnopqrstuvwxyz");
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(13)]
    #[case(24)]
    #[case(25)]
    fn copy_suffix_keeps_the_trailing_bytes(#[case] offset: usize) {
        let tree = alphabet();
        let suffix = copy_suffix(&tree, offset);
        assert_eq!(flatten(&suffix.node), &b"abcdefghijklmnopqrstuvwxyz"[offset..]);
        assert_eq!(suffix.node.level(), suffix.level);
    }

    #[test]
    fn prefix_within_the_front_child_drops_levels() {
        let tree = alphabet();
        let prefix = copy_prefix(&tree, 2);
        assert_eq!(prefix.level, -1);
        let front = tree.tree().edge_at(Edge::Front).tree().edge_at(Edge::Front);
        assert!(Arc::ptr_eq(&prefix.node, front));
    }

    #[test]
    fn sub_tree_inside_one_fragment_is_a_view() {
        let tree = alphabet();
        let sub = sub_tree(&tree, 4, 1).expect("non-empty range");
        assert!(sub.as_fragment().is_some());
        assert_eq!(sub.data(), b"e");
    }

    #[test]
    fn sub_tree_of_nothing_is_none() {
        assert!(sub_tree(&alphabet(), 3, 0).is_none());
    }

    #[test]
    fn sub_tree_shares_interior_children() {
        let tree = alphabet();
        let sub = sub_tree(&tree, 1, 24).expect("non-empty range");
        assert_eq!(flatten(&sub), &b"abcdefghijklmnopqrstuvwxyz"[1..25]);
        let shared = sub.tree().edge(1);
        assert!(Arc::ptr_eq(shared, tree.tree().edge(1)));
    }

    #[test]
    fn every_sub_tree_matches_the_model() {
        let tree = alphabet();
        let model = b"abcdefghijklmnopqrstuvwxyz";
        for offset in 0..model.len() {
            for n in 1..=model.len() - offset {
                let sub = sub_tree(&tree, offset, n).expect("non-empty range");
                assert_eq!(flatten(&sub), &model[offset..offset + n], "{offset}+{n}");
                if let Some(inner) = sub.as_tree() {
                    assert!(inner.size() >= 2, "{offset}+{n} left a single-child root");
                    for edge in inner.edges() {
                        assert_eq!(edge.level(), inner.level() - 1);
                    }
                }
            }
        }
    }

    #[test]
    fn leaf_sub_tree_views_both_boundaries() {
        let tree = Node::new_tree(leaf(&[b"abc", b"def", b"ghi"]));
        let sub = sub_tree(&tree, 1, 7).expect("non-empty range");
        assert_eq!(flatten(&sub), b"bcdefgh");
        assert_eq!(sub.tree().size(), 3);
    }
}
