//! The bounded-branching B-tree that holds a rope's fragments.
//!
//! A [`TreeNode`] has up to [`CAPACITY`] children kept in a fixed slot array.
//! The occupied slots are `begin..end`; the slack on both sides lets a node
//! grow at either end without shifting on every insert. Children of a node at
//! height `h > 0` are tree nodes of height `h - 1`; children of a height 0
//! node are fragments. Every node caches the total byte length below it.
//!
//! Edits never modify a node that is reachable from more than one place. They
//! walk down one spine, recording for each node whether it (and everything
//! above it) is exclusively owned, and on the way back up they either edit in
//! place or copy the node. See [`spine`].

mod edit;
mod slice;
mod spine;

use alloc::{sync::Arc, vec::Vec};

use smallvec::SmallVec;

pub(crate) use self::{
    edit::{add_bytes, add_fragment, build, concat, extract_append_buffer, remove_suffix},
    slice::{copy_prefix, sub_tree},
};
use crate::node::{Node, NodeRef};

/// Maximum number of children of a tree node.
pub(crate) const CAPACITY: usize = 6;
/// Maximum number of tree levels, and the depth of every cursor stack.
pub(crate) const MAX_DEPTH: usize = 12;
/// Maximum height of a root node.
pub(crate) const MAX_HEIGHT: usize = MAX_DEPTH - 1;

/// One of the two ends of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Front,
    Back,
}

/// A child slot together with an offset inside that child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub(crate) index: usize,
    pub(crate) n: usize,
}

pub(crate) struct TreeNode {
    height: usize,
    begin: usize,
    end: usize,
    length: usize,
    edges: [Option<NodeRef>; CAPACITY],
}

impl TreeNode {
    pub(crate) fn new(height: usize) -> Self {
        Self {
            height,
            begin: 0,
            end: 0,
            length: 0,
            edges: Default::default(),
        }
    }

    pub(crate) fn with_edge(height: usize, child: NodeRef) -> Self {
        let mut tree = Self::new(height);
        tree.add(Edge::Back, child);
        tree
    }

    /// A node one level above two siblings of equal level.
    pub(crate) fn from_pair(front: NodeRef, back: NodeRef) -> Self {
        debug_assert_eq!(front.level(), back.level());
        let height = front.as_tree().map_or(0, |tree| tree.height + 1);
        let mut tree = Self::new(height);
        tree.add(Edge::Back, front);
        tree.add(Edge::Back, back);
        tree
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    #[allow(clippy::cast_possible_wrap)] // heights never come near isize::MAX
    pub(crate) fn level(&self) -> isize {
        self.height as isize
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub(crate) fn begin(&self) -> usize {
        self.begin
    }

    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.size() == CAPACITY
    }

    #[inline]
    pub(crate) fn index_at(&self, edge: Edge) -> usize {
        match edge {
            Edge::Front => self.begin,
            Edge::Back => self.end - 1,
        }
    }

    #[track_caller]
    pub(crate) fn edge(&self, index: usize) -> &NodeRef {
        debug_assert!((self.begin..self.end).contains(&index));
        self.edges[index]
            .as_ref()
            .expect("slots within the edge range are occupied")
    }

    pub(crate) fn edge_at(&self, edge: Edge) -> &NodeRef {
        self.edge(self.index_at(edge))
    }

    pub(crate) fn edge_mut(&mut self, index: usize) -> &mut NodeRef {
        debug_assert!((self.begin..self.end).contains(&index));
        self.edges[index]
            .as_mut()
            .expect("slots within the edge range are occupied")
    }

    pub(crate) fn edge_at_mut(&mut self, edge: Edge) -> &mut NodeRef {
        let index = self.index_at(edge);
        self.edge_mut(index)
    }

    pub(crate) fn edges(&self) -> impl DoubleEndedIterator<Item = &NodeRef> + '_ {
        self.edges[self.begin..self.end].iter().flatten()
    }

    /// Raw slot access for validation; may expose holes.
    pub(crate) fn slots(&self) -> &[Option<NodeRef>; CAPACITY] {
        &self.edges
    }

    // ── slot edits ──
    //
    // `take`, `put` and `replace` move children in and out of slots without
    // touching the cached length; callers account for length changes.

    /// Removes the child at `index`, leaving a hole to be filled by `put`.
    pub(crate) fn take(&mut self, index: usize) -> NodeRef {
        self.edges[index]
            .take()
            .expect("slots within the edge range are occupied")
    }

    pub(crate) fn put(&mut self, index: usize, child: NodeRef) {
        debug_assert!(self.edges[index].is_none());
        self.edges[index] = Some(child);
    }

    pub(crate) fn replace(&mut self, index: usize, child: NodeRef) -> NodeRef {
        self.edges[index]
            .replace(child)
            .expect("slots within the edge range are occupied")
    }

    #[inline]
    pub(crate) fn add_length(&mut self, delta: usize) {
        self.length += delta;
    }

    /// Adds `child` at `edge`, shifting the occupied slots if that end has no
    /// slack left. The node must not be full.
    pub(crate) fn add(&mut self, edge: Edge, child: NodeRef) {
        debug_assert!(!self.is_full());
        self.length += child.len();
        match edge {
            Edge::Back => {
                if self.end == CAPACITY {
                    self.edges.rotate_left(self.begin);
                    self.end -= self.begin;
                    self.begin = 0;
                }
                self.edges[self.end] = Some(child);
                self.end += 1;
            }
            Edge::Front => {
                if self.begin == 0 {
                    let shift = CAPACITY - self.end;
                    self.edges.rotate_right(shift);
                    self.begin += shift;
                    self.end = CAPACITY;
                }
                self.begin -= 1;
                self.edges[self.begin] = Some(child);
            }
        }
    }

    /// Removes and returns the back child.
    pub(crate) fn pop_back(&mut self) -> NodeRef {
        let index = self.end - 1;
        let child = self.take(index);
        self.end = index;
        self.length -= child.len();
        child
    }

    /// Removes every child, leaving an empty node.
    pub(crate) fn take_all(&mut self) -> SmallVec<[NodeRef; CAPACITY]> {
        let edges = self.edges.iter_mut().filter_map(Option::take).collect();
        self.begin = 0;
        self.end = 0;
        self.length = 0;
        edges
    }

    /// Keeps only as many leading children as needed to cover `length`
    /// bytes and records `length` as the new length. The last kept child
    /// may still be longer than needed.
    pub(crate) fn truncate(&mut self, length: usize) {
        let end = self.index_beyond(length);
        for slot in &mut self.edges[end..self.end] {
            *slot = None;
        }
        self.end = end;
        self.length = length;
    }

    /// A copy sharing all children with `self`.
    pub(crate) fn copy(&self) -> Self {
        Self {
            height: self.height,
            begin: self.begin,
            end: self.end,
            length: self.length,
            edges: self.edges.clone(),
        }
    }

    /// A new node sharing children `from..to` of `self`, with `length` as its
    /// recorded length.
    pub(crate) fn copy_range(&self, from: usize, to: usize, length: usize) -> Self {
        debug_assert!(self.begin <= from && from < to && to <= self.end);
        let mut tree = Self::new(self.height);
        for (slot, edge) in tree.edges.iter_mut().zip(&self.edges[from..to]) {
            slot.clone_from(edge);
        }
        tree.end = to - from;
        tree.length = length;
        tree
    }

    /// A node covering the first `length` bytes of `self`, keeping whole
    /// children up to the one containing byte `length - 1`.
    pub(crate) fn copy_begin_to(&self, length: usize) -> Self {
        self.copy_range(self.begin, self.index_beyond(length), length)
    }

    // ── lookups ──

    /// The child containing byte `offset`; `n` is the offset inside it.
    pub(crate) fn index_of(&self, offset: usize) -> Position {
        debug_assert!(offset < self.length);
        let mut index = self.begin;
        let mut n = offset;
        loop {
            let len = self.edge(index).len();
            if n < len {
                return Position { index, n };
            }
            n -= len;
            index += 1;
        }
    }

    /// The child containing the last byte of the first `n` bytes; `n` of the
    /// result is in `1..=child.len()`.
    pub(crate) fn index_of_length(&self, n: usize) -> Position {
        debug_assert!(n > 0 && n <= self.length);
        let mut index = self.begin;
        let mut n = n;
        loop {
            let len = self.edge(index).len();
            if n <= len {
                return Position { index, n };
            }
            n -= len;
            index += 1;
        }
    }

    /// The first child index whose start offset is at or beyond `offset`.
    pub(crate) fn index_beyond(&self, offset: usize) -> usize {
        let mut index = self.begin;
        let mut start = 0;
        while start < offset && index < self.end {
            start += self.edge(index).len();
            index += 1;
        }
        index
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        if self.height == 0 {
            return;
        }
        // Release subtrees through a work list so dropping a tall tree
        // does not recurse.
        let mut pending: Vec<NodeRef> = self.take_all().into_iter().collect();
        while let Some(node) = pending.pop() {
            if let Some(Node::Tree(mut tree)) = Arc::into_inner(node) {
                if tree.height > 0 {
                    pending.extend(tree.take_all());
                }
            }
        }
    }
}

/// The tree node behind `node` for in-place editing, replacing `node` with a
/// private copy first if it is shared.
pub(crate) fn tree_mut(node: &mut NodeRef) -> &mut TreeNode {
    if Arc::get_mut(node).is_none() {
        *node = Node::new_tree(node.tree().copy());
    }
    match Arc::get_mut(node) {
        Some(Node::Tree(tree)) => tree,
        _ => unreachable!("a freshly copied tree node is exclusively owned"),
    }
}

/// Wraps a fragment root in a leaf so tree operations can apply to it.
pub(crate) fn force_tree(node: NodeRef) -> NodeRef {
    if node.as_tree().is_some() {
        node
    } else {
        Node::new_tree(TreeNode::with_edge(0, node))
    }
}

/// Removes single-child tree nodes from the top of `node`.
pub(crate) fn collapse(mut node: NodeRef) -> NodeRef {
    while node.as_tree().is_some_and(|tree| tree.size() == 1) {
        node = extract_front(node);
    }
    node
}

/// The front child of a tree node, consuming the node if exclusively owned.
pub(crate) fn extract_front(node: NodeRef) -> NodeRef {
    match Arc::try_unwrap(node) {
        Ok(Node::Tree(mut tree)) => {
            let index = tree.begin;
            tree.take(index)
        }
        Ok(Node::Fragment(_)) => unreachable!("only tree nodes have children"),
        Err(shared) => Arc::clone(shared.tree().edge_at(Edge::Front)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloc::vec::Vec;

    use rstest::rstest;

    use super::*;
    use crate::fragment;

    /// A leaf over one fragment per entry of `parts`.
    pub(crate) fn leaf(parts: &[&[u8]]) -> TreeNode {
        let mut tree = TreeNode::new(0);
        for part in parts {
            tree.add(Edge::Back, fragment::owned(part, 0));
        }
        tree
    }

    /// Concatenated bytes of every fragment under `node`.
    pub(crate) fn flatten(node: &NodeRef) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![node];
        while let Some(node) = stack.pop() {
            match &**node {
                Node::Fragment(fragment) => out.extend_from_slice(fragment.data()),
                Node::Tree(tree) => stack.extend(tree.edges().rev()),
            }
        }
        out
    }

    #[test]
    fn add_uses_slack_on_both_ends() {
        let mut tree = leaf(&[b"c", b"d"]);
        tree.add(Edge::Front, fragment::owned(b"b", 0));
        tree.add(Edge::Front, fragment::owned(b"a", 0));
        tree.add(Edge::Back, fragment::owned(b"e", 0));
        tree.add(Edge::Back, fragment::owned(b"f", 0));
        assert!(tree.is_full());
        assert_eq!(tree.len(), 6);
        assert_eq!(flatten(&Node::new_tree(tree)), b"abcdef");
    }

    #[rstest]
    #[case(0, Position { index: 0, n: 0 })]
    #[case(2, Position { index: 0, n: 2 })]
    #[case(3, Position { index: 1, n: 0 })]
    #[case(8, Position { index: 2, n: 3 })]
    fn index_of_finds_the_containing_child(#[case] offset: usize, #[case] expected: Position) {
        let tree = leaf(&[b"abc", b"de", b"fghij"]);
        assert_eq!(tree.index_of(offset), expected);
    }

    #[rstest]
    #[case(1, Position { index: 0, n: 1 })]
    #[case(3, Position { index: 0, n: 3 })]
    #[case(4, Position { index: 1, n: 1 })]
    #[case(10, Position { index: 2, n: 5 })]
    fn index_of_length_finds_the_last_covered_child(
        #[case] n: usize,
        #[case] expected: Position,
    ) {
        let tree = leaf(&[b"abc", b"de", b"fghij"]);
        assert_eq!(tree.index_of_length(n), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(3, 1)]
    #[case(4, 2)]
    #[case(10, 3)]
    fn index_beyond_counts_children_covering_the_offset(#[case] offset: usize, #[case] end: usize) {
        let tree = leaf(&[b"abc", b"de", b"fghij"]);
        assert_eq!(tree.index_beyond(offset), end);
    }

    #[test]
    fn truncate_drops_trailing_children() {
        let mut tree = leaf(&[b"abc", b"de", b"fghij"]);
        tree.truncate(4);
        assert_eq!(tree.size(), 2);
        assert_eq!(tree.len(), 4);
        assert!(tree.slots()[2].is_none());
    }

    #[test]
    fn tree_mut_copies_shared_nodes() {
        let mut node = Node::new_tree(leaf(&[b"ab", b"cd"]));
        let keep = Arc::clone(&node);
        tree_mut(&mut node).add(Edge::Back, fragment::owned(b"ef", 0));
        assert!(!Arc::ptr_eq(&node, &keep));
        assert_eq!(flatten(&node), b"abcdef");
        assert_eq!(flatten(&keep), b"abcd");
    }

    #[test]
    fn collapse_removes_single_child_chains() {
        let inner = Node::new_tree(leaf(&[b"ab", b"cd"]));
        let wrapped = Node::new_tree(TreeNode::with_edge(
            2,
            Node::new_tree(TreeNode::with_edge(1, Arc::clone(&inner))),
        ));
        let collapsed = collapse(wrapped);
        assert!(Arc::ptr_eq(&collapsed, &inner));
    }

    #[test]
    fn dropping_a_deep_chain_does_not_recurse() {
        let depth = if cfg!(miri) { 1_000 } else { 100_000 };
        let mut node = fragment::owned(b"x", 0);
        for height in 0..depth {
            node = Node::new_tree(TreeNode::with_edge(height, node));
        }
        drop(node);
    }
}
