//! A stateful cursor over the fragments of a tree.
//!
//! The navigator remembers the node and child index it passed at every level,
//! so stepping to a neighboring fragment only revisits the levels that
//! change. It also tracks the absolute offset of the current fragment, which
//! lets it hand out zero-copy sub-trees of what it walks over.

use crate::{
    node::NodeRef,
    tree::{Edge, MAX_DEPTH, TreeNode, sub_tree},
};

/// The outcome of [`Navigator::read`].
pub(crate) struct ReadResult {
    /// The bytes read, sharing structure with the navigated tree.
    pub(crate) tree: Option<NodeRef>,
    /// Offset inside the new current fragment where unread bytes begin.
    pub(crate) n: usize,
}

pub(crate) struct Navigator<'a> {
    root: &'a NodeRef,
    height: usize,
    index: [usize; MAX_DEPTH],
    node: [&'a TreeNode; MAX_DEPTH],
    offset: usize,
}

impl<'a> Navigator<'a> {
    fn new(root: &'a NodeRef) -> Self {
        let tree = root.tree();
        Self {
            root,
            height: tree.height(),
            index: [0; MAX_DEPTH],
            node: [tree; MAX_DEPTH],
            offset: 0,
        }
    }

    /// A navigator positioned on the first fragment of `root`.
    pub(crate) fn first(root: &'a NodeRef) -> Self {
        let mut navigator = Self::new(root);
        navigator.init_first(root);
        navigator
    }

    /// A navigator positioned on the last fragment of `root`.
    pub(crate) fn last(root: &'a NodeRef) -> Self {
        let mut navigator = Self::new(root);
        navigator.init_last(root);
        navigator
    }

    /// A navigator positioned on the fragment containing byte `offset`,
    /// together with the offset inside that fragment.
    pub(crate) fn at_offset(root: &'a NodeRef, offset: usize) -> Option<(Self, usize)> {
        let mut navigator = Self::new(root);
        let (_, n) = navigator.init_offset(root, offset)?;
        Some((navigator, n))
    }

    pub(crate) fn root(&self) -> &'a NodeRef {
        self.root
    }

    /// Absolute offset of the first byte of the current fragment.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn current(&self) -> &'a NodeRef {
        self.node[0].edge(self.index[0])
    }

    pub(crate) fn init_first(&mut self, root: &'a NodeRef) -> &'a NodeRef {
        self.descend_from_root(root, Edge::Front);
        self.offset = 0;
        self.current()
    }

    pub(crate) fn init_last(&mut self, root: &'a NodeRef) -> &'a NodeRef {
        self.descend_from_root(root, Edge::Back);
        let edge = self.current();
        self.offset = root.len() - edge.len();
        edge
    }

    pub(crate) fn init_offset(
        &mut self,
        root: &'a NodeRef,
        offset: usize,
    ) -> Option<(&'a NodeRef, usize)> {
        let tree = root.tree();
        self.root = root;
        self.height = tree.height();
        self.node[self.height] = tree;
        self.seek(offset)
    }

    fn descend_from_root(&mut self, root: &'a NodeRef, edge: Edge) {
        let mut tree = root.tree();
        self.root = root;
        self.height = tree.height();
        let mut height = self.height;
        loop {
            let index = tree.index_at(edge);
            self.node[height] = tree;
            self.index[height] = index;
            if height == 0 {
                return;
            }
            tree = tree.edge(index).tree();
            height -= 1;
        }
    }

    /// Moves to the next fragment, or returns `None` (staying put) at the
    /// end of the tree.
    pub(crate) fn next(&mut self) -> Option<&'a NodeRef> {
        let skipped = self.current().len();
        let leaf = self.node[0];
        let edge = if self.index[0] + 1 < leaf.end() {
            self.index[0] += 1;
            leaf.edge(self.index[0])
        } else {
            self.next_up()?
        };
        self.offset += skipped;
        Some(edge)
    }

    fn next_up(&mut self) -> Option<&'a NodeRef> {
        let mut height = 0;
        let mut index = loop {
            height += 1;
            if height > self.height {
                return None;
            }
            let index = self.index[height] + 1;
            if index < self.node[height].end() {
                break index;
            }
        };
        self.index[height] = index;
        let mut node = self.node[height];
        while height > 0 {
            node = node.edge(index).tree();
            height -= 1;
            index = node.begin();
            self.node[height] = node;
            self.index[height] = index;
        }
        Some(node.edge(index))
    }

    /// Moves to the previous fragment, or returns `None` (staying put) at
    /// the start of the tree.
    pub(crate) fn previous(&mut self) -> Option<&'a NodeRef> {
        let leaf = self.node[0];
        let edge = if self.index[0] > leaf.begin() {
            self.index[0] -= 1;
            leaf.edge(self.index[0])
        } else {
            self.previous_up()?
        };
        self.offset -= edge.len();
        Some(edge)
    }

    fn previous_up(&mut self) -> Option<&'a NodeRef> {
        let mut height = 0;
        let mut index = loop {
            height += 1;
            if height > self.height {
                return None;
            }
            if self.index[height] > self.node[height].begin() {
                break self.index[height] - 1;
            }
        };
        self.index[height] = index;
        let mut node = self.node[height];
        while height > 0 {
            node = node.edge(index).tree();
            height -= 1;
            index = node.end() - 1;
            self.node[height] = node;
            self.index[height] = index;
        }
        Some(node.edge(index))
    }

    /// Positions on the fragment containing absolute byte `offset` and
    /// returns it with the offset inside it. Returns `None` (staying put)
    /// when `offset` is past the end.
    pub(crate) fn seek(&mut self, offset: usize) -> Option<(&'a NodeRef, usize)> {
        let mut node = self.node[self.height];
        if offset >= node.len() {
            return None;
        }
        let mut height = self.height;
        let mut pos = node.index_of(offset);
        self.index[height] = pos.index;
        while height > 0 {
            node = node.edge(pos.index).tree();
            height -= 1;
            pos = node.index_of(pos.n);
            self.node[height] = node;
            self.index[height] = pos.index;
        }
        self.offset = offset - pos.n;
        Some((node.edge(pos.index), pos.n))
    }

    /// Skips `n` bytes counted from the start of the current fragment and
    /// returns the fragment reached with the offset inside it. Returns
    /// `None` (staying put) when that runs past the end.
    pub(crate) fn skip(&mut self, n: usize) -> Option<(&'a NodeRef, usize)> {
        let start = self.offset;
        let total = n;
        let mut n = n;
        let mut height = 0;
        let mut node = self.node[0];
        let mut index = self.index[0];
        let mut edge = node.edge(index);

        // Climb until a level has a child at or past the target.
        while n >= edge.len() {
            n -= edge.len();
            index += 1;
            while index == node.end() {
                height += 1;
                if height > self.height {
                    return None;
                }
                node = self.node[height];
                index = self.index[height] + 1;
            }
            edge = node.edge(index);
        }

        // Descend to the fragment holding the target.
        while height > 0 {
            self.index[height] = index;
            node = edge.tree();
            height -= 1;
            self.node[height] = node;
            index = node.begin();
            edge = node.edge(index);
            while n >= edge.len() {
                n -= edge.len();
                index += 1;
                edge = node.edge(index);
            }
        }
        self.index[0] = index;
        self.offset = start + total - n;
        Some((edge, n))
    }

    /// Reads `n` bytes starting `edge_offset` bytes into the current
    /// fragment, as a tree sharing structure with the navigated one.
    ///
    /// Afterwards the navigator is on the fragment holding the first unread
    /// byte; at the end of the tree it stays on the last fragment and the
    /// returned offset equals that fragment's length.
    pub(crate) fn read(&mut self, edge_offset: usize, n: usize) -> ReadResult {
        let start = self.offset + edge_offset;
        let end = start + n;
        let length = self.root.len();
        debug_assert!(end <= length, "read past the end of the tree");
        let tree = sub_tree(self.root, start, n);
        let n = if end < length {
            self.seek(end).map_or(0, |(_, n)| n)
        } else {
            self.init_last(self.root).len()
        };
        ReadResult { tree, n }
    }
}
