//! Edits that add or remove bytes at the edges of a tree.

use alloc::{sync::Arc, vec::Vec};

use smallvec::SmallVec;

use super::{
    CAPACITY, Edge, MAX_DEPTH, TreeNode, collapse, copy_prefix, extract_front, force_tree,
    spine::{OpResult, Spine},
    tree_mut,
};
use crate::{
    fragment::{self, Fragment},
    log::{debug, trace},
    node::{Node, NodeRef, is_unique},
};

/// Adds a fragment at `edge` of `tree`, which may itself be a fragment.
pub(crate) fn add_fragment(tree: NodeRef, fragment: NodeRef, edge: Edge) -> NodeRef {
    add_fragment_along(Spine::new(edge), tree, fragment)
}

fn add_fragment_along(mut spine: Spine, tree: NodeRef, fragment: NodeRef) -> NodeRef {
    debug_assert!(fragment.as_fragment().is_some() && fragment.len() > 0);
    let tree = force_tree(tree);
    let depth = tree.tree().height();
    let delta = fragment.len();
    let (leaf, owned) = spine.descend(tree, depth);
    let result = spine.add_edge(leaf, owned, fragment);
    spine.unwind(result, delta)
}

/// Adds `data` at `edge` of `tree`.
///
/// At the back, spare capacity of an exclusively owned tail fragment is
/// filled in place first. The remaining bytes are packed into new fragments
/// of at most `flat_len` bytes, the last of which reserves `extra` spare
/// bytes when appending.
pub(crate) fn add_bytes(
    tree: NodeRef,
    data: &[u8],
    edge: Edge,
    extra: usize,
    flat_len: usize,
) -> NodeRef {
    let mut tree = tree;
    let mut data = data;
    if edge == Edge::Back {
        let filled = append_in_place(&mut tree, data, flat_len);
        data = &data[filled..];
    }
    if data.is_empty() {
        return tree;
    }

    let mut tree = force_tree(tree);
    while !data.is_empty() {
        let depth = tree.tree().height();
        let mut spine = Spine::new(edge);
        let (leaf, owned) = spine.descend(tree, depth);
        let (result, added) = if leaf.tree().is_full() {
            let mut fresh = TreeNode::new(0);
            let added = fill_leaf(&mut fresh, data, edge, extra, flat_len);
            let sibling = Node::new_tree(fresh);
            (OpResult::Popped { node: leaf, sibling }, added)
        } else if owned {
            let mut leaf = leaf;
            let added = fill_leaf(tree_mut(&mut leaf), data, edge, extra, flat_len);
            (OpResult::Mutated(leaf), added)
        } else {
            let mut copy = leaf.tree().copy();
            let added = fill_leaf(&mut copy, data, edge, extra, flat_len);
            (OpResult::Copied(Node::new_tree(copy)), added)
        };
        tree = spine.unwind(result, added);
        data = match edge {
            Edge::Back => &data[added..],
            Edge::Front => &data[..data.len() - added],
        };
    }
    tree
}

/// Fills the free slots of `leaf` with new fragments. Appending consumes
/// `data` from its start; prepending consumes it from its end so the bytes
/// keep their order. Returns the number of bytes consumed.
fn fill_leaf(leaf: &mut TreeNode, data: &[u8], edge: Edge, extra: usize, flat_len: usize) -> usize {
    let mut added = 0;
    while added < data.len() && !leaf.is_full() {
        let remaining = data.len() - added;
        let take = remaining.min(flat_len);
        let fragment = match edge {
            Edge::Back => {
                let spare = if take == remaining {
                    extra.min(flat_len - take)
                } else {
                    0
                };
                fragment::owned(&data[added..added + take], spare)
            }
            Edge::Front => fragment::owned(&data[remaining - take..remaining], 0),
        };
        leaf.add(edge, fragment);
        added += take;
    }
    added
}

/// Copies as much of `data` as fits into the spare capacity of the tail
/// fragment without growing it past `flat_len`. Nothing is written unless
/// the whole back spine, tail fragment included, is exclusively owned.
/// Returns the number of bytes consumed.
fn append_in_place(root: &mut NodeRef, data: &[u8], flat_len: usize) -> usize {
    let mut node: &NodeRef = root;
    let spare = loop {
        if !is_unique(node) {
            return 0;
        }
        match &**node {
            Node::Tree(tree) => node = tree.edge_at(Edge::Back),
            Node::Fragment(fragment) => {
                break fragment
                    .spare_capacity()
                    .min(flat_len.saturating_sub(fragment.len()));
            }
        }
    };
    let n = spare.min(data.len());
    if n == 0 {
        return 0;
    }

    let mut node: &mut NodeRef = root;
    loop {
        match Arc::get_mut(node) {
            Some(Node::Tree(tree)) => {
                tree.add_length(n);
                node = tree.edge_at_mut(Edge::Back);
            }
            Some(Node::Fragment(Fragment::Owned(buf))) => {
                buf.extend_from_slice(&data[..n]);
                return n;
            }
            _ => unreachable!("the back spine was checked to be exclusively owned"),
        }
    }
}

/// Concatenates two roots, each a fragment or a tree node.
pub(crate) fn concat(front: NodeRef, back: NodeRef) -> NodeRef {
    match (front.as_tree().is_some(), back.as_tree().is_some()) {
        (_, false) => add_fragment(front, back, Edge::Back),
        (false, true) => add_fragment(back, front, Edge::Front),
        (true, true) => merge(front, back),
    }
}

/// Concatenates two trees. The taller one receives the shorter one, which
/// is grafted onto the facing spine at the level where heights match.
pub(crate) fn merge(front: NodeRef, back: NodeRef) -> NodeRef {
    if front.tree().height() >= back.tree().height() {
        graft(front, back, Edge::Back)
    } else {
        graft(back, front, Edge::Front)
    }
}

fn graft(dst: NodeRef, src: NodeRef, edge: Edge) -> NodeRef {
    let depth = dst.tree().height() - src.tree().height();
    let delta = src.len();
    let mut spine = Spine::new(edge);
    let (target, owned) = spine.descend(dst, depth);
    let result = if target.tree().size() + src.tree().size() <= CAPACITY {
        if owned {
            let mut target = target;
            absorb(tree_mut(&mut target), src, edge);
            OpResult::Mutated(target)
        } else {
            let mut copy = target.tree().copy();
            absorb(&mut copy, src, edge);
            OpResult::Copied(Node::new_tree(copy))
        }
    } else {
        OpResult::Popped {
            node: target,
            sibling: src,
        }
    };
    spine.unwind(result, delta)
}

/// Moves the children of `src` into `dst` at `edge`, keeping their order.
fn absorb(dst: &mut TreeNode, src: NodeRef, edge: Edge) {
    let edges: SmallVec<[NodeRef; CAPACITY]> = match Arc::try_unwrap(src) {
        Ok(Node::Tree(mut tree)) => tree.take_all(),
        Ok(Node::Fragment(_)) => unreachable!("only tree nodes are grafted"),
        Err(shared) => shared.tree().edges().cloned().collect(),
    };
    match edge {
        Edge::Back => edges.into_iter().for_each(|child| dst.add(Edge::Back, child)),
        Edge::Front => edges
            .into_iter()
            .rev()
            .for_each(|child| dst.add(Edge::Front, child)),
    }
}

/// Packs `fragments` into a tree of minimum height.
pub(crate) fn build(fragments: Vec<NodeRef>) -> NodeRef {
    debug_assert!(!fragments.is_empty());
    let mut level = fragments;
    let mut height = 0;
    loop {
        let mut parents = Vec::with_capacity(level.len().div_ceil(CAPACITY));
        let mut current = TreeNode::new(height);
        for node in level {
            if current.is_full() {
                let full = core::mem::replace(&mut current, TreeNode::new(height));
                parents.push(Node::new_tree(full));
            }
            current.add(Edge::Back, node);
        }
        parents.push(Node::new_tree(current));
        if parents.len() == 1 {
            if let Some(root) = parents.pop() {
                return root;
            }
        }
        level = parents;
        height += 1;
    }
}

/// Repacks every fragment of `tree` into a tree of minimum height.
pub(crate) fn rebuild(tree: NodeRef) -> NodeRef {
    let mut fragments = Vec::new();
    let mut stack: SmallVec<[&NodeRef; MAX_DEPTH * CAPACITY]> = SmallVec::new();
    stack.push(&tree);
    while let Some(node) = stack.pop() {
        match &**node {
            Node::Tree(inner) => stack.extend(inner.edges().rev()),
            Node::Fragment(_) => fragments.push(Arc::clone(node)),
        }
    }
    let rebuilt = build(fragments);
    debug!(
        from_height = tree.level(),
        to_height = rebuilt.level(),
        length = rebuilt.len(),
        "rebuilt rope tree"
    );
    rebuilt
}

/// Removes the last `n` bytes of `tree`, which may be a fragment. Returns
/// `None` when nothing is left.
pub(crate) fn remove_suffix(tree: NodeRef, n: usize) -> Option<NodeRef> {
    let len = tree.len();
    if n == 0 {
        return Some(tree);
    }
    if n >= len {
        return None;
    }
    let length = len - n;

    // Drop top levels whose remaining prefix lies entirely in the front child.
    let mut node = tree;
    let within = loop {
        if node.len() == length {
            return Some(node);
        }
        let Some(pos) = node.as_tree().map(|tree| tree.index_of_length(length)) else {
            return Some(fragment::resize(node, length));
        };
        if pos.index != node.tree().begin() {
            break pos.n;
        }
        node = extract_front(node);
    };

    let mut top = if is_unique(&node) {
        let mut node = node;
        tree_mut(&mut node).truncate(length);
        node
    } else {
        Node::new_tree(node.tree().copy_begin_to(length))
    };

    // Trim the back spine: owned nodes in place, the first shared node is
    // replaced by a prefix copy.
    let mut current = tree_mut(&mut top);
    let mut length = within;
    loop {
        let index = current.index_at(Edge::Back);
        let edge = current.edge(index);
        if edge.len() == length {
            break;
        }
        if edge.as_tree().is_none() {
            let edge = current.take(index);
            current.put(index, fragment::resize(edge, length));
            break;
        }
        if !is_unique(edge) {
            // The copy may skip levels; it must fill the slot at the edge's level.
            let prefix = copy_prefix(edge, length).raise(edge.level());
            current.replace(index, prefix);
            break;
        }
        let within = edge.tree().index_of_length(length).n;
        let child = tree_mut(current.edge_mut(index));
        child.truncate(length);
        current = child;
        length = within;
    }
    Some(top)
}

/// Detaches the tail fragment of `tree` for reuse as an append buffer.
///
/// This only succeeds when the whole back spine, the tail included, is
/// exclusively owned, the tail is an owned buffer, and it has at least
/// `min_capacity` spare bytes. On success returns what is left of the tree
/// (if anything) and the buffer; otherwise hands `tree` back unchanged.
pub(crate) fn extract_append_buffer(
    tree: NodeRef,
    min_capacity: usize,
) -> Result<(Option<NodeRef>, Vec<u8>), NodeRef> {
    if !can_extract(&tree, min_capacity) {
        return Err(tree);
    }

    let mut stack: SmallVec<[TreeNode; MAX_DEPTH]> = SmallVec::new();
    let mut node = tree;
    let buf = loop {
        match Arc::try_unwrap(node) {
            Ok(Node::Tree(mut tree)) => {
                node = tree.pop_back();
                stack.push(tree);
            }
            Ok(Node::Fragment(Fragment::Owned(buf))) => break buf,
            _ => unreachable!("the back spine was checked to be exclusively owned"),
        }
    };

    let mut child: Option<NodeRef> = None;
    while let Some(mut tree) = stack.pop() {
        if let Some(child) = child.take() {
            tree.add(Edge::Back, child);
        }
        if tree.size() > 0 {
            child = Some(Node::new_tree(tree));
        }
    }
    trace!(
        len = buf.len(),
        capacity = buf.capacity(),
        "extracted append buffer"
    );
    Ok((child.map(collapse), buf))
}

fn can_extract(tree: &NodeRef, min_capacity: usize) -> bool {
    let mut node = tree;
    loop {
        if !is_unique(node) {
            return false;
        }
        match &**node {
            Node::Tree(tree) => node = tree.edge_at(Edge::Back),
            Node::Fragment(fragment @ Fragment::Owned(_)) => {
                return fragment.spare_capacity() >= min_capacity;
            }
            Node::Fragment(_) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use quickcheck::{QuickCheck, TestResult};

    use super::*;
    use crate::{
        Validation,
        debug::validate,
        tree::{
            MAX_HEIGHT,
            tests::{flatten, leaf},
        },
    };

    fn fragments(count: usize, len: usize) -> Vec<NodeRef> {
        (0..count)
            .map(|i| {
                let byte = b'a' + u8::try_from(i % 26).unwrap();
                fragment::owned(&alloc::vec![byte; len], 0)
            })
            .collect()
    }

    fn height(node: &NodeRef) -> usize {
        node.tree().height()
    }

    #[test]
    fn add_fragment_grows_the_tree_upwards() {
        let mut tree = fragment::owned(b"a", 0);
        let mut expected = alloc::vec![b'a'];
        for fragment in fragments(37, 1) {
            expected.extend_from_slice(fragment.data());
            tree = add_fragment(tree, fragment, Edge::Back);
        }
        assert_eq!(flatten(&tree), expected);
        assert_eq!(height(&tree), 2);
    }

    #[test]
    fn add_fragment_at_the_front_keeps_order() {
        let mut tree = fragment::owned(b"z", 0);
        for byte in (b'a'..b'z').rev() {
            tree = add_fragment(tree, fragment::owned(&[byte], 0), Edge::Front);
        }
        assert_eq!(flatten(&tree), b"abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn add_fragment_leaves_shared_trees_untouched() {
        let tree = build(fragments(12, 2));
        let before = flatten(&tree);
        let keep = Arc::clone(&tree);
        let grown = add_fragment(tree, fragment::owned(b"!", 0), Edge::Back);
        assert_eq!(flatten(&keep), before);
        assert_eq!(grown.len(), keep.len() + 1);
        // Untouched front subtree is shared, not copied.
        assert!(Arc::ptr_eq(
            grown.tree().edge_at(Edge::Front),
            keep.tree().edge_at(Edge::Front)
        ));
    }

    #[test]
    fn add_bytes_fills_the_tail_in_place() {
        let tree = Node::new_tree(leaf(&[b"ab", b"cd"]));
        let tail = Arc::as_ptr(tree.tree().edge_at(Edge::Back));
        let tree = add_bytes(tree, b"ef", Edge::Back, 0, 4096);
        assert_eq!(flatten(&tree), b"abcdef");
        assert_eq!(tree.tree().size(), 2);
        assert_eq!(Arc::as_ptr(tree.tree().edge_at(Edge::Back)), tail);
    }

    #[test]
    fn add_bytes_never_writes_into_a_shared_tail() {
        let tree = Node::new_tree(leaf(&[b"ab", b"cd"]));
        let tail = Arc::clone(tree.tree().edge_at(Edge::Back));
        let tree = add_bytes(tree, b"ef", Edge::Back, 0, 4096);
        assert_eq!(flatten(&tree), b"abcdef");
        assert_eq!(tail.data(), b"cd");
    }

    #[test]
    fn add_bytes_packs_into_bounded_fragments() {
        let data: Vec<u8> = (0..=255).collect();
        let tree = add_bytes(fragment::owned(b"x", 0), &data[..100], Edge::Back, 0, 7);
        let tree = add_bytes(tree, &data[100..], Edge::Front, 0, 7);
        let mut expected = data[100..].to_vec();
        expected.push(b'x');
        expected.extend_from_slice(&data[..100]);
        assert_eq!(flatten(&tree), expected);
    }

    #[test]
    fn merge_grafts_the_shorter_tree() {
        let tall = build(fragments(40, 3));
        let short = build(fragments(3, 3));
        let mut expected = flatten(&tall);
        expected.extend(flatten(&short));
        let merged = concat(Arc::clone(&tall), Arc::clone(&short));
        assert_eq!(flatten(&merged), expected);
        assert_eq!(height(&merged), height(&tall));

        let mut expected = flatten(&short);
        expected.extend(flatten(&tall));
        let merged = concat(short, tall);
        assert_eq!(flatten(&merged), expected);
    }

    #[test]
    fn overflowing_the_height_bound_rebuilds() {
        // Root of height 2: five sparse children and one completely full
        // one, so the back spine is full but the tree holds few fragments.
        let mut root = TreeNode::new(2);
        for fragment in fragments(5, 1) {
            let leaf = Node::new_tree(TreeNode::with_edge(0, fragment));
            root.add(Edge::Back, Node::new_tree(TreeNode::with_edge(1, leaf)));
        }
        let full = build(fragments(36, 1));
        assert_eq!(height(&full), 1);
        root.add(Edge::Back, full);
        let root = Node::new_tree(root);
        let mut expected = flatten(&root);
        expected.push(b'!');

        let spine = Spine::with_max_height(Edge::Back, 2);
        let tree = add_fragment_along(spine, root, fragment::owned(b"!", 0));
        assert_eq!(flatten(&tree), expected);
        assert_eq!(height(&tree), 2);
    }

    #[test]
    fn rebuild_packs_to_minimum_height() {
        let mut node = fragment::owned(b"abc", 0);
        for height in 0..=MAX_HEIGHT + 1 {
            node = Node::new_tree(TreeNode::with_edge(height, node));
        }
        let rebuilt = rebuild(node);
        assert_eq!(height(&rebuilt), 0);
        assert_eq!(flatten(&rebuilt), b"abc");
    }

    #[test]
    fn remove_suffix_of_everything_is_none() {
        let tree = build(fragments(8, 2));
        assert!(remove_suffix(tree, 16).is_none());
    }

    #[test]
    fn remove_suffix_collapses_into_the_front_child() {
        let tree = build(fragments(8, 2));
        let front = Arc::clone(tree.tree().edge_at(Edge::Front));
        let trimmed = remove_suffix(tree, 4).expect("bytes remain");
        assert!(Arc::ptr_eq(&trimmed, &front));
    }

    #[test]
    fn remove_suffix_keeps_shared_trees_intact() {
        let tree = build(fragments(40, 3));
        let keep = Arc::clone(&tree);
        let before = flatten(&keep);
        let trimmed = remove_suffix(tree, 50).expect("bytes remain");
        assert_eq!(flatten(&trimmed), &before[..before.len() - 50]);
        assert_eq!(flatten(&keep), before);
    }

    #[test]
    fn remove_suffix_raises_prefix_copies_to_their_slot() {
        // Height 2: the cut lands inside the front fragment of a shared leaf,
        // whose prefix copy is a bare view one level below the leaf's slot.
        let tree = build(fragments(40, 3));
        assert_eq!(height(&tree), 2);
        let keep = Arc::clone(&tree);
        let before = flatten(&keep);
        let trimmed = remove_suffix(tree, 64).expect("bytes remain");
        assert_eq!(validate(&trimmed, Validation::Exhaustive), Ok(()));
        assert_eq!(flatten(&trimmed), &before[..56]);
        assert_eq!(validate(&keep, Validation::Exhaustive), Ok(()));
        assert_eq!(flatten(&keep), before);
    }

    #[test]
    fn remove_suffix_matches_the_model() {
        fn prop(count: u8, len: u8, n: u16, shared: bool) -> TestResult {
            let count = usize::from(count % 50) + 1;
            let len = usize::from(len % 5) + 1;
            let tree = build(fragments(count, len));
            let model = flatten(&tree);
            let n = usize::from(n) % (model.len() + 1);
            let keep = shared.then(|| Arc::clone(&tree));
            let trimmed = remove_suffix(tree, n);
            let remaining = model.len() - n;
            match trimmed {
                None => TestResult::from_bool(remaining == 0),
                Some(trimmed) => {
                    let ok = flatten(&trimmed) == model[..remaining]
                        && trimmed.len() == remaining
                        && validate(&trimmed, Validation::Exhaustive).is_ok()
                        && keep.is_none_or(|keep| flatten(&keep) == model);
                    TestResult::from_bool(ok)
                }
            }
        }

        #[cfg(not(miri))]
        let tests = if is_ci::cached() { 10_000 } else { 1_000 };
        #[cfg(miri)]
        let tests = 10;

        QuickCheck::new()
            .tests(tests)
            .quickcheck(prop as fn(u8, u8, u16, bool) -> TestResult);
    }

    #[test]
    fn extract_append_buffer_takes_the_tail() {
        let mut tree = build(fragments(7, 2));
        let mut expected = flatten(&tree);
        tree = add_fragment(tree, fragment::owned(b"tail", 60), Edge::Back);
        let Ok((rest, buf)) = extract_append_buffer(tree, 16) else {
            panic!("tail is extractable");
        };
        assert_eq!(buf, b"tail");
        assert!(buf.capacity() >= 64);
        let rest = rest.expect("leading fragments remain");
        assert_eq!(flatten(&rest), expected);

        // A lone single-child leaf left behind collapses away.
        expected.truncate(2);
        let pair = concat(fragment::owned(b"aa", 0), fragment::owned(b"bb", 32));
        let Ok((rest, buf)) = extract_append_buffer(pair, 1) else {
            panic!("tail is extractable");
        };
        assert_eq!(buf, b"bb");
        let rest = rest.expect("front fragment remains");
        assert_eq!(rest.data(), expected);
    }

    #[test]
    fn extract_append_buffer_refuses_shared_or_full_tails() {
        let tree = add_fragment(build(fragments(3, 2)), fragment::owned(b"t", 40), Edge::Back);
        let keep = Arc::clone(&tree);
        let Err(tree) = extract_append_buffer(tree, 1) else {
            panic!("shared tree");
        };
        drop(keep);
        let Err(tree) = extract_append_buffer(tree, 4096) else {
            panic!("not enough room");
        };
        assert!(extract_append_buffer(tree, 1).is_ok());
    }
}
