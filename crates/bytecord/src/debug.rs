//! Structural diagnostics: dumps, invariant checks and memory accounting.

use alloc::{format, string::String, sync::Arc, vec::Vec};
use core::{fmt, mem};

use bstr::BStr;

use crate::{
    Rope, Validation, ValidationError,
    fragment::Fragment,
    node::{Node, NodeRef},
    tree::{CAPACITY, MAX_HEIGHT, TreeNode},
};

/// Bytes of content shown in a dump line.
const PREVIEW_LEN: usize = 16;

/// Heap size of a node allocation: the node plus its two reference counts.
const NODE_SIZE: usize = mem::size_of::<Node>() + 2 * mem::size_of::<usize>();

/// How [`Rope::estimated_memory_usage`] counts memory shared with other
/// ropes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accounting {
    /// Count every node reachable from the rope in full, shared or not.
    Total,
    /// Divide each node by the number of references to it, so that the
    /// estimates of all ropes sharing a node add up to its size once.
    FairShare,
}

/// The structure of a rope rendered one node per line.
///
/// Returned by [`Rope::dump`]. Children are indented by two spaces below
/// their parent.
pub struct Dump<'a> {
    rope: &'a Rope,
}

impl<'a> Dump<'a> {
    pub(crate) fn new(rope: &'a Rope) -> Self {
        Self { rope }
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.rope.root() else {
            let bytes = self.rope.inline_bytes().unwrap_or_default();
            return write!(f, "inline len={} {:?}", bytes.len(), BStr::new(bytes));
        };
        let mut stack: Vec<(&NodeRef, usize)> = alloc::vec![(root, 0)];
        let mut first = true;
        while let Some((node, depth)) = stack.pop() {
            if !first {
                f.write_str("\n")?;
            }
            first = false;
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            let refs = Arc::strong_count(node);
            match &**node {
                Node::Tree(tree) => {
                    write!(
                        f,
                        "tree height={} len={} edges={} refs={refs}",
                        tree.height(),
                        tree.len(),
                        tree.size()
                    )?;
                    stack.extend(tree.edges().rev().map(|edge| (edge, depth + 1)));
                }
                Node::Fragment(Fragment::Owned(buf)) => {
                    write!(f, "owned len={} cap={} refs={refs} ", buf.len(), buf.capacity())?;
                    preview(f, buf)?;
                }
                Node::Fragment(Fragment::Borrowed(external)) => {
                    let kind = if external.is_static() {
                        "borrowed(static)"
                    } else {
                        "borrowed"
                    };
                    let bytes = external.bytes();
                    write!(f, "{kind} len={} refs={refs} ", bytes.len())?;
                    preview(f, bytes)?;
                }
                Node::Fragment(Fragment::View { child, start, len }) => {
                    write!(f, "view start={start} len={len} refs={refs}")?;
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(())
    }
}

fn preview(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    let shown = &bytes[..bytes.len().min(PREVIEW_LEN)];
    write!(f, "{:?}", BStr::new(shown))?;
    if shown.len() < bytes.len() {
        f.write_str("...")?;
    }
    Ok(())
}

/// Checks `root` at the given level. Shallow checks look at the root node
/// and its edges; exhaustive checks visit every node.
pub(crate) fn validate(root: &NodeRef, level: Validation) -> Result<(), ValidationError> {
    match level {
        Validation::Off => Ok(()),
        Validation::Shallow => check_node(root, "root"),
        Validation::Exhaustive => {
            let mut stack: Vec<(&NodeRef, String)> = alloc::vec![(root, String::from("root"))];
            while let Some((node, path)) = stack.pop() {
                check_node(node, &path)?;
                if let Node::Tree(tree) = &**node {
                    for index in (tree.begin()..tree.end()).rev() {
                        stack.push((tree.edge(index), format!("{path}/{index}")));
                    }
                }
            }
            Ok(())
        }
    }
}

fn check_node(node: &NodeRef, path: &str) -> Result<(), ValidationError> {
    match &**node {
        Node::Fragment(fragment) => check_fragment(fragment, path),
        Node::Tree(tree) => check_tree(tree, path),
    }
}

fn check_fragment(fragment: &Fragment, path: &str) -> Result<(), ValidationError> {
    if fragment.len() == 0 {
        return Err(ValidationError::EmptyFragment { path: path.into() });
    }
    if let Fragment::View { child, start, len } = fragment {
        if !matches!(
            &**child,
            Node::Fragment(Fragment::Owned(_) | Fragment::Borrowed(_))
        ) {
            return Err(ValidationError::InvalidViewChild { path: path.into() });
        }
        if start + len > child.len() {
            return Err(ValidationError::ViewOutOfBounds {
                path: path.into(),
                start: *start,
                len: *len,
                child_len: child.len(),
            });
        }
    }
    Ok(())
}

fn check_tree(tree: &TreeNode, path: &str) -> Result<(), ValidationError> {
    if tree.height() > MAX_HEIGHT {
        return Err(ValidationError::HeightExceeded {
            path: path.into(),
            height: tree.height(),
            max: MAX_HEIGHT,
        });
    }
    let (begin, end) = (tree.begin(), tree.end());
    if begin >= end || end > CAPACITY {
        return Err(ValidationError::EdgeRange {
            path: path.into(),
            begin,
            end,
        });
    }
    for (index, slot) in tree.slots().iter().enumerate() {
        if slot.is_some() != (begin..end).contains(&index) {
            return Err(ValidationError::SlotOccupancy {
                path: path.into(),
                index,
            });
        }
    }
    let expected = tree.level() - 1;
    let mut actual = 0;
    for index in begin..end {
        let edge = tree.edge(index);
        if edge.level() != expected {
            return Err(ValidationError::ChildLevel {
                path: path.into(),
                index,
                expected,
                found: edge.level(),
            });
        }
        actual += edge.len();
    }
    if actual != tree.len() {
        return Err(ValidationError::LengthMismatch {
            path: path.into(),
            recorded: tree.len(),
            actual,
        });
    }
    Ok(())
}

/// Estimated heap bytes below `root`, including `root` itself.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn memory_usage(root: &NodeRef, accounting: Accounting) -> usize {
    let mut total = 0.0_f64;
    let mut stack: Vec<(&NodeRef, f64)> = alloc::vec![(root, 1.0)];
    while let Some((node, share)) = stack.pop() {
        let share = match accounting {
            Accounting::Total => share,
            Accounting::FairShare => share / Arc::strong_count(node) as f64,
        };
        let own = match &**node {
            Node::Tree(tree) => {
                stack.extend(tree.edges().map(|edge| (edge, share)));
                NODE_SIZE
            }
            Node::Fragment(Fragment::Owned(buf)) => NODE_SIZE + buf.capacity(),
            Node::Fragment(Fragment::Borrowed(external)) if external.is_static() => NODE_SIZE,
            Node::Fragment(Fragment::Borrowed(external)) => NODE_SIZE + external.bytes().len(),
            Node::Fragment(Fragment::View { child, .. }) => {
                stack.push((child, share));
                NODE_SIZE
            }
        };
        total += own as f64 * share;
    }
    (total + 0.5) as usize
}

#[cfg(test)]
mod tests {
    use alloc::{boxed::Box, string::ToString, vec};

    use insta::assert_snapshot;

    use super::*;
    use crate::{
        RopeOptions,
        fragment::{self, StaticBytes},
        tree::{build, tests::leaf},
    };

    #[test]
    fn dump_of_inline_and_borrowed_content() {
        assert_snapshot!(Rope::new().dump(), @r#"inline len=0 """#);
        let rope = Rope::from_static(b"static bytes that are long enough");
        assert_snapshot!(rope.dump(), @r#"borrowed(static) len=33 refs=1 "static bytes tha"..."#);
    }

    #[test]
    fn exhaustive_checks_reach_nested_nodes() {
        let fragments = (0..40).map(|i| fragment::owned(&[i; 3], 0)).collect();
        let root = build(fragments);
        assert_eq!(validate(&root, Validation::Exhaustive), Ok(()));
    }

    #[test]
    fn views_of_views_are_rejected() {
        let base = fragment::owned(b"0123456789", 0);
        let view = Node::new_fragment(Fragment::View {
            child: base,
            start: 2,
            len: 6,
        });
        let nested = Node::new_fragment(Fragment::View {
            child: view,
            start: 1,
            len: 2,
        });
        assert_eq!(
            check_node(&nested, "root"),
            Err(ValidationError::InvalidViewChild {
                path: "root".to_string()
            })
        );
    }

    #[test]
    fn out_of_bounds_views_are_rejected() {
        let base = fragment::owned(b"0123", 0);
        let view = Node::new_fragment(Fragment::View {
            child: base,
            start: 3,
            len: 2,
        });
        let error = check_node(&view, "root/1").expect_err("view exceeds its child");
        assert_eq!(
            error.to_string(),
            "root/1: view 3+2 exceeds its 4 byte child"
        );
    }

    #[test]
    fn fragments_under_an_inner_node_are_misplaced() {
        let mut parent = TreeNode::new(1);
        parent.add(crate::tree::Edge::Back, Node::new_tree(leaf(&[b"ab"])));
        parent.add(crate::tree::Edge::Back, fragment::owned(b"cd", 0));
        let root = Node::new_tree(parent);
        assert_eq!(
            validate(&root, Validation::Shallow),
            Err(ValidationError::ChildLevel {
                path: "root".to_string(),
                index: 1,
                expected: 0,
                found: -1,
            })
        );
    }

    #[test]
    fn fair_share_splits_shared_fragments() {
        let buf = fragment::from_vec(vec![1; 1000]).expect("non-empty");
        let rope = Rope::from_root(Some(buf), RopeOptions::DEFAULT);
        let copy = rope.clone();
        let total = rope.estimated_memory_usage(Accounting::Total);
        let fair = rope.estimated_memory_usage(Accounting::FairShare);
        assert_eq!(total, mem::size_of::<Rope>() + NODE_SIZE + 1000);
        assert!(fair < total && fair >= 500);
        drop(copy);
        assert_eq!(rope.estimated_memory_usage(Accounting::FairShare), total);
    }

    #[test]
    fn static_memory_is_not_counted() {
        let shared = fragment::borrowed(Box::new(StaticBytes(&[7; 64]))).expect("non-empty");
        let rope = Rope::from_root(Some(shared), RopeOptions::DEFAULT);
        assert_eq!(
            rope.estimated_memory_usage(Accounting::Total),
            mem::size_of::<Rope>() + NODE_SIZE
        );
    }
}
