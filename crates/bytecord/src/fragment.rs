//! Leaf fragments: the nodes that actually hold bytes.
//!
//! A fragment is one of
//!
//! * `Owned`: a heap buffer owned by the rope. Spare capacity past its length
//!   can be filled in place while the fragment is exclusively owned.
//! * `Borrowed`: memory owned by someone else, released through a callback
//!   once the last reference to the fragment goes away.
//! * `View`: a sub-range of an `Owned` or `Borrowed` fragment. Views never
//!   point at other views; taking a view of a view composes the offsets.
//!
//! No fragment is ever empty. Constructors that would produce an empty
//! fragment return `None` instead.

use alloc::{boxed::Box, sync::Arc, vec::Vec};

use crate::node::{Node, NodeRef};

/// Smallest capacity allocated for an owned fragment.
pub(crate) const MIN_FLAT_LEN: usize = 32;
/// Default upper bound on the bytes packed into a new fragment.
pub(crate) const DEFAULT_FLAT_LEN: usize = 4 * 1024;
/// Hard upper bound on the bytes packed into a new fragment.
pub(crate) const MAX_FLAT_LEN: usize = 256 * 1024;

/// Rounds a requested capacity up to its allocation size class: multiples of
/// 8 up to 512 bytes, of 64 up to 8 KiB and of 4 KiB beyond.
pub(crate) fn size_class(n: usize) -> usize {
    let n = n.max(MIN_FLAT_LEN);
    if n <= 512 {
        n.next_multiple_of(8)
    } else if n <= 8 * 1024 {
        n.next_multiple_of(64)
    } else if n <= MAX_FLAT_LEN {
        n.next_multiple_of(4 * 1024)
    } else {
        n
    }
}

/// Memory that lives outside the rope.
pub(crate) trait External: Send + Sync {
    fn bytes(&self) -> &[u8];

    /// Static memory needs no release and is never written to.
    fn is_static(&self) -> bool {
        false
    }
}

/// External data paired with the callback that releases it.
pub(crate) struct Releasing<T, F: FnOnce(T)> {
    data: Option<T>,
    release: Option<F>,
}

impl<T, F: FnOnce(T)> Releasing<T, F> {
    pub(crate) fn new(data: T, release: F) -> Self {
        Self {
            data: Some(data),
            release: Some(release),
        }
    }
}

impl<T, F> External for Releasing<T, F>
where
    T: AsRef<[u8]> + Send + Sync,
    F: FnOnce(T) + Send + Sync,
{
    fn bytes(&self) -> &[u8] {
        match &self.data {
            Some(data) => data.as_ref(),
            None => &[],
        }
    }
}

impl<T, F: FnOnce(T)> Drop for Releasing<T, F> {
    fn drop(&mut self) {
        if let (Some(data), Some(release)) = (self.data.take(), self.release.take()) {
            release(data);
        }
    }
}

pub(crate) struct StaticBytes(pub(crate) &'static [u8]);

impl External for StaticBytes {
    fn bytes(&self) -> &[u8] {
        self.0
    }

    fn is_static(&self) -> bool {
        true
    }
}

pub(crate) enum Fragment {
    Owned(Vec<u8>),
    Borrowed(Box<dyn External>),
    View {
        child: NodeRef,
        start: usize,
        len: usize,
    },
}

impl Fragment {
    pub(crate) fn len(&self) -> usize {
        match self {
            Fragment::Owned(buf) => buf.len(),
            Fragment::Borrowed(external) => external.bytes().len(),
            Fragment::View { len, .. } => *len,
        }
    }

    pub(crate) fn data(&self) -> &[u8] {
        match self {
            Fragment::Owned(buf) => buf,
            Fragment::Borrowed(external) => external.bytes(),
            Fragment::View { child, start, len } => &child.data()[*start..*start + *len],
        }
    }

    /// Bytes that can still be written past the end without reallocating.
    pub(crate) fn spare_capacity(&self) -> usize {
        match self {
            Fragment::Owned(buf) => buf.capacity() - buf.len(),
            Fragment::Borrowed(_) | Fragment::View { .. } => 0,
        }
    }
}

/// Copies `data` into a new owned fragment with room for at least `extra`
/// more bytes.
pub(crate) fn owned(data: &[u8], extra: usize) -> NodeRef {
    debug_assert!(!data.is_empty());
    let mut buf = Vec::with_capacity(size_class(data.len() + extra));
    buf.extend_from_slice(data);
    Node::new_fragment(Fragment::Owned(buf))
}

/// Adopts `buf` without copying.
pub(crate) fn from_vec(buf: Vec<u8>) -> Option<NodeRef> {
    (!buf.is_empty()).then(|| Node::new_fragment(Fragment::Owned(buf)))
}

/// Wraps external memory. Empty memory is released immediately.
pub(crate) fn borrowed(external: Box<dyn External>) -> Option<NodeRef> {
    if external.bytes().is_empty() {
        return None;
    }
    Some(Node::new_fragment(Fragment::Borrowed(external)))
}

/// Splits `data` into owned fragments of at most `flat_len` bytes. The last
/// fragment reserves `extra` spare bytes, capped so it never exceeds
/// `flat_len`.
pub(crate) fn split(data: &[u8], flat_len: usize, extra: usize) -> Vec<NodeRef> {
    let mut fragments = Vec::with_capacity(data.len().div_ceil(flat_len));
    let mut chunks = data.chunks(flat_len).peekable();
    while let Some(chunk) = chunks.next() {
        let spare = if chunks.peek().is_none() {
            extra.min(flat_len - chunk.len())
        } else {
            0
        };
        fragments.push(owned(chunk, spare));
    }
    fragments
}

/// Returns a fragment covering `len` bytes of `node` starting at `start`.
///
/// `node` must be a fragment. A view spanning the whole fragment is the
/// fragment itself, and a view of a view refers to the underlying fragment.
pub(crate) fn view(node: &NodeRef, start: usize, len: usize) -> NodeRef {
    debug_assert!(len > 0, "views are never empty");
    debug_assert!(start + len <= node.len(), "view exceeds its fragment");
    if start == 0 && len == node.len() {
        return Arc::clone(node);
    }
    let (child, start) = match &**node {
        Node::Fragment(Fragment::View {
            child, start: base, ..
        }) => (Arc::clone(child), base + start),
        Node::Fragment(_) => (Arc::clone(node), start),
        Node::Tree(_) => unreachable!("views are only taken of fragments"),
    };
    Node::new_fragment(Fragment::View { child, start, len })
}

/// Shortens a fragment to its first `len` bytes, in place when it is
/// exclusively owned and not borrowed.
pub(crate) fn resize(mut node: NodeRef, len: usize) -> NodeRef {
    debug_assert!(len > 0 && len <= node.len());
    if len == node.len() {
        return node;
    }
    let in_place = match Arc::get_mut(&mut node) {
        Some(Node::Fragment(Fragment::Owned(buf))) => {
            buf.truncate(len);
            true
        }
        Some(Node::Fragment(Fragment::View { len: view_len, .. })) => {
            *view_len = len;
            true
        }
        _ => false,
    };
    if in_place { node } else { view(&node, 0, len) }
}
