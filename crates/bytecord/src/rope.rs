use alloc::{boxed::Box, string::String, vec::Vec};
use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    mem,
    ops::{Bound, RangeBounds},
};

use bstr::BStr;

use crate::{
    Chunks, Cursor, RopeBuffer, RopeOptions, Validation, ValidationError,
    debug::{self, Accounting, Dump},
    fragment::{self, Releasing, StaticBytes},
    inline::{InlineBytes, MAX_INLINE},
    log::trace,
    navigator::Navigator,
    node::NodeRef,
    tree::{self, Edge},
};

/// Ropes up to this length are copied rather than shared when appended to
/// another rope, so that chains of tiny ropes do not fragment the tree.
const MAX_BYTES_TO_COPY: usize = 511;

/// A persistent byte string with cheap clones, concatenation and slicing.
///
/// Short content (up to 15 bytes) lives inside the handle. Longer content is
/// kept in a balanced tree of reference-counted fragments: cloning a rope
/// only bumps a reference count, and edits copy the nodes they touch only
/// when those nodes are shared with another rope.
///
/// # Examples
///
/// ```rust
/// use bytecord::Rope;
///
/// let mut greeting = Rope::from("Hello");
/// let snapshot = greeting.clone();
/// greeting.append(b", world");
///
/// assert_eq!(greeting, "Hello, world");
/// assert_eq!(snapshot, "Hello");
/// assert_eq!(greeting.slice(7..), "world");
/// ```
#[derive(Clone, Default)]
pub struct Rope {
    repr: Repr,
    options: RopeOptions,
}

#[derive(Clone)]
enum Repr {
    Inline(InlineBytes),
    /// A non-empty fragment or tree node.
    Tree(NodeRef),
}

impl Default for Repr {
    fn default() -> Self {
        Repr::Inline(InlineBytes::EMPTY)
    }
}

impl Rope {
    /// Creates an empty rope with the default options.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_options(RopeOptions::DEFAULT)
    }

    /// Creates an empty rope with the given options.
    #[must_use]
    pub const fn with_options(options: RopeOptions) -> Self {
        Self {
            repr: Repr::Inline(InlineBytes::EMPTY),
            options,
        }
    }

    /// Creates a rope over static memory without copying it.
    #[must_use]
    pub fn from_static(bytes: &'static [u8]) -> Self {
        if bytes.len() <= MAX_INLINE {
            return Self::from(bytes);
        }
        Self::from_root(
            fragment::borrowed(Box::new(StaticBytes(bytes))),
            RopeOptions::DEFAULT,
        )
    }

    /// Creates a rope over memory owned elsewhere, without copying it.
    ///
    /// `release` receives `data` back once no rope refers to it anymore. It
    /// runs exactly once, possibly on another thread. Empty data is released
    /// immediately, and so is data short enough to be copied inline.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    ///
    /// use bytecord::Rope;
    ///
    /// let released = Arc::new(AtomicBool::new(false));
    /// let flag = Arc::clone(&released);
    /// let rope = Rope::from_external(vec![b'x'; 100], move |_| flag.store(true, Ordering::SeqCst));
    /// let slice = rope.slice(10..50);
    /// drop(rope);
    /// assert!(!released.load(Ordering::SeqCst));
    /// drop(slice);
    /// assert!(released.load(Ordering::SeqCst));
    /// ```
    pub fn from_external<T, F>(data: T, release: F) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
        F: FnOnce(T) + Send + Sync + 'static,
    {
        Self::from_root(
            fragment::borrowed(Box::new(Releasing::new(data, release))),
            RopeOptions::DEFAULT,
        )
    }

    pub(crate) fn from_slice_with(bytes: &[u8], options: RopeOptions) -> Self {
        let mut rope = Self::with_options(options);
        rope.append(bytes);
        rope
    }

    pub(crate) fn from_root(root: Option<NodeRef>, options: RopeOptions) -> Self {
        let mut rope = Self::with_options(options);
        rope.set_root(root);
        rope.check();
        rope
    }

    /// The options this rope was created with.
    #[must_use]
    pub fn options(&self) -> RopeOptions {
        self.options
    }

    /// Number of bytes in the rope.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Inline(inline) => inline.len(),
            Repr::Tree(root) => root.len(),
        }
    }

    /// Returns `true` if the rope holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn root(&self) -> Option<&NodeRef> {
        match &self.repr {
            Repr::Inline(_) => None,
            Repr::Tree(root) => Some(root),
        }
    }

    pub(crate) fn inline_bytes(&self) -> Option<&[u8]> {
        match &self.repr {
            Repr::Inline(inline) => Some(inline.as_slice()),
            Repr::Tree(_) => None,
        }
    }

    /// Installs `root` as the content of a new rope, storing short content
    /// inline.
    fn set_root(&mut self, root: Option<NodeRef>) {
        self.repr = match root {
            None => Repr::default(),
            Some(root) if !self.options.disable_inline && root.len() <= MAX_INLINE => {
                let mut inline = InlineBytes::EMPTY;
                for chunk in chunks_of(&root) {
                    let fits = inline.try_append(chunk);
                    debug_assert!(fits);
                }
                Repr::Inline(inline)
            }
            Some(root) => Repr::Tree(tree::collapse(root)),
        };
    }

    /// Installs the result of an edit. A rope that has left the inline form
    /// keeps its tree until it becomes empty.
    fn replace_root(&mut self, root: Option<NodeRef>) {
        self.repr = root.map_or_else(Repr::default, |root| Repr::Tree(tree::collapse(root)));
    }

    /// Takes the content out as a node, leaving the rope empty. Inline bytes
    /// become an owned fragment with up to `room` spare bytes.
    fn take_root(&mut self, room: usize) -> Option<NodeRef> {
        match mem::take(&mut self.repr) {
            Repr::Inline(inline) if inline.is_empty() => None,
            Repr::Inline(inline) => {
                let room = room.min(self.options.flat_len().saturating_sub(inline.len()));
                Some(fragment::owned(inline.as_slice(), room))
            }
            Repr::Tree(root) => Some(root),
        }
    }

    fn check(&self) {
        if let Err(error) = self.validate(self.options.effective_validation()) {
            panic!("rope invariant violated: {error}");
        }
    }

    /// Appends `data` to the end of the rope.
    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Repr::Inline(inline) = &mut self.repr {
            if !self.options.disable_inline && inline.try_append(data) {
                return;
            }
        }
        let flat_len = self.options.flat_len();
        let extra = growth(self.len(), data.len(), flat_len);
        let root = match self.take_root(data.len() + extra) {
            Some(root) => tree::add_bytes(root, data, Edge::Back, extra, flat_len),
            None => new_tree(data, flat_len, extra),
        };
        self.repr = Repr::Tree(root);
        self.check();
    }

    /// Prepends `data` to the start of the rope.
    pub fn prepend(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Repr::Inline(inline) = &mut self.repr {
            if !self.options.disable_inline && inline.try_prepend(data) {
                return;
            }
        }
        let flat_len = self.options.flat_len();
        let root = match self.take_root(0) {
            Some(root) => tree::add_bytes(root, data, Edge::Front, 0, flat_len),
            None => new_tree(data, flat_len, 0),
        };
        self.repr = Repr::Tree(root);
        self.check();
    }

    /// Appends the content of `other`.
    ///
    /// Large ropes are shared rather than copied: afterwards both ropes refer
    /// to the same fragments.
    pub fn append_rope(&mut self, other: &Rope) {
        match other.root() {
            Some(root) if other.len() > MAX_BYTES_TO_COPY => {
                let root = root.clone();
                let root = match self.take_root(0) {
                    Some(front) => tree::concat(front, root),
                    None => root,
                };
                self.replace_root(Some(root));
                self.check();
            }
            _ => other.chunks().for_each(|chunk| self.append(chunk)),
        }
    }

    /// Prepends the content of `other`.
    ///
    /// Like [`append_rope`](Self::append_rope), large ropes are shared.
    pub fn prepend_rope(&mut self, other: &Rope) {
        match other.root() {
            Some(root) if other.len() > MAX_BYTES_TO_COPY => {
                let root = root.clone();
                let root = match self.take_root(0) {
                    Some(back) => tree::concat(root, back),
                    None => root,
                };
                self.replace_root(Some(root));
                self.check();
            }
            _ => other.chunks().rev().for_each(|chunk| self.prepend(chunk)),
        }
    }

    /// Appends the data of `buffer`, taking over its memory without copying.
    pub fn append_buffer(&mut self, buffer: RopeBuffer) {
        self.add_buffer(buffer, Edge::Back);
    }

    /// Prepends the data of `buffer`, taking over its memory without
    /// copying.
    pub fn prepend_buffer(&mut self, buffer: RopeBuffer) {
        self.add_buffer(buffer, Edge::Front);
    }

    fn add_buffer(&mut self, buffer: RopeBuffer, edge: Edge) {
        let Some(fragment) = buffer.into_fragment() else {
            return;
        };
        let root = match self.take_root(0) {
            Some(root) => tree::add_fragment(root, fragment, edge),
            None => fragment,
        };
        self.repr = Repr::Tree(root);
        self.check();
    }

    /// Hands out a buffer for writing bytes that are then given back with
    /// [`append_buffer`](Self::append_buffer).
    ///
    /// When the last fragment of the rope is exclusively owned and has at
    /// least `min_capacity` spare bytes, it is detached and returned with its
    /// data, so refilling it costs no copy. Short inline content is likewise
    /// moved into the buffer. Otherwise the rope is left unchanged and a new
    /// empty buffer of `capacity` bytes is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bytecord::Rope;
    ///
    /// let mut rope = Rope::from("abc");
    /// let mut buffer = rope.get_append_buffer(64, 16);
    /// assert_eq!(buffer.data(), b"abc");
    /// assert!(rope.is_empty());
    ///
    /// buffer.available()[..3].copy_from_slice(b"def");
    /// buffer.increase_len(3);
    /// rope.append_buffer(buffer);
    /// assert_eq!(rope, "abcdef");
    /// ```
    pub fn get_append_buffer(&mut self, capacity: usize, min_capacity: usize) -> RopeBuffer {
        let buffer = match mem::take(&mut self.repr) {
            Repr::Inline(inline) => {
                let mut buffer = RopeBuffer::with_capacity(inline.len() + capacity);
                buffer
                    .available_up_to(inline.len())
                    .copy_from_slice(inline.as_slice());
                buffer.increase_len(inline.len());
                buffer
            }
            Repr::Tree(root) => match tree::extract_append_buffer(root, min_capacity) {
                Ok((rest, buf)) => {
                    self.replace_root(rest);
                    RopeBuffer::from_vec(buf)
                }
                Err(root) => {
                    self.repr = Repr::Tree(root);
                    RopeBuffer::with_capacity(capacity)
                }
            },
        };
        self.check();
        buffer
    }

    /// Removes the first `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the length of the rope.
    pub fn remove_prefix(&mut self, n: usize) {
        let len = self.len();
        assert!(n <= len, "cannot remove {n} bytes from a rope of length {len}");
        match &mut self.repr {
            Repr::Inline(inline) => inline.remove_prefix(n),
            Repr::Tree(root) => {
                let rest = tree::sub_tree(root, n, len - n);
                self.replace_root(rest);
            }
        }
        self.check();
    }

    /// Removes the last `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the length of the rope.
    pub fn remove_suffix(&mut self, n: usize) {
        let len = self.len();
        assert!(n <= len, "cannot remove {n} bytes from a rope of length {len}");
        match mem::take(&mut self.repr) {
            Repr::Inline(mut inline) => {
                inline.truncate(len - n);
                self.repr = Repr::Inline(inline);
            }
            Repr::Tree(root) => {
                let rest = tree::remove_suffix(root, n);
                self.replace_root(rest);
            }
        }
        self.check();
    }

    /// Removes all bytes, keeping the options.
    pub fn clear(&mut self) {
        self.repr = Repr::default();
    }

    /// Returns the bytes in `range` as a new rope sharing storage with this
    /// one.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or decreasing.
    #[must_use]
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Rope {
        let (start, end) = bounds(&range, self.len());
        let n = end - start;
        match &self.repr {
            Repr::Inline(inline) => Rope {
                repr: Repr::Inline(
                    InlineBytes::from_slice(&inline.as_slice()[start..end]).unwrap_or_default(),
                ),
                options: self.options,
            },
            Repr::Tree(_) if n <= MAX_INLINE && !self.options.disable_inline => {
                let mut buf = [0; MAX_INLINE];
                let mut cursor = self.cursor();
                cursor.advance(start);
                cursor.copy_to_slice(&mut buf[..n]);
                Rope::from_slice_with(&buf[..n], self.options)
            }
            Repr::Tree(root) => Rope::from_root(tree::sub_tree(root, start, n), self.options),
        }
    }

    /// The byte at `index`, or `None` if it is out of bounds.
    #[must_use]
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        match &self.repr {
            Repr::Inline(inline) => inline.as_slice().get(index).copied(),
            Repr::Tree(root) if root.as_tree().is_none() => root.data().get(index).copied(),
            Repr::Tree(root) => {
                let (navigator, n) = Navigator::at_offset(root, index)?;
                navigator.current().data().get(n).copied()
            }
        }
    }

    /// Returns `true` if the rope begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        prefix.len() <= self.len() && matches_along(self.chunks(), prefix, |rest, n| rest.split_at(n))
    }

    /// Returns `true` if the rope ends with `suffix`.
    #[must_use]
    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        suffix.len() <= self.len()
            && matches_along(self.chunks().rev(), suffix, |rest, n| {
                let (head, tail) = rest.split_at(rest.len() - n);
                (tail, head)
            })
    }

    /// The content as one slice, if it is stored contiguously.
    #[must_use]
    pub fn try_flat(&self) -> Option<&[u8]> {
        match &self.repr {
            Repr::Inline(inline) => Some(inline.as_slice()),
            Repr::Tree(root) => root.as_fragment().map(|fragment| fragment.data()),
        }
    }

    /// Makes the content contiguous and returns it.
    ///
    /// A rope spread over several fragments is copied into a single new
    /// fragment, which replaces the tree.
    pub fn flatten(&mut self) -> &[u8] {
        if let Repr::Tree(root) = &self.repr {
            if root.as_tree().is_some() {
                let mut buf = Vec::with_capacity(root.len());
                self.append_to_vec(&mut buf);
                trace!(len = buf.len(), "flattened rope");
                self.replace_root(fragment::from_vec(buf));
                self.check();
            }
        }
        self.try_flat().unwrap_or_default()
    }

    /// Copies the content into a new vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.append_to_vec(&mut out);
        out
    }

    /// Copies the content to the end of `out`.
    pub fn append_to_vec(&self, out: &mut Vec<u8>) {
        out.reserve(self.len());
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
    }

    /// Iterates over the contiguous chunks of the rope, from either end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bytecord::Rope;
    ///
    /// let mut rope = Rope::from(vec![b'a'; 1000]);
    /// rope.append(&[b'b'; 1000]);
    /// let total: usize = rope.chunks().map(<[u8]>::len).sum();
    /// assert_eq!(total, 2000);
    /// ```
    pub fn chunks(&self) -> Chunks<'_> {
        match &self.repr {
            Repr::Inline(inline) => Chunks::flat(inline.as_slice()),
            Repr::Tree(root) => chunks_of(root),
        }
    }

    /// Iterates over the bytes of the rope.
    pub fn bytes(&self) -> impl DoubleEndedIterator<Item = u8> + '_ {
        self.chunks().flat_map(|chunk| chunk.iter().copied())
    }

    /// A cursor positioned at the first byte.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        match &self.repr {
            Repr::Inline(inline) => Cursor::flat(inline.as_slice(), None, self.options),
            Repr::Tree(root) if root.as_tree().is_none() => {
                Cursor::flat(root.data(), Some(root), self.options)
            }
            Repr::Tree(root) => Cursor::tree(root, self.options),
        }
    }

    /// Estimates the heap memory held by this rope, in bytes.
    #[must_use]
    pub fn estimated_memory_usage(&self, accounting: Accounting) -> usize {
        mem::size_of::<Self>()
            + self
                .root()
                .map_or(0, |root| debug::memory_usage(root, accounting))
    }

    /// A human-readable rendering of the rope's internal structure, one
    /// line per node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bytecord::Rope;
    ///
    /// assert_eq!(Rope::from("hi").dump().to_string(), r#"inline len=2 "hi""#);
    /// ```
    #[must_use]
    pub fn dump(&self) -> Dump<'_> {
        Dump::new(self)
    }

    /// Checks the structural invariants of the rope.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant found.
    pub fn validate(&self, level: Validation) -> Result<(), ValidationError> {
        match &self.repr {
            Repr::Inline(_) => Ok(()),
            Repr::Tree(root) => debug::validate(root, level),
        }
    }

    /// Number of tree levels above the fragments: `None` for inline
    /// content, `Some(0)` for a single fragment.
    #[must_use]
    pub fn tree_height(&self) -> Option<usize> {
        match &self.repr {
            Repr::Inline(_) => None,
            Repr::Tree(root) => Some(root.as_tree().map_or(0, |tree| tree.height() + 1)),
        }
    }

    fn same_root(&self, other: &Rope) -> bool {
        match (self.root(), other.root()) {
            (Some(a), Some(b)) => alloc::sync::Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn chunks_of(root: &NodeRef) -> Chunks<'_> {
    if root.as_tree().is_some() {
        Chunks::tree(root)
    } else {
        Chunks::flat(root.data())
    }
}

fn new_tree(data: &[u8], flat_len: usize, extra: usize) -> NodeRef {
    tree::collapse(tree::build(fragment::split(data, flat_len, extra)))
}

/// Spare bytes reserved when appending `added` bytes to a rope of `len`
/// bytes: small appends to a growing rope reserve about a tenth of its
/// length.
fn growth(len: usize, added: usize, flat_len: usize) -> usize {
    if added < flat_len {
        (len / 10).max(added) - added
    } else {
        0
    }
}

fn bounds(range: &impl RangeBounds<usize>, len: usize) -> (usize, usize) {
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end + 1,
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };
    assert!(start <= end, "range start {start} is greater than range end {end}");
    assert!(end <= len, "range end {end} out of bounds for rope of length {len}");
    (start, end)
}

/// Matches `chunks` against `pattern`, taking `split(rest, n)` to peel `n`
/// bytes off the side of the pattern the chunks come from.
fn matches_along<'a>(
    chunks: impl Iterator<Item = &'a [u8]>,
    pattern: &[u8],
    split: impl Fn(&[u8], usize) -> (&[u8], &[u8]),
) -> bool {
    let mut rest = pattern;
    for chunk in chunks {
        if rest.is_empty() {
            break;
        }
        let n = chunk.len().min(rest.len());
        let (expected, remainder) = split(rest, n);
        let (head, _) = split(chunk, n);
        if head != expected {
            return false;
        }
        rest = remainder;
    }
    rest.is_empty()
}

fn compare_chunks<'a, 'b>(
    mut left: impl Iterator<Item = &'a [u8]>,
    mut right: impl Iterator<Item = &'b [u8]>,
) -> Ordering {
    let mut a: &[u8] = &[];
    let mut b: &[u8] = &[];
    loop {
        if a.is_empty() {
            match left.next() {
                Some(chunk) => a = chunk,
                None if b.is_empty() && right.next().is_none() => return Ordering::Equal,
                None => return Ordering::Less,
            }
        }
        if b.is_empty() {
            match right.next() {
                Some(chunk) => b = chunk,
                None => return Ordering::Greater,
            }
        }
        let n = a.len().min(b.len());
        match a[..n].cmp(&b[..n]) {
            Ordering::Equal => {
                a = &a[n..];
                b = &b[n..];
            }
            unequal => return unequal,
        }
    }
}

impl Rope {
    fn eq_bytes(&self, other: &[u8]) -> bool {
        self.len() == other.len() && compare_chunks(self.chunks(), Chunks::flat(other)).is_eq()
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.cmp(other).is_eq()
    }
}

impl Eq for Rope {}

impl PartialOrd for Rope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rope {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.same_root(other) {
            return Ordering::Equal;
        }
        compare_chunks(self.chunks(), other.chunks())
    }
}

impl PartialEq<[u8]> for Rope {
    fn eq(&self, other: &[u8]) -> bool {
        self.eq_bytes(other)
    }
}

impl PartialEq<&[u8]> for Rope {
    fn eq(&self, other: &&[u8]) -> bool {
        self.eq_bytes(other)
    }
}

impl PartialEq<str> for Rope {
    fn eq(&self, other: &str) -> bool {
        self.eq_bytes(other.as_bytes())
    }
}

impl PartialEq<&str> for Rope {
    fn eq(&self, other: &&str) -> bool {
        self.eq_bytes(other.as_bytes())
    }
}

impl PartialEq<Vec<u8>> for Rope {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.eq_bytes(other)
    }
}

impl Hash for Rope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Re-block into fixed-size pieces so equal content hashes equally no
        // matter how it is chunked.
        const BLOCK: usize = 64;
        let mut block = [0; BLOCK];
        let mut filled = 0;
        for mut chunk in self.chunks() {
            while !chunk.is_empty() {
                let n = (BLOCK - filled).min(chunk.len());
                block[filled..filled + n].copy_from_slice(&chunk[..n]);
                filled += n;
                chunk = &chunk[n..];
                if filled == BLOCK {
                    state.write(&block);
                    filled = 0;
                }
            }
        }
        state.write(&block[..filled]);
        state.write_usize(self.len());
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_flat() {
            Some(bytes) => fmt::Debug::fmt(BStr::new(bytes), f),
            None => fmt::Debug::fmt(BStr::new(&self.to_vec()), f),
        }
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_flat() {
            Some(bytes) => fmt::Display::fmt(BStr::new(bytes), f),
            None => fmt::Display::fmt(BStr::new(&self.to_vec()), f),
        }
    }
}

impl fmt::Write for Rope {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl From<&[u8]> for Rope {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice_with(bytes, RopeOptions::DEFAULT)
    }
}

impl From<&str> for Rope {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl From<Vec<u8>> for Rope {
    /// Adopts the vector's allocation when it is too long to copy cheaply.
    fn from(bytes: Vec<u8>) -> Self {
        if bytes.len() <= MAX_BYTES_TO_COPY {
            return Self::from(bytes.as_slice());
        }
        Self::from_root(fragment::from_vec(bytes), RopeOptions::DEFAULT)
    }
}

impl From<String> for Rope {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl FromIterator<u8> for Rope {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<u8>>())
    }
}

impl<'a> Extend<&'a [u8]> for Rope {
    fn extend<I: IntoIterator<Item = &'a [u8]>>(&mut self, iter: I) {
        for data in iter {
            self.append(data);
        }
    }
}

// Ropes (de)serialize as byte strings. Formats without a byte type, such as
// JSON, see a sequence of integers; strings are accepted on the way in.
#[cfg(any(test, feature = "serde"))]
mod serde_impls {
    use alloc::{string::String, vec::Vec};
    use core::fmt;

    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{SeqAccess, Visitor},
    };

    use super::Rope;

    impl Serialize for Rope {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match self.try_flat() {
                Some(bytes) => serializer.serialize_bytes(bytes),
                None => serializer.serialize_bytes(&self.to_vec()),
            }
        }
    }

    struct RopeVisitor;

    impl<'de> Visitor<'de> for RopeVisitor {
        type Value = Rope;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a byte string")
        }

        fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Rope::from(value))
        }

        fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Rope::from(value))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Rope::from(value))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Rope::from(value))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
            while let Some(byte) = seq.next_element::<u8>()? {
                bytes.push(byte);
            }
            Ok(Rope::from(bytes))
        }
    }

    impl<'de> Deserialize<'de> for Rope {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_byte_buf(RopeVisitor)
        }
    }
}
