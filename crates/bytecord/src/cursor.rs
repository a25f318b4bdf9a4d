//! A forward read position over a rope, with zero-copy splitting.

use crate::{Rope, RopeOptions, fragment, node::NodeRef, reader::Reader};

/// A read position within a [`Rope`](crate::Rope), consumed from the front.
///
/// Created by [`Rope::cursor`](crate::Rope::cursor). Besides byte-wise
/// reading it can split off the next `n` bytes as a rope that shares
/// storage with the source.
///
/// # Examples
///
/// ```rust
/// use bytecord::Rope;
///
/// let rope = Rope::from("key=value;rest");
/// let mut cursor = rope.cursor();
/// let key = cursor.read(3);
/// cursor.advance(1);
/// let value = cursor.read(5);
/// assert_eq!(key, "key");
/// assert_eq!(value, "value");
/// assert_eq!(cursor.remaining(), 5);
/// ```
pub struct Cursor<'a> {
    chunk: &'a [u8],
    source: Source<'a>,
    options: RopeOptions,
}

enum Source<'a> {
    /// Inline bytes, or a root that is a single fragment. `consumed` counts
    /// the bytes already taken from the front.
    Flat {
        bytes: &'a [u8],
        root: Option<&'a NodeRef>,
        consumed: usize,
    },
    Tree(Reader<'a>),
}

impl<'a> Cursor<'a> {
    pub(crate) fn flat(bytes: &'a [u8], root: Option<&'a NodeRef>, options: RopeOptions) -> Self {
        Self {
            chunk: bytes,
            source: Source::Flat {
                bytes,
                root,
                consumed: 0,
            },
            options,
        }
    }

    pub(crate) fn tree(root: &'a NodeRef, options: RopeOptions) -> Self {
        let (reader, chunk) = Reader::init(root);
        Self {
            chunk,
            source: Source::Tree(reader),
            options,
        }
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chunk.len()
            + match &self.source {
                Source::Flat { .. } => 0,
                Source::Tree(reader) => reader.remaining(),
            }
    }

    /// Number of bytes already consumed.
    #[must_use]
    pub fn position(&self) -> usize {
        match &self.source {
            Source::Flat { consumed, .. } => *consumed,
            Source::Tree(reader) => reader.length() - reader.remaining() - self.chunk.len(),
        }
    }

    /// Returns `true` if there are bytes left to read.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// The contiguous bytes at the current position.
    ///
    /// Empty only when nothing is left to read.
    #[must_use]
    pub fn chunk(&self) -> &'a [u8] {
        self.chunk
    }

    /// Moves the position forward by `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`remaining`](Self::remaining).
    pub fn advance(&mut self, n: usize) {
        assert!(
            n <= self.remaining(),
            "cannot advance {n} bytes with {} remaining",
            self.remaining()
        );
        if n < self.chunk.len() {
            self.chunk = &self.chunk[n..];
            if let Source::Flat { consumed, .. } = &mut self.source {
                *consumed += n;
            }
            return;
        }
        match &mut self.source {
            Source::Flat { consumed, .. } => {
                *consumed += n;
                self.chunk = &[];
            }
            Source::Tree(reader) => {
                self.chunk = reader.skip(n - self.chunk.len()).unwrap_or_default();
            }
        }
    }

    /// Moves to absolute byte `offset`, forwards or backwards.
    ///
    /// # Panics
    ///
    /// Panics if `offset` exceeds the length of the rope.
    pub fn seek(&mut self, offset: usize) {
        match &mut self.source {
            Source::Flat {
                bytes, consumed, ..
            } => {
                let bytes: &'a [u8] = *bytes;
                let len = bytes.len();
                assert!(offset <= len, "cannot seek to {offset} in a rope of length {len}");
                *consumed = offset;
                self.chunk = &bytes[offset..];
            }
            Source::Tree(reader) => {
                let len = reader.length();
                assert!(offset <= len, "cannot seek to {offset} in a rope of length {len}");
                self.chunk = match reader.seek(offset) {
                    Some(chunk) => chunk,
                    None => {
                        // The end: rewind, then skip every byte.
                        let first = reader.seek(0).unwrap_or_default();
                        reader.skip(len - first.len()).unwrap_or_default()
                    }
                };
            }
        }
    }

    /// Returns the bytes at the current position up to the end of their
    /// fragment and moves past them, or `None` once everything is read.
    pub fn next_chunk(&mut self) -> Option<&'a [u8]> {
        let chunk = self.chunk;
        if chunk.is_empty() {
            return None;
        }
        match &mut self.source {
            Source::Flat { consumed, .. } => {
                *consumed += chunk.len();
                self.chunk = &[];
            }
            Source::Tree(reader) => self.chunk = reader.next().unwrap_or_default(),
        }
        Some(chunk)
    }

    /// Reads the next byte.
    ///
    /// # Panics
    ///
    /// Panics if nothing is left to read.
    pub fn get_u8(&mut self) -> u8 {
        let byte = *self.chunk.first().expect("cursor has no bytes remaining");
        self.advance(1);
        byte
    }

    /// Fills `dst` with the next bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `dst.len()` bytes remain.
    pub fn copy_to_slice(&mut self, dst: &mut [u8]) {
        assert!(
            dst.len() <= self.remaining(),
            "cannot copy {} bytes with {} remaining",
            dst.len(),
            self.remaining()
        );
        let mut filled = 0;
        while filled < dst.len() {
            let take = self.chunk.len().min(dst.len() - filled);
            dst[filled..filled + take].copy_from_slice(&self.chunk[..take]);
            filled += take;
            self.advance(take);
        }
    }

    /// Splits off the next `n` bytes as a rope.
    ///
    /// Short results are copied into inline storage; longer ones share
    /// fragments with the source rope.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`remaining`](Self::remaining).
    pub fn read(&mut self, n: usize) -> Rope {
        assert!(
            n <= self.remaining(),
            "cannot read {n} bytes with {} remaining",
            self.remaining()
        );
        match &mut self.source {
            Source::Flat { root, consumed, .. } => {
                let rope = match *root {
                    Some(root) if n > 0 => Rope::from_root(
                        Some(fragment::view(root, *consumed, n)),
                        self.options,
                    ),
                    _ => Rope::from_slice_with(&self.chunk[..n], self.options),
                };
                *consumed += n;
                self.chunk = &self.chunk[n..];
                rope
            }
            Source::Tree(reader) => {
                let (tree, chunk) = reader.read(n, self.chunk.len());
                self.chunk = chunk;
                Rope::from_root(tree, self.options)
            }
        }
    }
}
