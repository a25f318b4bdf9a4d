//! Chunk-wise reading on top of a [`Navigator`].
//!
//! The reader hands out the bytes of the current fragment as a chunk and
//! keeps count of how many bytes follow that fragment, so callers can tell
//! when they are done without walking the tree.

use crate::{navigator::Navigator, node::NodeRef};

pub(crate) struct Reader<'a> {
    navigator: Navigator<'a>,
    remaining: usize,
}

impl<'a> Reader<'a> {
    /// A reader on the first fragment of the tree `root`, returned as the
    /// first chunk.
    pub(crate) fn init(root: &'a NodeRef) -> (Self, &'a [u8]) {
        let navigator = Navigator::first(root);
        let chunk = navigator.current().data();
        let remaining = root.len() - chunk.len();
        (
            Self {
                navigator,
                remaining,
            },
            chunk,
        )
    }

    /// Total length of the tree being read.
    pub(crate) fn length(&self) -> usize {
        self.navigator.root().len()
    }

    /// Bytes following the current fragment.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    fn sync_remaining(&mut self) {
        let current = self.navigator.current().len();
        self.remaining = self.length() - self.navigator.offset() - current;
    }

    /// The next fragment's bytes, or `None` after the last one.
    pub(crate) fn next(&mut self) -> Option<&'a [u8]> {
        if self.remaining == 0 {
            return None;
        }
        let edge = self.navigator.next()?;
        self.remaining -= edge.len();
        Some(edge.data())
    }

    /// Skips `skip` bytes past the end of the current fragment and returns
    /// the rest of the fragment reached. Returns `None` when that reaches
    /// the end of the tree; nothing is left to read afterwards.
    pub(crate) fn skip(&mut self, skip: usize) -> Option<&'a [u8]> {
        let current = self.navigator.current().len();
        match self.navigator.skip(current + skip) {
            Some((edge, n)) => {
                self.sync_remaining();
                Some(&edge.data()[n..])
            }
            None => {
                self.remaining = 0;
                None
            }
        }
    }

    /// Repositions at absolute byte `offset` and returns the rest of the
    /// fragment holding it, or `None` when `offset` is past the end.
    pub(crate) fn seek(&mut self, offset: usize) -> Option<&'a [u8]> {
        let (edge, n) = self.navigator.seek(offset)?;
        self.sync_remaining();
        Some(&edge.data()[n..])
    }

    /// Reads `n` bytes as a tree sharing structure with the one being read.
    ///
    /// `chunk_size` is the number of bytes of the current fragment the
    /// caller has not consumed yet; reading starts there. Returns the bytes
    /// read and the rest of the fragment holding the first unread byte,
    /// which is empty once everything has been read.
    pub(crate) fn read(&mut self, n: usize, chunk_size: usize) -> (Option<NodeRef>, &'a [u8]) {
        let current = self.navigator.current();
        debug_assert!(chunk_size <= current.len());
        debug_assert!(n <= chunk_size + self.remaining);
        let edge_offset = current.len() - chunk_size;
        if n == 0 {
            return (None, &current.data()[edge_offset..]);
        }
        let result = self.navigator.read(edge_offset, n);
        self.sync_remaining();
        let chunk = &self.navigator.current().data()[result.n..];
        (result.tree, chunk)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::{
        fragment,
        tree::{build, tests::flatten},
    };

    fn sample() -> NodeRef {
        let data: Vec<u8> = (0..100_u8).collect();
        build(data.chunks(7).map(|chunk| fragment::owned(chunk, 0)).collect())
    }

    #[test]
    fn next_visits_every_chunk_once() {
        let root = sample();
        let (mut reader, first) = Reader::init(&root);
        assert_eq!(reader.length(), 100);
        assert_eq!(reader.remaining(), 93);
        let mut out = first.to_vec();
        while let Some(chunk) = reader.next() {
            out.extend_from_slice(chunk);
            assert_eq!(reader.remaining(), 100 - out.len());
        }
        assert_eq!(out, flatten(&root));
    }

    #[test]
    fn skip_lands_inside_a_later_chunk() {
        let root = sample();
        let (mut reader, _) = Reader::init(&root);
        let chunk = reader.skip(10).expect("in range");
        assert_eq!(chunk, &[17, 18, 19, 20]);
        assert_eq!(reader.remaining(), 79);
        assert!(reader.skip(100).is_none());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn seek_repositions() {
        let root = sample();
        let (mut reader, _) = Reader::init(&root);
        assert_eq!(reader.seek(50).expect("in range"), &[50, 51, 52, 53, 54, 55]);
        assert_eq!(reader.remaining(), 44);
        assert!(reader.seek(100).is_none());
    }

    #[test]
    fn read_consumes_across_chunks() {
        let root = sample();
        let model = flatten(&root);
        let (mut reader, first) = Reader::init(&root);

        // Read from the middle of the first chunk.
        let (tree, chunk) = reader.read(20, first.len() - 3);
        assert_eq!(flatten(&tree.expect("non-empty read")), &model[3..23]);
        assert_eq!(chunk, &model[23..28]);

        // Read starting after the current chunk.
        let (tree, chunk) = reader.read(10, 0);
        assert_eq!(flatten(&tree.expect("non-empty read")), &model[28..38]);
        assert_eq!(chunk, &model[38..42]);

        // Read everything that is left.
        let rest = chunk.len() + reader.remaining();
        let (tree, chunk) = reader.read(rest, chunk.len());
        assert_eq!(flatten(&tree.expect("non-empty read")), &model[38..]);
        assert!(chunk.is_empty());
        assert_eq!(reader.remaining(), 0);
    }
}
