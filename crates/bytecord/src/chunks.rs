use core::iter::FusedIterator;

use crate::{navigator::Navigator, node::NodeRef};

/// An iterator over the contiguous byte chunks of a [`Rope`](crate::Rope).
///
/// Created by [`Rope::chunks`](crate::Rope::chunks). Chunks are never empty
/// and are yielded in order from either end.
pub struct Chunks<'a> {
    inner: Inner<'a>,
    remaining: usize,
}

enum Inner<'a> {
    Flat(&'a [u8]),
    Tree {
        front: Navigator<'a>,
        back: Navigator<'a>,
        front_started: bool,
        back_started: bool,
    },
}

impl<'a> Chunks<'a> {
    pub(crate) fn flat(bytes: &'a [u8]) -> Self {
        Self {
            inner: Inner::Flat(bytes),
            remaining: bytes.len(),
        }
    }

    pub(crate) fn tree(root: &'a NodeRef) -> Self {
        Self {
            inner: Inner::Tree {
                front: Navigator::first(root),
                back: Navigator::last(root),
                front_started: false,
                back_started: false,
            },
            remaining: root.len(),
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.remaining == 0 {
            return None;
        }
        let chunk = match &mut self.inner {
            Inner::Flat(bytes) => *bytes,
            Inner::Tree {
                front,
                front_started,
                ..
            } => {
                let edge = if *front_started {
                    front.next()?
                } else {
                    *front_started = true;
                    front.current()
                };
                edge.data()
            }
        };
        self.remaining -= chunk.len();
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::from(self.remaining > 0), Some(self.remaining))
    }
}

impl<'a> DoubleEndedIterator for Chunks<'a> {
    fn next_back(&mut self) -> Option<&'a [u8]> {
        if self.remaining == 0 {
            return None;
        }
        let chunk = match &mut self.inner {
            Inner::Flat(bytes) => *bytes,
            Inner::Tree {
                back, back_started, ..
            } => {
                let edge = if *back_started {
                    back.previous()?
                } else {
                    *back_started = true;
                    back.current()
                };
                edge.data()
            }
        };
        self.remaining -= chunk.len();
        Some(chunk)
    }
}

impl FusedIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::{fragment, tree::build};

    fn sample() -> NodeRef {
        let data: Vec<u8> = (0..50_u8).collect();
        build(data.chunks(4).map(|chunk| fragment::owned(chunk, 0)).collect())
    }

    #[test]
    fn yields_every_fragment_in_order() {
        let root = sample();
        let chunks: Vec<&[u8]> = Chunks::tree(&root).collect();
        assert_eq!(chunks.len(), 13);
        assert_eq!(chunks.concat(), (0..50).collect::<Vec<u8>>());
    }

    #[test]
    fn both_ends_meet_without_overlap() {
        let root = sample();
        let mut chunks = Chunks::tree(&root);
        let mut front = Vec::new();
        let mut back = Vec::new();
        loop {
            match chunks.next() {
                Some(chunk) => front.push(chunk),
                None => break,
            }
            match chunks.next_back() {
                Some(chunk) => back.push(chunk),
                None => break,
            }
        }
        back.reverse();
        front.extend(back);
        assert_eq!(front.concat(), (0..50).collect::<Vec<u8>>());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn flat_bytes_are_one_chunk() {
        let mut chunks = Chunks::flat(b"abc");
        assert_eq!(chunks.size_hint(), (1, Some(3)));
        assert_eq!(chunks.next_back(), Some(&b"abc"[..]));
        assert_eq!(chunks.next(), None);
        assert_eq!(Chunks::flat(b"").next(), None);
    }
}
