use alloc::vec::Vec;
use core::fmt;

use crate::{
    fragment::{self, DEFAULT_FLAT_LEN, MAX_FLAT_LEN},
    node::NodeRef,
};

/// A writable buffer that can be handed to a [`Rope`](crate::Rope) without
/// copying.
///
/// A buffer has a fixed capacity and a length. Bytes up to the length are
/// its data; the rest of the capacity is writable through
/// [`available`](Self::available) and becomes data by growing the length.
///
/// # Examples
///
/// ```rust
/// use bytecord::{Rope, RopeBuffer};
///
/// let mut buffer = RopeBuffer::with_capacity(64);
/// let spare = buffer.available();
/// spare[..5].copy_from_slice(b"hello");
/// buffer.increase_len(5);
///
/// let mut rope = Rope::new();
/// rope.append_buffer(buffer);
/// assert_eq!(rope, "hello");
/// ```
pub struct RopeBuffer {
    // Always as long as its capacity; bytes past `len` are scratch space.
    buf: Vec<u8>,
    len: usize,
}

impl RopeBuffer {
    /// Capacity cap applied by [`with_capacity`](Self::with_capacity).
    pub const DEFAULT_LIMIT: usize = DEFAULT_FLAT_LEN;

    /// Capacity cap applied by [`with_limit`](Self::with_limit).
    pub const MAX_LIMIT: usize = MAX_FLAT_LEN;

    /// Creates an empty buffer with room for at least `capacity` bytes, up
    /// to [`DEFAULT_LIMIT`](Self::DEFAULT_LIMIT).
    ///
    /// The capacity is rounded up to an allocation size class, so the
    /// buffer may hold more than requested.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT, capacity)
    }

    /// Creates an empty buffer with room for at least `capacity` bytes, up
    /// to `limit` (itself capped at [`MAX_LIMIT`](Self::MAX_LIMIT)).
    #[must_use]
    pub fn with_limit(limit: usize, capacity: usize) -> Self {
        let limit = limit.clamp(1, Self::MAX_LIMIT);
        let capacity = fragment::size_class(capacity.min(limit)).min(limit);
        Self {
            buf: alloc::vec![0; capacity],
            len: 0,
        }
    }

    /// Wraps an extracted fragment buffer, keeping its spare capacity.
    pub(crate) fn from_vec(mut buf: Vec<u8>) -> Self {
        let len = buf.len();
        let capacity = buf.capacity();
        buf.resize(capacity, 0);
        Self { buf, len }
    }

    pub(crate) fn into_fragment(self) -> Option<NodeRef> {
        let Self { mut buf, len } = self;
        buf.truncate(len);
        fragment::from_vec(buf)
    }

    /// Total number of bytes the buffer can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes of data in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The data in the buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The data in the buffer, writable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }

    /// The writable space past the data.
    pub fn available(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// At most `n` bytes of the writable space past the data.
    pub fn available_up_to(&mut self, n: usize) -> &mut [u8] {
        let end = self.buf.len().min(self.len + n);
        &mut self.buf[self.len..end]
    }

    /// Sets the length of the data.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(
            len <= self.capacity(),
            "length {len} exceeds buffer capacity {}",
            self.capacity()
        );
        self.len = len;
    }

    /// Grows the data by `n` bytes taken from the writable space.
    ///
    /// # Panics
    ///
    /// Panics if the new length exceeds the capacity.
    pub fn increase_len(&mut self, n: usize) {
        self.set_len(self.len + n);
    }
}

impl fmt::Debug for RopeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RopeBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_rounded_and_capped() {
        assert_eq!(RopeBuffer::with_capacity(0).capacity(), 32);
        assert_eq!(RopeBuffer::with_capacity(100).capacity(), 104);
        assert_eq!(RopeBuffer::with_capacity(1 << 20).capacity(), 4096);
        assert_eq!(RopeBuffer::with_limit(1 << 20, 1 << 20).capacity(), MAX_FLAT_LEN);
        assert_eq!(RopeBuffer::with_limit(16, 100).capacity(), 16);
    }

    #[test]
    fn writes_become_data() {
        let mut buffer = RopeBuffer::with_capacity(8);
        buffer.available_up_to(3).copy_from_slice(b"abc");
        buffer.increase_len(3);
        buffer.available()[..2].copy_from_slice(b"de");
        buffer.increase_len(2);
        buffer.data_mut()[0] = b'A';
        assert_eq!(buffer.data(), b"Abcde");
        assert_eq!(buffer.available().len(), buffer.capacity() - 5);
    }

    #[test]
    #[should_panic(expected = "exceeds buffer capacity")]
    fn length_cannot_exceed_capacity() {
        let mut buffer = RopeBuffer::with_capacity(8);
        buffer.set_len(buffer.capacity() + 1);
    }

    #[test]
    fn empty_buffers_make_no_fragment() {
        assert!(RopeBuffer::with_capacity(8).into_fragment().is_none());
    }

    #[test]
    fn extracted_vectors_keep_their_spare_capacity() {
        let mut buf = Vec::with_capacity(40);
        buf.extend_from_slice(b"xyz");
        let buffer = RopeBuffer::from_vec(buf);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.capacity() >= 40);
        let fragment = buffer.into_fragment().expect("non-empty");
        assert_eq!(fragment.data(), b"xyz");
    }
}
