/// Longest content a rope stores inline, without allocating.
pub(crate) const MAX_INLINE: usize = 15;

/// Up to [`MAX_INLINE`] bytes stored in place.
#[derive(Clone, Copy, Default)]
pub(crate) struct InlineBytes {
    len: u8,
    data: [u8; MAX_INLINE],
}

impl InlineBytes {
    pub(crate) const EMPTY: Self = Self {
        len: 0,
        data: [0; MAX_INLINE],
    };

    pub(crate) fn from_slice(bytes: &[u8]) -> Option<Self> {
        let mut inline = Self::EMPTY;
        inline.try_append(bytes).then_some(inline)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    #[allow(clippy::cast_possible_truncation)] // len <= MAX_INLINE
    fn set_len(&mut self, len: usize) {
        debug_assert!(len <= MAX_INLINE);
        self.len = len as u8;
    }

    /// Appends `bytes` if the result still fits.
    pub(crate) fn try_append(&mut self, bytes: &[u8]) -> bool {
        let len = self.len();
        if bytes.len() > MAX_INLINE - len {
            return false;
        }
        self.data[len..len + bytes.len()].copy_from_slice(bytes);
        self.set_len(len + bytes.len());
        true
    }

    /// Prepends `bytes` if the result still fits.
    pub(crate) fn try_prepend(&mut self, bytes: &[u8]) -> bool {
        let len = self.len();
        if bytes.len() > MAX_INLINE - len {
            return false;
        }
        self.data.copy_within(..len, bytes.len());
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.set_len(len + bytes.len());
        true
    }

    pub(crate) fn remove_prefix(&mut self, n: usize) {
        let len = self.len();
        debug_assert!(n <= len);
        self.data.copy_within(n..len, 0);
        self.set_len(len - n);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        debug_assert!(len <= self.len());
        self.set_len(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_to_fifteen_bytes() {
        let mut inline = InlineBytes::from_slice(b"hello").expect("fits");
        assert!(inline.try_append(b" world"));
        assert!(inline.try_prepend(b">>"));
        assert_eq!(inline.as_slice(), b">>hello world");
        assert!(inline.try_append(b"!!"));
        assert_eq!(inline.len(), MAX_INLINE);
        assert!(!inline.try_append(b"?"));
        assert!(!inline.try_prepend(b"?"));
        assert_eq!(inline.as_slice(), b">>hello world!!");
    }

    #[test]
    fn trims_both_ends() {
        let mut inline = InlineBytes::from_slice(b"0123456789").expect("fits");
        inline.remove_prefix(3);
        inline.truncate(4);
        assert_eq!(inline.as_slice(), b"3456");
        inline.remove_prefix(4);
        assert!(inline.is_empty());
    }

    #[test]
    fn rejects_oversized_input() {
        assert!(InlineBytes::from_slice(&[0; MAX_INLINE + 1]).is_none());
    }
}
