use crate::fragment::{DEFAULT_FLAT_LEN, MAX_FLAT_LEN};

/// How much structural checking a rope performs after every edit.
///
/// Checks panic with the violated invariant when they fail. Debug builds
/// always run at least [`Validation::Shallow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// No checks beyond the debug-build default.
    #[default]
    Off,
    /// Check the root node and its immediate edges.
    Shallow,
    /// Walk the whole tree and check every node.
    Exhaustive,
}

/// Configuration options for a [`Rope`](crate::Rope).
///
/// Options are fixed when the rope is constructed and travel with it through
/// clones and slices.
///
/// # Examples
///
/// ```rust
/// use bytecord::{Rope, RopeOptions, Validation};
///
/// let mut rope = Rope::with_options(RopeOptions {
///     validation: Validation::Exhaustive,
///     ..Default::default()
/// });
/// rope.append(b"hello");
/// assert_eq!(rope, "hello");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeOptions {
    /// Never store content inline, even when it would fit.
    ///
    /// Ropes normally keep up to 15 bytes inside the handle itself and only
    /// allocate a tree once content outgrows that. With this option every
    /// non-empty rope holds a reference-counted root, which is useful for
    /// exercising the tree paths on tiny inputs.
    ///
    /// # Default
    ///
    /// `false`
    pub disable_inline: bool,

    /// Structural checking performed after every edit.
    ///
    /// # Default
    ///
    /// [`Validation::Off`]
    pub validation: Validation,

    /// Largest number of bytes that edits pack into one fragment.
    ///
    /// Values are clamped to `1..=262_144`. Smaller values produce more
    /// fragments and taller trees; adopted buffers (for example a large
    /// `Vec<u8>` converted into a rope) are never split.
    ///
    /// # Default
    ///
    /// `4096`
    pub max_flat_len: usize,
}

impl RopeOptions {
    /// The default options, usable in `const` contexts.
    pub const DEFAULT: Self = Self {
        disable_inline: false,
        validation: Validation::Off,
        max_flat_len: DEFAULT_FLAT_LEN,
    };

    pub(crate) fn flat_len(&self) -> usize {
        self.max_flat_len.clamp(1, MAX_FLAT_LEN)
    }

    pub(crate) fn effective_validation(&self) -> Validation {
        if self.validation == Validation::Off && cfg!(debug_assertions) {
            Validation::Shallow
        } else {
            self.validation
        }
    }
}

impl Default for RopeOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_len_is_clamped() {
        let zero = RopeOptions {
            max_flat_len: 0,
            ..RopeOptions::DEFAULT
        };
        assert_eq!(zero.flat_len(), 1);

        let huge = RopeOptions {
            max_flat_len: usize::MAX,
            ..RopeOptions::DEFAULT
        };
        assert_eq!(huge.flat_len(), MAX_FLAT_LEN);
        assert_eq!(RopeOptions::default().flat_len(), DEFAULT_FLAT_LEN);
    }

    #[test]
    fn explicit_validation_is_kept() {
        let options = RopeOptions {
            validation: Validation::Exhaustive,
            ..RopeOptions::DEFAULT
        };
        assert_eq!(options.effective_validation(), Validation::Exhaustive);
    }
}
