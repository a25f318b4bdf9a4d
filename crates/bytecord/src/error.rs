use alloc::string::String;

use thiserror::Error;

/// A structural invariant that [`Rope::validate`](crate::Rope::validate)
/// found violated.
///
/// Every variant carries the path of the offending node, written as
/// `root/2/0` for the first child of the third child of the root.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A fragment holds no bytes.
    #[error("{path}: empty fragment")]
    EmptyFragment {
        /// Path of the fragment.
        path: String,
    },
    /// A view reaches past the end of the fragment it refers to.
    #[error("{path}: view {start}+{len} exceeds its {child_len} byte child")]
    ViewOutOfBounds {
        /// Path of the view.
        path: String,
        /// First byte of the view within its child.
        start: usize,
        /// Length of the view.
        len: usize,
        /// Length of the child.
        child_len: usize,
    },
    /// A view refers to another view or to a tree node.
    #[error("{path}: view child must be an owned or borrowed fragment")]
    InvalidViewChild {
        /// Path of the view.
        path: String,
    },
    /// A tree node is taller than the supported maximum.
    #[error("{path}: height {height} exceeds the maximum of {max}")]
    HeightExceeded {
        /// Path of the node.
        path: String,
        /// Height of the node.
        height: usize,
        /// Maximum supported height.
        max: usize,
    },
    /// A tree node has no children, or its cursors are out of order.
    #[error("{path}: invalid edge range {begin}..{end}")]
    EdgeRange {
        /// Path of the node.
        path: String,
        /// Index of the first occupied slot.
        begin: usize,
        /// One past the index of the last occupied slot.
        end: usize,
    },
    /// A slot inside the edge range is empty, or one outside it is occupied.
    #[error("{path}: slot {index} occupancy disagrees with the edge range")]
    SlotOccupancy {
        /// Path of the node.
        path: String,
        /// Offending slot.
        index: usize,
    },
    /// A child does not sit exactly one level below its parent.
    #[error("{path}: child {index} has level {found}, expected {expected}")]
    ChildLevel {
        /// Path of the parent node.
        path: String,
        /// Slot of the child.
        index: usize,
        /// Level the child should have; fragments are level -1.
        expected: isize,
        /// Level the child has.
        found: isize,
    },
    /// A node's recorded length disagrees with the sum of its children.
    #[error("{path}: recorded length {recorded} but children hold {actual}")]
    LengthMismatch {
        /// Path of the node.
        path: String,
        /// Length recorded in the node.
        recorded: usize,
        /// Sum of the children's lengths.
        actual: usize,
    },
}
