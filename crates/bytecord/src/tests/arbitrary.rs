use alloc::vec::Vec;

use quickcheck::{Arbitrary, Gen};

use crate::{RopeOptions, Validation};

/// An edit applied to both a rope and a plain vector model.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Append(Vec<u8>),
    Prepend(Vec<u8>),
    /// Appends `count` copies of a byte, enough to reach the shared paths.
    AppendRepeated(u8, usize),
    AppendRope(Vec<u8>),
    PrependRope(Vec<u8>),
    /// Appends a clone of the rope to itself.
    AppendSelf,
    AppendBuffer(Vec<u8>),
    /// Takes the append buffer, writes into it and hands it back.
    RefillAppendBuffer(Vec<u8>),
    RemovePrefix(usize),
    RemoveSuffix(usize),
    Slice(usize, usize),
    Flatten,
    /// Keeps a clone of the rope that must not change afterwards.
    Snapshot,
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        match usize::arbitrary(g) % 13 {
            0 => Op::Append(Vec::arbitrary(g)),
            1 => Op::Prepend(Vec::arbitrary(g)),
            2 => Op::AppendRepeated(u8::arbitrary(g), usize::arbitrary(g) % 2_000),
            3 => Op::AppendRope(Vec::arbitrary(g)),
            4 => Op::PrependRope(Vec::arbitrary(g)),
            5 => Op::AppendSelf,
            6 => Op::AppendBuffer(Vec::arbitrary(g)),
            7 => Op::RefillAppendBuffer(Vec::arbitrary(g)),
            8 => Op::RemovePrefix(usize::arbitrary(g)),
            9 => Op::RemoveSuffix(usize::arbitrary(g)),
            10 => Op::Slice(usize::arbitrary(g), usize::arbitrary(g)),
            11 => Op::Flatten,
            _ => Op::Snapshot,
        }
    }
}

impl Arbitrary for RopeOptions {
    fn arbitrary(g: &mut Gen) -> Self {
        RopeOptions {
            disable_inline: bool::arbitrary(g),
            validation: Validation::Shallow,
            max_flat_len: *g.choose(&[1, 3, 8, 64, 4096]).unwrap_or(&8),
        }
    }
}
