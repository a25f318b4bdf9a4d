#![no_main]
use arbitrary::Arbitrary;
use bytecord::{Rope, RopeOptions, Validation};
use libfuzzer_sys::fuzz_target;

/// Ropes beyond this size stop growing so a single input stays fast.
const GROWTH_LIMIT: usize = 1 << 16;

#[derive(Debug, Arbitrary)]
enum Op {
    Append(Vec<u8>),
    Prepend(Vec<u8>),
    AppendRepeated(u8, u16),
    AppendRope(Vec<u8>),
    PrependRope(Vec<u8>),
    AppendSelf,
    AppendBuffer(Vec<u8>),
    RefillAppendBuffer(Vec<u8>),
    RemovePrefix(u16),
    RemoveSuffix(u16),
    Slice(u16, u16),
    Flatten,
    Snapshot,
}

#[derive(Debug, Arbitrary)]
struct Input {
    disable_inline: bool,
    flat_len: u8,
    ops: Vec<Op>,
}

fn apply(rope: &mut Rope, model: &mut Vec<u8>, snapshots: &mut Vec<(Rope, Vec<u8>)>, op: Op) {
    let options = rope.options();
    match op {
        Op::Append(bytes) => {
            rope.append(&bytes);
            model.extend_from_slice(&bytes);
        }
        Op::Prepend(bytes) => {
            rope.prepend(&bytes);
            model.splice(0..0, bytes);
        }
        Op::AppendRepeated(byte, count) => {
            let bytes = vec![byte; usize::from(count)];
            rope.append(&bytes);
            model.extend_from_slice(&bytes);
        }
        Op::AppendRope(bytes) => {
            let mut other = Rope::with_options(options);
            other.append(&bytes);
            rope.append_rope(&other);
            model.extend_from_slice(&bytes);
        }
        Op::PrependRope(bytes) => {
            let mut other = Rope::with_options(options);
            other.append(&bytes);
            rope.prepend_rope(&other);
            model.splice(0..0, bytes);
        }
        Op::AppendSelf => {
            if model.len() <= GROWTH_LIMIT {
                let copy = rope.clone();
                rope.append_rope(&copy);
                model.extend_from_within(..);
            }
        }
        Op::AppendBuffer(bytes) => {
            let mut buffer = bytecord::RopeBuffer::with_capacity(bytes.len());
            buffer.available_up_to(bytes.len()).copy_from_slice(&bytes);
            buffer.increase_len(bytes.len());
            rope.append_buffer(buffer);
            model.extend_from_slice(&bytes);
        }
        Op::RefillAppendBuffer(bytes) => {
            let mut buffer = rope.get_append_buffer(bytes.len().max(1), 1);
            let room = buffer.available().len().min(bytes.len());
            buffer.available()[..room].copy_from_slice(&bytes[..room]);
            buffer.increase_len(room);
            rope.append_buffer(buffer);
            model.extend_from_slice(&bytes[..room]);
        }
        Op::RemovePrefix(n) => {
            let n = usize::from(n).min(model.len());
            rope.remove_prefix(n);
            model.drain(..n);
        }
        Op::RemoveSuffix(n) => {
            let n = usize::from(n).min(model.len());
            rope.remove_suffix(n);
            model.truncate(model.len() - n);
        }
        Op::Slice(a, b) => {
            let len = model.len();
            let (a, b) = (usize::from(a) % (len + 1), usize::from(b) % (len + 1));
            let (start, end) = (a.min(b), a.max(b));
            *rope = rope.slice(start..end);
            *model = model[start..end].to_vec();
        }
        Op::Flatten => {
            assert_eq!(rope.flatten(), &model[..]);
        }
        Op::Snapshot => snapshots.push((rope.clone(), model.clone())),
    }
}

fuzz_target!(|input: Input| {
    let options = RopeOptions {
        disable_inline: input.disable_inline,
        validation: Validation::Exhaustive,
        max_flat_len: usize::from(input.flat_len),
    };
    let mut rope = Rope::with_options(options);
    let mut model = Vec::new();
    let mut snapshots = Vec::new();

    for op in input.ops {
        apply(&mut rope, &mut model, &mut snapshots, op);
        assert_eq!(rope.len(), model.len());
        if model.len() > GROWTH_LIMIT {
            break;
        }
    }

    assert_eq!(rope.to_vec(), model);
    assert!(rope.bytes().rev().eq(model.iter().rev().copied()));
    for (snapshot, expected) in &snapshots {
        assert_eq!(snapshot.to_vec(), *expected);
    }
});
