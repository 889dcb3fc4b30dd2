//! Property-based tests for the byte ring.
//!
//! A `VecDeque` serves as the reference model: any sequence of ring
//! operations must agree with the model byte for byte, and the reserved-slot
//! conservation law must hold after every step.

use lockring::{NoLock, RingBuffer};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(Vec<u8>),
    Dequeue(usize),
    Peek(usize),
    Consume(usize),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 1..40).prop_map(Op::Enqueue),
        (1usize..40).prop_map(Op::Dequeue),
        (1usize..40).prop_map(Op::Peek),
        (1usize..40).prop_map(Op::Consume),
        Just(Op::Clear),
    ]
}

proptest! {
    /// Any operation sequence matches the reference deque, all-or-nothing
    /// included.
    #[test]
    fn ring_matches_reference_model(
        capacity in 2usize..128,
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let ring = RingBuffer::<NoLock>::with_capacity(capacity);
        let mut model: VecDeque<u8> = VecDeque::new();
        let usable = capacity - 1;

        for op in ops {
            match op {
                Op::Enqueue(data) => {
                    let ret = ring.enqueue(&data);
                    if model.len() + data.len() <= usable {
                        prop_assert_eq!(ret, data.len());
                        model.extend(&data);
                    } else {
                        prop_assert_eq!(ret, 0);
                    }
                }
                Op::Dequeue(n) => {
                    let mut out = vec![0u8; n];
                    let ret = ring.dequeue(&mut out);
                    if model.len() >= n {
                        prop_assert_eq!(ret, n);
                        let expected: Vec<u8> = model.drain(..n).collect();
                        prop_assert_eq!(out, expected);
                    } else {
                        prop_assert_eq!(ret, 0);
                    }
                }
                Op::Peek(n) => {
                    let mut out = vec![0u8; n];
                    let ret = ring.peek(&mut out);
                    if model.len() >= n {
                        prop_assert_eq!(ret, n);
                        let expected: Vec<u8> = model.iter().take(n).copied().collect();
                        prop_assert_eq!(out, expected);
                    } else {
                        prop_assert_eq!(ret, 0);
                    }
                }
                Op::Consume(n) => {
                    let ret = ring.consume(n);
                    if model.len() >= n {
                        prop_assert_eq!(ret, n);
                        model.drain(..n);
                    } else {
                        prop_assert_eq!(ret, 0);
                    }
                }
                Op::Clear => {
                    ring.clear();
                    model.clear();
                }
            }

            // Conservation after every step.
            prop_assert_eq!(ring.data_size(), model.len());
            prop_assert_eq!(ring.data_size() + ring.free_size(), usable);
        }
    }

    /// Windowed peek-verify-consume walks reconstruct the stream in order:
    /// enqueue 0..10000 as little-endian words, read them back through
    /// arbitrary window sizes.
    #[test]
    fn windowed_peek_consume_reconstructs_the_stream(
        windows in prop::collection::vec(1usize..64, 1..50),
    ) {
        const WORDS: u32 = 10_000;

        let ring = RingBuffer::<NoLock>::with_capacity(65536);
        for i in 0..WORDS {
            prop_assert_eq!(ring.enqueue(&i.to_le_bytes()), 4);
        }

        let mut next = 0u32;
        let mut windows = windows.into_iter().cycle();
        while next < WORDS {
            let k = windows.next().unwrap().min((WORDS - next) as usize);
            let mut buf = vec![0u8; k * 4];
            prop_assert_eq!(ring.peek(&mut buf), k * 4);

            for (j, word) in buf.chunks_exact(4).enumerate() {
                let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                prop_assert_eq!(value, next + j as u32);
            }

            prop_assert_eq!(ring.consume(k * 4), k * 4);
            next += k as u32;
        }

        prop_assert_eq!(ring.data_size(), 0);
    }
}

/// Patterned-string soak: random-size enqueues of a repeating 81-byte
/// pattern, random-size dequeues with a peek comparison first. Any break in
/// the pattern means the ring tore a copy somewhere.
#[test]
fn patterned_soak_small_rings() {
    const PATTERN: &[u8] =
        b"1234567890 abcdefghijklmnopqrstuvwxyz 1234567890 abcdefghijklmnopqrstuvwxyz 12345";

    for capacity in [100usize, 257, 1000] {
        let ring = RingBuffer::<NoLock>::with_capacity(capacity);
        let mut rng = rand::rngs::StdRng::seed_from_u64(capacity as u64);

        let mut write_pos = 0usize; // next pattern offset going in
        let mut read_pos = 0usize; // next pattern offset expected out

        for _ in 0..20_000 {
            // Writer side: a random slice of the pattern, wrapped at its end.
            let want = rng.gen_range(1..=PATTERN.len());
            let chunk = want.min(PATTERN.len() - write_pos).min(ring.free_size());
            if chunk > 0 {
                assert_eq!(
                    ring.enqueue(&PATTERN[write_pos..write_pos + chunk]),
                    chunk
                );
                write_pos = (write_pos + chunk) % PATTERN.len();
            }

            // Reader side: peek must agree with the dequeue that follows.
            let want = rng.gen_range(1..=PATTERN.len());
            let chunk = want.min(ring.data_size());
            if chunk > 0 {
                let mut peeked = vec![0u8; chunk];
                let mut out = vec![0u8; chunk];
                assert_eq!(ring.peek(&mut peeked), chunk);
                assert_eq!(ring.dequeue(&mut out), chunk);
                assert_eq!(peeked, out);

                for &byte in &out {
                    assert_eq!(
                        byte, PATTERN[read_pos],
                        "pattern break at offset {read_pos} (capacity {capacity})"
                    );
                    read_pos = (read_pos + 1) % PATTERN.len();
                }
            }
        }

        assert_eq!(ring.data_size() + ring.free_size(), capacity - 1);
    }
}
