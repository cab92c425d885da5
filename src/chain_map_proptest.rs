#![cfg(test)]

// Property tests for ChainMap kept inside the crate so they can call the
// internal structural validator after every operation.
//
// Model: a HashMap<u64, Vec<i32>> multimap. Inserts push; `find` must agree
// with the oldest pushed value (first-match-wins over duplicate keys);
// traversal must yield exactly the model's (key, value) multiset, in
// non-decreasing bucket order.

use crate::chain_map::ChainMap;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, i32),
    Find(u8),
    Contains(u8),
    MutateFirst(u8, i32),
    Traverse,
}

// Keys are folded into a small range so collisions, duplicates, and chain
// growth all happen within a few dozen operations.
fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k % 16, v)),
        any::<u8>().prop_map(|k| Op::Find(k % 16)),
        any::<u8>().prop_map(|k| Op::Contains(k % 16)),
        (any::<u8>(), any::<i32>()).prop_map(|(k, d)| Op::MutateFirst(k % 16, d)),
        Just(Op::Traverse),
    ];
    proptest::collection::vec(op, 1..80)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    // Property: state-machine equivalence against the multimap model, with
    // the internal invariants (exact vacant-bucket budget, symmetric chain
    // links, hash-consistent placement) re-checked after every operation.
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut: ChainMap<u64, i32> = ChainMap::new();
        let mut model: HashMap<u64, Vec<i32>> = HashMap::new();
        let mut total = 0usize;

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let k = u64::from(k);
                    let c = sut.insert(k, v).expect("bucket-array growth failed");
                    prop_assert_eq!(c.key(&sut), Some(&k));
                    prop_assert_eq!(c.value(&sut), Some(&v));
                    model.entry(k).or_default().push(v);
                    total += 1;
                }
                Op::Find(k) => {
                    let k = u64::from(k);
                    let expected = model.get(&k).map(|vs| vs[0]);
                    let got = sut.find(&k).and_then(|c| c.value(&sut).copied());
                    prop_assert_eq!(got, expected);
                }
                Op::Contains(k) => {
                    let k = u64::from(k);
                    prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
                }
                Op::MutateFirst(k, d) => {
                    let k = u64::from(k);
                    match sut.find(&k) {
                        Some(c) => {
                            let v = c.value_mut(&mut sut).expect("cursor from find resolves");
                            *v = v.wrapping_add(d);
                            let vs = model.get_mut(&k).expect("model out of sync with find");
                            vs[0] = vs[0].wrapping_add(d);
                        }
                        None => prop_assert!(!model.contains_key(&k)),
                    }
                }
                Op::Traverse => {
                    let mut seen: HashMap<(u64, i32), usize> = HashMap::new();
                    let mut last_bucket = 0usize;
                    for (c, k, v) in sut.iter() {
                        prop_assert!(c.bucket() >= last_bucket, "bucket order regressed");
                        last_bucket = c.bucket();
                        *seen.entry((*k, *v)).or_default() += 1;
                    }
                    let mut expected: HashMap<(u64, i32), usize> = HashMap::new();
                    for (k, vs) in &model {
                        for v in vs {
                            *expected.entry((*k, *v)).or_default() += 1;
                        }
                    }
                    prop_assert_eq!(seen, expected);
                }
            }
            prop_assert_eq!(sut.len(), total);
            sut.check_invariants();
        }
    }

    // Property: walking backward from the end sentinel visits the same
    // entries as the forward walk, in exactly reversed order, and the
    // occupied-bucket count equals the number of distinct cursor buckets.
    #[test]
    fn prop_backward_walk_mirrors_forward(keys in proptest::collection::vec(any::<u16>(), 0..60)) {
        let mut m: ChainMap<u64, usize> = ChainMap::new();
        for (i, k) in keys.iter().enumerate() {
            m.insert(u64::from(*k), i).expect("bucket-array growth failed");
        }

        let forward: Vec<usize> = m.iter().map(|(_, _, v)| *v).collect();
        let buckets: std::collections::HashSet<usize> =
            m.iter().map(|(c, _, _)| c.bucket()).collect();
        prop_assert_eq!(buckets.len(), m.occupied_buckets());

        let mut backward = Vec::new();
        let mut c = m.end().prev(&m);
        while let Some(v) = c.value(&m) {
            backward.push(*v);
            let p = c.prev(&m);
            if p == c {
                break;
            }
            c = p;
        }
        backward.reverse();
        prop_assert_eq!(backward, forward);
        m.check_invariants();
    }

    // Property: under a degenerate hasher that files everything into one
    // bucket, traversal is exactly insertion order and lookups still
    // resolve by key equality alone.
    #[test]
    fn prop_single_chain_keeps_insertion_order(entries in proptest::collection::vec((any::<u16>(), any::<i32>()), 1..40)) {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> ConstHasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut m: ChainMap<u64, i32, ConstBuildHasher> =
            ChainMap::with_hasher(ConstBuildHasher);
        for (k, v) in &entries {
            m.insert(u64::from(*k), *v).expect("bucket-array growth failed");
        }

        let walked: Vec<(u64, i32)> = m.iter().map(|(_, k, v)| (*k, *v)).collect();
        let inserted: Vec<(u64, i32)> = entries.iter().map(|(k, v)| (u64::from(*k), *v)).collect();
        prop_assert_eq!(walked, inserted);
        prop_assert_eq!(m.occupied_buckets(), 1);

        let first_key = u64::from(entries[0].0);
        let hit = m.find(&first_key).expect("inserted key must be found");
        prop_assert_eq!(hit.value(&m), Some(&entries[0].1));
        m.check_invariants();
    }
}
