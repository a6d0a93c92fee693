use super::*;

use crate::node::{Children, Node};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

fn check_siblings<V>(children: &Children<V>) {
    for child in children.iter() {
        assert!(!child.prefix.is_empty(), "reachable node with an empty prefix");
    }
    let firsts: Vec<u8> = children.iter().map(|c| c.prefix[0]).collect();
    assert!(
        firsts.windows(2).all(|w| w[0] < w[1]),
        "siblings must be strictly ascending by first byte: {firsts:?}"
    );
}

fn validate_tree<V>(t: &RadixTree<V>) {
    check_siblings(&t.children);
    let mut stack: Vec<&Node<V>> = t.children.iter().map(|c| &**c).collect();

    let mut keyed = 0usize;
    while let Some(node) = stack.pop() {
        check_siblings(&node.children);
        if node.value.is_some() {
            keyed += 1;
        } else {
            assert!(
                node.children.len() >= 2,
                "valueless node {:?} has {} children",
                node.prefix.as_slice(),
                node.children.len()
            );
        }
        stack.extend(node.children.iter().map(|c| &**c));
    }

    assert_eq!(keyed, t.len(), "keyed node count must match RadixTree::len");
}

fn assert_matches(t: &RadixTree<u64>, m: &BTreeMap<Vec<u8>, u64>) {
    validate_tree(t);
    let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
    let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(got, expected);
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Delete(Vec<u8>),
    Get(Vec<u8>),
    /// Snapshot; `true` keeps mutating the original, `false` the copy.
    Snapshot(bool),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet forces shared prefixes, splits and merges.
    prop::collection::vec(b'a'..=b'd', 1..=10)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Delete),
        20 => key.clone().prop_map(Op::Get),
        5 => any::<bool>().prop_map(Op::Snapshot),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_snapshots(ops in ops_strategy()) {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        let mut frozen: Vec<(RadixTree<u64>, BTreeMap<Vec<u8>, u64>)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.replace_or_insert(&key, value), m.insert(key, value));
                }
                Op::Delete(key) => {
                    prop_assert_eq!(t.delete(&key), m.remove(key.as_slice()));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).copied(), m.get(key.as_slice()).copied());
                    prop_assert_eq!(t.contains(&key), m.contains_key(key.as_slice()));
                }
                Op::Snapshot(keep_original) => {
                    let mut copy = t.snapshot();
                    if !keep_original {
                        std::mem::swap(&mut t, &mut copy);
                    }
                    frozen.push((copy, m.clone()));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        assert_matches(&t, &m);
        for (tree, model) in &frozen {
            assert_matches(tree, model);
        }
    }

    #[test]
    fn prop_insert_is_idempotent(keys in prop::collection::vec(key_strategy(), 0..200)) {
        let mut t: RadixTree<()> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, ()> = BTreeMap::new();
        for key in &keys {
            prop_assert_eq!(t.insert(key), m.insert(key.clone(), ()).is_none());
        }
        validate_tree(&t);

        let mut walked = Vec::new();
        let _ = t.walk(|segments, _| {
            walked.push(segments.concat());
            ControlFlow::Continue(())
        });
        let expected: Vec<Vec<u8>> = m.keys().cloned().collect();
        prop_assert_eq!(walked, expected);
    }

    #[test]
    fn prop_round_trip(
        entries in prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 1..=24),
            prop::collection::vec(any::<u8>(), 0..=16),
            0..300,
        ),
        gzip in any::<bool>(),
        batch_size in 1usize..64,
    ) {
        let tree: RadixTree<Vec<u8>> = entries.clone().into_iter().collect();
        let config = if gzip { EncoderConfig::gzip() } else { EncoderConfig::default() };
        let bytes = Encoder::with_config(Bytes, config).encode(&tree).unwrap();

        let decoder = Decoder::with_config(
            Bytes,
            DecoderConfig::default().with_batch_size(batch_size).with_queue_depth(2),
        );
        let back: RadixTree<Vec<u8>> = decoder.decode(&bytes).unwrap();
        validate_tree(&back);

        let got: Vec<(Vec<u8>, Vec<u8>)> = back.iter().map(|(k, v)| (k, v.clone())).collect();
        let expected: Vec<(Vec<u8>, Vec<u8>)> = entries.into_iter().collect();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"abd".to_vec(),
        b"b".to_vec(),
        b"ba".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.replace_or_insert(&k, v), m.insert(k, v));
        }

        assert_matches(&t, &m);
    });
}

#[test]
fn exhaustive_delete_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then delete in all permutations from a snapshot.
    let mut base_tree: RadixTree<u64> = RadixTree::new();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_tree.replace_or_insert(k, v), base_map.insert(k.clone(), v));
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.snapshot();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.delete(&k), m.remove(k.as_slice()));
            assert_matches(&t, &m);
        }
        assert_eq!(t.len(), 0);
        assert!(t.children.is_empty());
    });

    // Every permutation ran against a snapshot; the base is untouched.
    assert_matches(&base_tree, &base_map);
}
