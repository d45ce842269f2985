#![cfg(test)]

// Property tests for the hash engines, kept inside the crate so they can
// reach crate-private helpers.

use crate::digest::Digest;
use crate::error::{HashError, MapError};
use crate::hash_indexed_map::HashIndexedMap;
use crate::ordered_hash_map::OrderedHashMap;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// Keys sharing a first byte share a digest, so a small pool produces plenty
// of collisions.
fn first_byte(k: &String) -> Result<Digest, HashError> {
    Ok(Digest::from(u64::from(k.bytes().next().unwrap_or(0))))
}

fn digest_of(k: &str) -> u8 {
    k.bytes().next().unwrap_or(0)
}

// Pool-indexed operations so shrinking moves towards earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(usize),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-c][a-z]{0,3}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Get),
            1 => idx.clone().prop_map(Op::Contains),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Reference model: insertion-ordered entries plus a digest -> key index.
#[derive(Default)]
struct Model {
    entries: Vec<(String, i32)>,
    by_digest: BTreeMap<u8, String>,
}

enum Expect {
    Collision,
    Present(usize),
    Absent,
}

impl Model {
    fn route(&self, k: &str) -> Expect {
        match self.by_digest.get(&digest_of(k)) {
            Some(owner) if owner != k => Expect::Collision,
            Some(_) => Expect::Present(
                self.entries
                    .iter()
                    .position(|(ek, _)| ek == k)
                    .expect("indexed key present in entries"),
            ),
            None => Expect::Absent,
        }
    }
}

fn assert_collision<T: std::fmt::Debug>(r: Result<T, MapError>) -> Result<(), TestCaseError> {
    match r {
        Err(MapError::HashCollision { .. }) => Ok(()),
        other => Err(TestCaseError::fail(format!("expected collision, got {:?}", other))),
    }
}

// Property: state-machine equivalence of OrderedHashMap against the model.
// Invariants exercised across random operation sequences:
// - A digest shared by unequal keys is refused on add/remove/get/contains
//   and leaves the map unchanged.
// - Updating a present key keeps its position; new keys append; removal
//   splices exactly one position.
// - `iter` matches the model's order exactly; `len` matches after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_ordered_state_machine((pool, ops) in arb_scenario()) {
        let mut sut = OrderedHashMap::with_hasher(first_byte);
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Add(i, v) => {
                    let k = pool[i].clone();
                    match model.route(&k) {
                        Expect::Collision => assert_collision(sut.insert(k, v))?,
                        Expect::Present(pos) => {
                            let prev = sut.insert(k, v).expect("update succeeds");
                            prop_assert_eq!(prev, Some(model.entries[pos].1));
                            model.entries[pos].1 = v;
                        }
                        Expect::Absent => {
                            prop_assert_eq!(sut.insert(k.clone(), v).expect("insert succeeds"), None);
                            model.by_digest.insert(digest_of(&k), k.clone());
                            model.entries.push((k, v));
                        }
                    }
                }
                Op::Remove(i) => {
                    let k = &pool[i];
                    match model.route(k) {
                        Expect::Collision => assert_collision(sut.remove(k))?,
                        Expect::Present(pos) => {
                            let (_, mv) = model.entries.remove(pos);
                            model.by_digest.remove(&digest_of(k));
                            prop_assert_eq!(sut.remove(k).expect("remove succeeds"), Some(mv));
                        }
                        Expect::Absent => prop_assert_eq!(sut.remove(k).expect("no-op"), None),
                    }
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    match model.route(k) {
                        Expect::Collision => assert_collision(sut.get_ref(k))?,
                        Expect::Present(pos) => {
                            prop_assert_eq!(sut.get_ref(k).expect("get succeeds"), Some(&model.entries[pos].1));
                        }
                        Expect::Absent => prop_assert_eq!(sut.get_ref(k).expect("get succeeds"), None),
                    }
                }
                Op::Contains(i) => {
                    let k = &pool[i];
                    match model.route(k) {
                        Expect::Collision => assert_collision(sut.contains_key(k))?,
                        Expect::Present(_) => prop_assert!(sut.contains_key(k).expect("ok")),
                        Expect::Absent => prop_assert!(!sut.contains_key(k).expect("ok")),
                    }
                }
                Op::Iterate => {
                    let got: Vec<(String, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(&got, &model.entries);
                }
                Op::Clear => {
                    sut.clear();
                    model = Model::default();
                }
            }
            prop_assert_eq!(sut.len(), model.entries.len());
        }
    }
}

// Property: the unordered engine agrees with the model on content (not
// order) under the same collision-heavy digest.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_unordered_state_machine((pool, ops) in arb_scenario()) {
        let mut sut = HashIndexedMap::with_hasher(first_byte);
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Add(i, v) => {
                    let k = pool[i].clone();
                    match model.route(&k) {
                        Expect::Collision => assert_collision(sut.insert(k, v))?,
                        Expect::Present(pos) => {
                            sut.insert(k, v).expect("update succeeds");
                            model.entries[pos].1 = v;
                        }
                        Expect::Absent => {
                            sut.insert(k.clone(), v).expect("insert succeeds");
                            model.by_digest.insert(digest_of(&k), k.clone());
                            model.entries.push((k, v));
                        }
                    }
                }
                Op::Remove(i) => {
                    let k = &pool[i];
                    match model.route(k) {
                        Expect::Collision => assert_collision(sut.remove(k))?,
                        Expect::Present(pos) => {
                            let (_, mv) = model.entries.remove(pos);
                            model.by_digest.remove(&digest_of(k));
                            prop_assert_eq!(sut.remove(k).expect("remove succeeds"), Some(mv));
                        }
                        Expect::Absent => prop_assert_eq!(sut.remove(k).expect("no-op"), None),
                    }
                }
                Op::Get(i) | Op::Contains(i) => {
                    let k = &pool[i];
                    match model.route(k) {
                        Expect::Collision => assert_collision(sut.get_ref(k))?,
                        Expect::Present(pos) => {
                            prop_assert_eq!(sut.get_ref(k).expect("get succeeds"), Some(&model.entries[pos].1));
                        }
                        Expect::Absent => prop_assert!(!sut.contains_key(k).expect("ok")),
                    }
                }
                Op::Iterate => {
                    let got: BTreeSet<(String, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    let want: BTreeSet<(String, i32)> = model.entries.iter().cloned().collect();
                    prop_assert_eq!(got, want);
                }
                Op::Clear => {
                    sut.clear();
                    model = Model::default();
                }
            }
            prop_assert_eq!(sut.len(), model.entries.len());
            prop_assert_eq!(sut.is_empty(), model.entries.is_empty());
        }
    }
}
