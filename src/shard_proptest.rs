#![cfg(test)]

// Property tests for Shard kept inside the crate so they can reach the
// structural layer directly.

use crate::key::Key;
use crate::shard::Shard;
use crate::weak_key::WeakKey;
use proptest::prelude::*;
use std::collections::HashMap;

const POOL: usize = 6;

// Pool-indexed operations: indices shrink to earlier keys and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Release(usize),
    Expunge,
}

// Three buckets for six keys keeps every probe walking past collisions.
fn hash_of(key: &Key<usize>) -> u64 {
    key.id().get() % 3
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0..POOL, any::<i32>()).prop_map(|(i, v)| Op::Put(i, v)),
        (0..POOL).prop_map(Op::Remove),
        (0..POOL).prop_map(Op::Get),
        (0..POOL).prop_map(Op::Release),
        Just(Op::Expunge),
    ];
    proptest::collection::vec(op, 1..80)
}

// Property: state-machine equivalence against a HashMap of live slots.
// Invariants exercised across random operation sequences:
// - put/remove/get on live keys agree with the model, by identity.
// - Releasing a key that has an entry leaves exactly one stale entry.
// - Draining one notice per released key removes every stale entry and
//   never a live one, even when notices match another stale entry.
// - len == live entries + stale entries after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_shard_state_machine(ops in arb_ops()) {
        let mut sut: Shard<usize, i32> = Shard::with_capacity(0);
        let mut pool: Vec<Key<usize>> = (0..POOL).map(Key::new).collect();
        let mut model: HashMap<usize, i32> = HashMap::new();
        let mut notices: Vec<WeakKey<usize>> = Vec::new();
        let mut stale = 0usize;

        for op in ops {
            match op {
                Op::Put(i, v) => {
                    let key = &pool[i];
                    let prev = sut.insert(WeakKey::new(key, hash_of(key)), v);
                    prop_assert_eq!(prev, model.insert(i, v));
                }
                Op::Remove(i) => {
                    let key = &pool[i];
                    prop_assert_eq!(sut.remove(hash_of(key), key), model.remove(&i));
                }
                Op::Get(i) => {
                    let key = &pool[i];
                    prop_assert_eq!(sut.get(hash_of(key), key).copied(), model.get(&i).copied());
                }
                Op::Release(i) => {
                    let old = std::mem::replace(&mut pool[i], Key::new(i));
                    notices.push(WeakKey::new(&old, hash_of(&old)));
                    if model.remove(&i).is_some() {
                        stale += 1;
                    }
                    drop(old);
                }
                Op::Expunge => {
                    for notice in notices.drain(..) {
                        if sut.expunge(&notice).is_some() {
                            stale -= 1;
                        }
                    }
                    prop_assert_eq!(stale, 0);
                    for (&i, &v) in &model {
                        let key = &pool[i];
                        prop_assert_eq!(sut.get(hash_of(key), key), Some(&v));
                    }
                }
            }
            prop_assert_eq!(sut.len(), model.len() + stale);
        }
    }
}
