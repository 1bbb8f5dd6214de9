// WeakConcurrentMap property tests.
//
// Property 1: manual cleanup matches a model of live and stale entries.
//  - Model: HashMap of live pool slots plus a counter of stale entries
//    (entries whose key was released while still present).
//  - Operations: put, get, remove, release (drop the slot's key and mint a
//    fresh one), expunge.
//  - Invariant: len() == live + stale after every step; expunge returns
//    exactly the stale count and leaves every live entry readable.
//
// Property 2: inline cleanup never lets stale entries survive an operation.
//  - Same operations; after any operation other than release, len() equals
//    the live model and every live key reads back its value.
use proptest::prelude::*;
use std::collections::HashMap;
use weak_concurrent_map::{Cleanup, Key, WeakConcurrentMap};

const POOL: usize = 6;

#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Get(usize),
    Remove(usize),
    Release(usize),
    Expunge,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (0..POOL, any::<i32>()).prop_map(|(i, v)| Op::Put(i, v)),
        2 => (0..POOL).prop_map(Op::Get),
        1 => (0..POOL).prop_map(Op::Remove),
        2 => (0..POOL).prop_map(Op::Release),
        1 => Just(Op::Expunge),
    ];
    proptest::collection::vec(op, 1..100)
}

fn build(cleanup: Cleanup, shards: usize) -> WeakConcurrentMap<usize, i32> {
    WeakConcurrentMap::builder()
        .cleanup(cleanup)
        .shards(shards)
        .build()
        .unwrap()
}

// Property 1: manual cleanup state machine.
proptest! {
    #[test]
    fn prop_manual_cleanup_model(shards in 1usize..=4, ops in arb_ops()) {
        let map = build(Cleanup::Manual, shards);
        let mut pool: Vec<Key<usize>> = (0..POOL).map(Key::new).collect();
        let mut live: HashMap<usize, i32> = HashMap::new();
        let mut stale = 0usize;

        for op in ops {
            match op {
                Op::Put(i, v) => {
                    prop_assert_eq!(map.put(&pool[i], v), live.insert(i, v));
                }
                Op::Get(i) => {
                    prop_assert_eq!(map.get(&pool[i]), live.get(&i).copied());
                }
                Op::Remove(i) => {
                    prop_assert_eq!(map.remove(&pool[i]), live.remove(&i));
                }
                Op::Release(i) => {
                    pool[i] = Key::new(i);
                    if live.remove(&i).is_some() {
                        stale += 1;
                    }
                }
                Op::Expunge => {
                    prop_assert_eq!(map.expunge_stale_entries(), stale);
                    stale = 0;
                    for (&i, &v) in &live {
                        prop_assert_eq!(map.get(&pool[i]), Some(v));
                    }
                }
            }
            prop_assert_eq!(map.len(), live.len() + stale);
        }

        drop(pool);
        map.expunge_stale_entries();
        prop_assert!(map.is_empty());
    }
}

// Property 2: inline cleanup leaves no stale entry behind an operation.
proptest! {
    #[test]
    fn prop_inline_cleanup_model(shards in 1usize..=4, ops in arb_ops()) {
        let map = build(Cleanup::Inline, shards);
        let mut pool: Vec<Key<usize>> = (0..POOL).map(Key::new).collect();
        let mut live: HashMap<usize, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Put(i, v) => {
                    prop_assert_eq!(map.put(&pool[i], v), live.insert(i, v));
                }
                Op::Get(i) => {
                    prop_assert_eq!(map.get(&pool[i]), live.get(&i).copied());
                }
                Op::Remove(i) => {
                    prop_assert_eq!(map.remove(&pool[i]), live.remove(&i));
                }
                Op::Release(i) => {
                    pool[i] = Key::new(i);
                    live.remove(&i);
                    continue;
                }
                Op::Expunge => {
                    map.expunge_stale_entries();
                }
            }
            prop_assert_eq!(map.len(), live.len());
        }

        for (&i, &v) in &live {
            prop_assert_eq!(map.get(&pool[i]), Some(v));
        }
    }
}
