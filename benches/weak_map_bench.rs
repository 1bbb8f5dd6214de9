use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use weak_concurrent_map::{Cleanup, Key, WeakConcurrentMap};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn inline_map() -> WeakConcurrentMap<u64, u64> {
    WeakConcurrentMap::with_inlined_expunction()
}

fn bench_put(c: &mut Criterion) {
    c.bench_function("weak_map_put_10k", |b| {
        b.iter_batched(
            || {
                let keys: Vec<_> = lcg(1).take(10_000).map(Key::new).collect();
                (inline_map(), keys)
            },
            |(m, keys)| {
                for (i, k) in keys.iter().enumerate() {
                    m.put(k, i as u64);
                }
                black_box((m, keys))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("weak_map_get_hit", |b| {
        let m = inline_map();
        let keys: Vec<_> = lcg(7).take(20_000).map(Key::new).collect();
        for (i, k) in keys.iter().enumerate() {
            m.put(k, i as u64);
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("weak_map_get_miss", |b| {
        let m = inline_map();
        let held: Vec<_> = lcg(11).take(10_000).map(Key::new).collect();
        for (i, k) in held.iter().enumerate() {
            m.put(k, i as u64);
        }
        let strangers: Vec<_> = lcg(0xdead_beef).take(1_000).map(Key::new).collect();
        let mut it = strangers.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k));
        })
    });
}

// Put then release: every iteration leaves one stale entry for the next
// operation to purge.
fn bench_churn_inline(c: &mut Criterion) {
    c.bench_function("weak_map_churn_inline", |b| {
        let m = inline_map();
        let mut ids = lcg(13);
        b.iter(|| {
            let k = Key::new(ids.next().unwrap());
            m.put(&k, 1);
            drop(k);
        });
        black_box(m.len());
    });
}

fn bench_expunge_manual(c: &mut Criterion) {
    c.bench_function("weak_map_expunge_1k", |b| {
        b.iter_batched(
            || {
                let m = WeakConcurrentMap::<u64, u64>::new(false).unwrap();
                let keys: Vec<_> = lcg(17).take(1_000).map(Key::new).collect();
                for k in &keys {
                    m.put(k, 0);
                }
                drop(keys);
                m
            },
            |m| black_box(m.expunge_stale_entries()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn_background(c: &mut Criterion) {
    c.bench_function("weak_map_churn_background", |b| {
        let m = WeakConcurrentMap::<u64, u64>::builder()
            .cleanup(Cleanup::Background)
            .build()
            .unwrap();
        let mut ids = lcg(19);
        b.iter(|| {
            let k = Key::new(ids.next().unwrap());
            m.put(&k, 1);
            drop(k);
        });
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_put, bench_get_hit, bench_get_miss, bench_churn_inline,
        bench_expunge_manual, bench_churn_background
}
criterion_main!(benches);
