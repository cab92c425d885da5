use chain_hashmap::ChainMap;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("chain_map_insert_10k", |b| {
        b.iter_batched(
            || ChainMap::<String, u64>::new(),
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    m.insert(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit(c: &mut Criterion) {
    c.bench_function("chain_map_find_hit", |b| {
        let mut m = ChainMap::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().cloned().enumerate() {
            m.insert(k, i as u64).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            let hit = m.find(k.as_str()).unwrap();
            black_box(hit.value(&m));
        })
    });
}

fn bench_find_miss(c: &mut Criterion) {
    c.bench_function("chain_map_find_miss", |b| {
        let mut m = ChainMap::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generated keys are unlikely to be in the map
            let k = key(miss.next().unwrap());
            black_box(m.find(k.as_str()));
        })
    });
}

fn bench_ordered_traversal(c: &mut Criterion) {
    c.bench_function("chain_map_traverse_10k", |b| {
        let mut m = ChainMap::new();
        for (i, x) in lcg(23).take(10_000).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        b.iter(|| {
            let mut sum = 0u64;
            for (_, _, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
}

fn bench_clone(c: &mut Criterion) {
    c.bench_function("chain_map_clone_10k", |b| {
        let mut m = ChainMap::new();
        for (i, x) in lcg(31).take(10_000).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        b.iter(|| black_box(m.clone()))
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
    targets = bench_insert, bench_find_hit, bench_find_miss, bench_ordered_traversal, bench_clone
}
criterion_main!(benches);
