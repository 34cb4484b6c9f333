use core::hint::black_box;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use criterion::Throughput;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use swiss_hash::HashMap as SwissMap;
use swiss_hash::RandomState;

const SIZES: &[usize] = &[1 << 10, 1 << 15, 1 << 19];

/// Keys drawn once per size so every contender sees the same workload.
fn keys_for(size: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0x00b5_e55e_d000 + size as u64);
    (0..size).map(|_| rng.random()).collect()
}

/// All three maps run with the same SipHash state so the comparison is
/// about table layout, not hash functions.
fn shared_state() -> RandomState {
    RandomState::new()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                let mut map = SwissMap::with_capacity_and_hasher(0, shared_state());
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("swiss_hash_preallocated/{size}"), |b| {
            b.iter(|| {
                let mut map = SwissMap::with_capacity_and_hasher(size, shared_state());
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut map = hashbrown::HashMap::with_capacity_and_hasher(0, shared_state());
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
        group.bench_function(format!("std/{size}"), |b| {
            b.iter(|| {
                let mut map = std::collections::HashMap::with_capacity_and_hasher(0, shared_state());
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(keys.len() as u64));

        let mut swiss = SwissMap::with_capacity_and_hasher(size, shared_state());
        let mut brown = hashbrown::HashMap::with_capacity_and_hasher(size, shared_state());
        let mut std_map = std::collections::HashMap::with_capacity_and_hasher(size, shared_state());
        for &key in &keys {
            swiss.insert(key, key);
            brown.insert(key, key);
            std_map.insert(key, key);
        }

        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                let mut found = 0u64;
                for key in &keys {
                    if swiss.get(key).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut found = 0u64;
                for key in &keys {
                    if brown.get(key).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
        group.bench_function(format!("std/{size}"), |b| {
            b.iter(|| {
                let mut found = 0u64;
                for key in &keys {
                    if std_map.get(key).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

fn bench_get_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_miss");

    for &size in SIZES {
        let keys = keys_for(size);
        // Misses come from an unrelated stream.
        let mut rng = StdRng::seed_from_u64(0xdead);
        let misses: Vec<u64> = (0..size).map(|_| rng.random()).collect();
        group.throughput(Throughput::Elements(misses.len() as u64));

        let mut swiss = SwissMap::with_capacity_and_hasher(size, shared_state());
        let mut brown = hashbrown::HashMap::with_capacity_and_hasher(size, shared_state());
        for &key in &keys {
            swiss.insert(key, key);
            brown.insert(key, key);
        }

        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| {
                let mut found = 0u64;
                for key in &misses {
                    if swiss.get(key).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut found = 0u64;
                for key in &misses {
                    if brown.get(key).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(keys.len() as u64));

        let mut swiss = SwissMap::with_capacity_and_hasher(size, shared_state());
        let mut brown = hashbrown::HashMap::with_capacity_and_hasher(size, shared_state());
        for &key in &keys {
            swiss.insert(key, key);
            brown.insert(key, key);
        }

        group.bench_function(format!("swiss_hash/{size}"), |b| {
            b.iter(|| black_box(swiss.values().copied().sum::<u64>()))
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| black_box(brown.values().copied().sum::<u64>()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_get_hit,
    bench_get_miss,
    bench_iterate
);
criterion_main!(benches);
