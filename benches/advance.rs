use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use pinmap::PinMap;

const ENTRIES: i32 = 1_024;

fn filled() -> PinMap<i32, i32> {
    (0..ENTRIES).map(|key| (key, key)).collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("full scan");
        let map = filled();
        group.bench_function("PinMap", |b| {
            b.iter(|| {
                let mut it = map.begin();
                let mut sum = 0i64;
                while let Some(key) = it.key() {
                    sum += i64::from(*key);
                    it.advance();
                }
                black_box(sum)
            });
        });

        let plain: BTreeMap<i32, i32> = (0..ENTRIES).map(|key| (key, key)).collect();
        group.bench_function("BTreeMap", |b| {
            b.iter(|| {
                let sum: i64 = plain.keys().map(|&key| i64::from(key)).sum();
                black_box(sum)
            });
        });
    }

    {
        let mut group = c.benchmark_group("pin and release");
        let map = filled();
        group.bench_function("find + drop", |b| {
            b.iter_batched(
                || (),
                |()| {
                    let it = map.find(black_box(&(ENTRIES / 2)));
                    black_box(it.key().copied())
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function("clone + drop", |b| {
            let it = map.find(&(ENTRIES / 2));
            b.iter_batched(|| (), |()| black_box(it.clone()), BatchSize::SmallInput);
        });
    }

    {
        let mut group = c.benchmark_group("erase with pins");
        group.bench_function("erase + reinsert pinned", |b| {
            let map = filled();
            let _pin = map.find(&7);
            b.iter(|| {
                map.erase(black_box(&7));
                map.insert(black_box(7), 7);
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
