//! Record store benchmarks.

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rand::Rng;
use termstore_bench::{feed_key, generate_records, populated, record, EngineKind};
use termstore_core::{StoreConfig, Term};

fn indexed() -> StoreConfig {
    StoreConfig::new().index_field(Term::atom("group"))
}

/// Benchmark single record writes.
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");

    for kind in EngineKind::ALL {
        for size in [64, 1024].iter() {
            group.throughput(Throughput::Bytes(*size as u64));
            group.bench_with_input(
                BenchmarkId::new(kind.name(), size),
                size,
                |b, &size| {
                    let store = kind.open(StoreConfig::default());
                    let value = record(0, size, 16);
                    let mut next = 0i64;

                    b.iter(|| {
                        next += 1;
                        store.put(&Term::Integer(next), black_box(&value)).unwrap();
                    });
                },
            );
        }

        group.bench_function(BenchmarkId::new(kind.name(), "indexed"), |b| {
            let store = kind.open(indexed());
            let mut next = 0i64;

            b.iter(|| {
                next += 1;
                store
                    .put(&Term::Integer(next), black_box(&record(next, 64, 16)))
                    .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark point reads from a populated store.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let records = generate_records(count, 64);
            let store = populated(EngineKind::Memory, StoreConfig::default(), &records);
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let key = Term::Integer(rng.gen_range(0..count as i64));
                black_box(store.get(black_box(&key)).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark appends to a feed.
fn bench_append(c: &mut Criterion) {
    c.bench_function("append", |b| {
        let store = EngineKind::Memory.open(StoreConfig::default());
        let value = record(0, 64, 16);
        let mut next = 0i64;

        b.iter(|| {
            next += 1;
            store
                .append(black_box(&feed_key("feed", next)), &value)
                .unwrap();
        });
    });
}

/// Benchmark ordered range reads.
fn bench_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("take");
    let records = generate_records(10_000, 64);
    let store = populated(EngineKind::Memory, StoreConfig::default(), &records);

    for n in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            b.iter(|| black_box(store.take(&Term::Integer(5_000), black_box(n)).unwrap()));
        });
    }

    group.bench_function("next", |b| {
        b.iter(|| black_box(store.next(black_box(&Term::Integer(5_000))).unwrap()));
    });
    group.finish();
}

/// Benchmark prefix scans over a feed.
fn bench_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed");

    for per_feed in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*per_feed as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(per_feed),
            per_feed,
            |b, &per_feed| {
                let store = EngineKind::Memory.open(StoreConfig::default());
                for feed in ["a", "b", "c"] {
                    for n in 0..per_feed as i64 {
                        store.put(&feed_key(feed, n), &Term::Integer(n)).unwrap();
                    }
                }
                let prefix = Term::tuple([Term::atom("b")]);

                b.iter(|| black_box(store.feed(black_box(&prefix)).unwrap()));
            },
        );
    }
    group.finish();
}

/// Benchmark removing a feed by prefix.
fn bench_cut(c: &mut Criterion) {
    let mut group = c.benchmark_group("cut");

    for kind in EngineKind::ALL {
        group.bench_function(kind.name(), |b| {
            b.iter_batched(
                || {
                    let store = kind.open(StoreConfig::default());
                    for n in 0..100 {
                        store.put(&feed_key("old", n), &Term::Integer(n)).unwrap();
                        store.put(&feed_key("new", n), &Term::Integer(n)).unwrap();
                    }
                    store
                },
                |store| {
                    let removed = store.cut(&Term::tuple([Term::atom("old")])).unwrap();
                    black_box(removed);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark secondary index lookups.
fn bench_index(c: &mut Criterion) {
    let records = generate_records(10_000, 64);
    let store = populated(EngineKind::Memory, indexed(), &records);

    c.bench_function("index_lookup", |b| {
        b.iter(|| {
            let keys = store
                .index(&Term::atom("group"), black_box(&Term::Integer(7)))
                .unwrap();
            black_box(keys);
        });
    });
}

/// Benchmark the sequence counter.
fn bench_seq(c: &mut Criterion) {
    let mut group = c.benchmark_group("seq");

    for kind in EngineKind::ALL {
        group.bench_function(kind.name(), |b| {
            let store = kind.open(StoreConfig::default());
            b.iter(|| black_box(store.seq().unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_append,
    bench_take,
    bench_feed,
    bench_cut,
    bench_index,
    bench_seq,
);

criterion_main!(benches);
