//! Term codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use termstore_bench::{feed_key, record};
use termstore_codec::{decode, encode, encode_prefix, KeyEncoder, Term};

/// Create a nested record.
fn nested(depth: usize, width: usize) -> Term {
    if depth == 0 {
        Term::atom("leaf")
    } else {
        Term::map((0..width).map(|i| (Term::Integer(i as i64), nested(depth - 1, width))))
    }
}

/// Benchmark encoding scalars and small keys.
fn bench_encode_simple(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    group.bench_function("integer", |b| {
        let term = Term::Integer(42);
        b.iter(|| black_box(encode(black_box(&term)).unwrap()));
    });

    group.bench_function("float", |b| {
        let term = Term::Float(-1.5);
        b.iter(|| black_box(encode(black_box(&term)).unwrap()));
    });

    group.bench_function("atom", |b| {
        let term = Term::atom("feed");
        b.iter(|| black_box(encode(black_box(&term)).unwrap()));
    });

    group.bench_function("feed_key", |b| {
        let term = feed_key("feed", 1_000);
        b.iter(|| black_box(encode(black_box(&term)).unwrap()));
    });

    group.bench_function("feed_prefix", |b| {
        let term = Term::tuple([Term::atom("feed")]);
        b.iter(|| black_box(encode_prefix(black_box(&term)).unwrap()));
    });

    group.bench_function("record_64", |b| {
        let term = record(1, 64, 16);
        b.iter(|| black_box(encode(black_box(&term)).unwrap()));
    });

    group.finish();
}

/// Benchmark escaping cost on binaries full of bytes that need it.
fn bench_encode_escaped(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_binary");

    for size in [64, 1024, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("plain", size), size, |b, &size| {
            let term = Term::binary(vec![0x41u8; size]);
            b.iter(|| black_box(encode(black_box(&term)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("escaped", size), size, |b, &size| {
            let term = Term::binary(vec![0xFFu8; size]);
            b.iter(|| black_box(encode(black_box(&term)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    group.bench_function("feed_key", |b| {
        let encoded = encode(&feed_key("feed", 1_000)).unwrap();
        b.iter(|| black_box(decode(black_box(&encoded)).unwrap()));
    });

    for size in [64, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("record", size), size, |b, &size| {
            let encoded = encode(&record(1, size, 16)).unwrap();
            b.iter(|| black_box(decode(black_box(&encoded)).unwrap()));
        });
    }

    group.bench_function("nested_depth3_width5", |b| {
        let encoded = encode(&nested(3, 5)).unwrap();
        b.iter(|| black_box(decode(black_box(&encoded)).unwrap()));
    });

    group.finish();
}

/// Benchmark encoder reuse.
fn bench_encoder_reuse(c: &mut Criterion) {
    c.bench_function("encoder_reuse_100", |b| {
        let terms: Vec<_> = (0..100).map(|i| feed_key("feed", i)).collect();

        b.iter(|| {
            let mut encoder = KeyEncoder::new();
            for term in &terms {
                encoder.encode(black_box(term)).unwrap();
            }
            black_box(encoder.into_bytes());
        });
    });
}

criterion_group!(
    benches,
    bench_encode_simple,
    bench_encode_escaped,
    bench_decode,
    bench_encoder_reuse,
);

criterion_main!(benches);
