//! Criterion micro-benchmarks for catalog append, lookup, and scan.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use reel_bench::{bench_recording, populated_catalog};
use reel_core::RecordingId;

/// Benchmark: append one recording to a catalog of 1K, without fsync.
fn bench_catalog_append(c: &mut Criterion) {
    c.bench_function("catalog_append", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let catalog = populated_catalog(dir.path(), 1_000).unwrap();
                (dir, catalog)
            },
            |(dir, mut catalog)| {
                let id = catalog.add_new_recording(bench_recording(1_000)).unwrap();
                black_box(id);
                (dir, catalog)
            },
            BatchSize::PerIteration,
        );
    });
}

/// Benchmark: decode one descriptor by id from a catalog of 10K.
fn bench_catalog_lookup(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = populated_catalog(dir.path(), 10_000).unwrap();

    c.bench_function("catalog_lookup_10k", |b| {
        let mut id = 0u64;
        b.iter(|| {
            let descriptor = catalog.lookup(RecordingId(id)).unwrap();
            id = (id + 7_919) % 10_000;
            black_box(descriptor);
        });
    });
}

/// Benchmark: filtered scan of a catalog of 10K (one recording in four matches).
fn bench_catalog_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = populated_catalog(dir.path(), 10_000).unwrap();

    c.bench_function("catalog_scan_filtered_10k", |b| {
        b.iter(|| {
            let matches = catalog
                .for_each_matching(RecordingId(0), |entry| {
                    entry.view().is_ok_and(|v| {
                        v.stream_id() == 1 && v.stripped_channel() == "aeron:ipc"
                    })
                })
                .count();
            black_box(matches);
        });
    });
}

criterion_group!(
    benches,
    bench_catalog_append,
    bench_catalog_lookup,
    bench_catalog_scan
);
criterion_main!(benches);
