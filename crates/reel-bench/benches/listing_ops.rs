//! Criterion benchmarks for listing sessions: how fast a full catalog
//! listing drains through the proxy at different payload ceilings.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use reel_archive::{ControlSessionProxy, ListingFilter, ListingSession, SendPolicy};
use reel_bench::populated_catalog;
use reel_core::{BusySpinIdleStrategy, OfferError, Publication, RecordingId};

/// Accepts everything and keeps nothing.
struct NullPublication {
    max_payload_length: usize,
    position: u64,
}

impl Publication for NullPublication {
    fn offer(&mut self, buffer: &[u8]) -> Result<u64, OfferError> {
        self.position += buffer.len() as u64;
        Ok(self.position)
    }

    fn max_payload_length(&self) -> usize {
        self.max_payload_length
    }

    fn channel(&self) -> &str {
        "aeron:ipc"
    }

    fn stream_id(&self) -> i32 {
        20
    }
}

/// Benchmark: list all 1K recordings, run to completion.
fn bench_listing_all(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = populated_catalog(dir.path(), 1_000).unwrap();
    let mut proxy = ControlSessionProxy::new(Box::new(BusySpinIdleStrategy), SendPolicy::Unbounded);

    let mut group = c.benchmark_group("listing_all_1k");
    for mtu in [1_376usize, 8_192, 65_504] {
        group.bench_with_input(BenchmarkId::from_parameter(mtu), &mtu, |b, &mtu| {
            let mut publication = NullPublication {
                max_payload_length: mtu,
                position: 0,
            };
            b.iter(|| {
                let mut session =
                    ListingSession::new(1, RecordingId(0), 1_000, ListingFilter::All);
                let mut cycles = 0;
                while !session.is_done() {
                    session
                        .do_work(&catalog, &mut proxy, &mut publication)
                        .unwrap();
                    cycles += 1;
                }
                black_box(cycles);
            });
        });
    }
    group.finish();
}

/// Benchmark: list one stream of one channel out of 1K recordings.
fn bench_listing_for_uri(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = populated_catalog(dir.path(), 1_000).unwrap();
    let mut proxy = ControlSessionProxy::new(Box::new(BusySpinIdleStrategy), SendPolicy::Unbounded);
    let mut publication = NullPublication {
        max_payload_length: 1_376,
        position: 0,
    };

    c.bench_function("listing_for_uri_1k", |b| {
        b.iter(|| {
            let mut session = ListingSession::new(
                1,
                RecordingId(0),
                1_000,
                ListingFilter::for_uri("aeron:ipc?tag=3", 1),
            );
            while !session.is_done() {
                session
                    .do_work(&catalog, &mut proxy, &mut publication)
                    .unwrap();
            }
            black_box(session.sent());
        });
    });
}

criterion_group!(benches, bench_listing_all, bench_listing_for_uri);
criterion_main!(benches);
