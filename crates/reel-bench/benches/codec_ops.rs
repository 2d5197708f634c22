//! Criterion micro-benchmarks for the descriptor and control codecs.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use reel_bench::bench_recording;
use reel_codec::{
    decode_descriptor_message, encode_descriptor_message, ControlRequest, ControlResponse,
    ControlResponseCode,
};
use reel_core::RecordingId;

/// Benchmark: encode a full descriptor message.
fn bench_descriptor_encode(c: &mut Criterion) {
    let descriptor = bench_recording(3).into_descriptor(RecordingId(3), 1_700_000_000_000);
    let mut buf = Vec::with_capacity(512);

    c.bench_function("descriptor_encode", |b| {
        b.iter(|| {
            buf.clear();
            encode_descriptor_message(&mut buf, 42, &descriptor).unwrap();
            black_box(buf.len());
        });
    });
}

/// Benchmark: zero-copy decode of a descriptor message, then to owned.
fn bench_descriptor_decode(c: &mut Criterion) {
    let descriptor = bench_recording(3).into_descriptor(RecordingId(3), 1_700_000_000_000);
    let mut buf = Vec::new();
    encode_descriptor_message(&mut buf, 42, &descriptor).unwrap();

    c.bench_function("descriptor_view", |b| {
        b.iter(|| {
            let view = decode_descriptor_message(&buf).unwrap();
            black_box(view.stream_id());
        });
    });
    c.bench_function("descriptor_to_owned", |b| {
        b.iter(|| {
            let view = decode_descriptor_message(&buf).unwrap();
            black_box(view.to_descriptor());
        });
    });
}

/// Benchmark: decode a list-for-URI request and encode a response.
fn bench_control_round(c: &mut Criterion) {
    let mut request = Vec::new();
    ControlRequest::ListRecordingsForUri {
        correlation_id: 7,
        from_recording_id: 0,
        record_count: 100,
        stream_id: 1,
        channel: "aeron:udp?endpoint=localhost:40123".into(),
    }
    .encode(&mut request)
    .unwrap();
    let mut response = Vec::with_capacity(128);

    c.bench_function("control_request_decode", |b| {
        b.iter(|| black_box(ControlRequest::decode(&request).unwrap()));
    });
    c.bench_function("control_response_encode", |b| {
        b.iter(|| {
            response.clear();
            ControlResponse {
                correlation_id: 7,
                relevant_id: 12,
                code: ControlResponseCode::RecordingUnknown,
                error_message: String::new(),
            }
            .encode(&mut response)
            .unwrap();
            black_box(response.len());
        });
    });
}

criterion_group!(
    benches,
    bench_descriptor_encode,
    bench_descriptor_decode,
    bench_control_round
);
criterion_main!(benches);
