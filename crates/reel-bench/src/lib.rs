//! Benchmark profiles and utilities for the Reel recording archive.
//!
//! Provides pre-built catalogs for benchmarking:
//!
//! - [`bench_recording`]: a recording with realistic channel strings
//! - [`populated_catalog`]: a catalog of `n` recordings across a few channels
//! - [`BENCH_CHANNELS`]: the channels recordings are spread over

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use reel_catalog::{Catalog, CatalogError, CatalogOptions, FileSyncLevel};
use reel_core::{ManualClock, NewRecording, NULL_POSITION};

/// Stripped channels that [`populated_catalog`] rotates through.
pub const BENCH_CHANNELS: [&str; 4] = [
    "aeron:udp?endpoint=localhost:40123",
    "aeron:udp?endpoint=localhost:40124",
    "aeron:ipc",
    "aeron:udp?control=localhost:40125|control-mode=dynamic",
];

/// Recording `i` of a benchmark catalog: channel `i % 4`, stream `1 + i % 2`.
pub fn bench_recording(i: usize) -> NewRecording {
    let channel = BENCH_CHANNELS[i % BENCH_CHANNELS.len()];
    NewRecording {
        start_position: 0,
        stop_position: NULL_POSITION,
        initial_term_id: i as i32,
        segment_file_length: 128 * 1024 * 1024,
        term_buffer_length: 64 * 1024,
        mtu_length: 1408,
        session_id: i as i32,
        stream_id: 1 + (i % 2) as i32,
        original_channel: format!("{channel}|session-id={i}"),
        stripped_channel: channel.to_string(),
        source_identity: format!("192.168.0.{}:40123", i % 250),
    }
}

/// Open a catalog in `dir` without fsync and append `n` bench recordings.
pub fn populated_catalog(dir: &Path, n: usize) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::open(
        dir,
        CatalogOptions {
            file_sync_level: FileSyncLevel::None,
            ..CatalogOptions::default()
        },
        Box::new(ManualClock::new(1_700_000_000_000)),
    )?;
    for i in 0..n {
        catalog.add_new_recording(bench_recording(i))?;
    }
    Ok(catalog)
}
