//! Catalog fixtures.
//!
//! [`uri_listing_recordings`] is the standard five-recording catalog used
//! by the listing tests: three recordings on stripped channel `"channel"`
//! and stream 1 (ids 0, 2, 4) interleaved with two on other channels.

use reel_core::{NewRecording, NULL_POSITION};

/// Segment file length used by every fixture recording.
pub const SEGMENT_FILE_LENGTH: i32 = 128 * 1024 * 1024;
/// Term buffer length used by every fixture recording.
pub const TERM_BUFFER_LENGTH: i32 = 4096;
/// MTU used by every fixture recording.
pub const MTU_LENGTH: i32 = 1024;

/// A live recording with fixture geometry.
pub fn new_recording(
    session_id: i32,
    stream_id: i32,
    stripped_channel: &str,
    original_channel: &str,
    source_identity: &str,
) -> NewRecording {
    NewRecording {
        start_position: 0,
        stop_position: NULL_POSITION,
        initial_term_id: 0,
        segment_file_length: SEGMENT_FILE_LENGTH,
        term_buffer_length: TERM_BUFFER_LENGTH,
        mtu_length: MTU_LENGTH,
        session_id,
        stream_id,
        original_channel: original_channel.to_string(),
        stripped_channel: stripped_channel.to_string(),
        source_identity: source_identity.to_string(),
    }
}

/// The five recordings, in the order they are added.
pub fn uri_listing_recordings() -> Vec<NewRecording> {
    vec![
        new_recording(6, 1, "channel", "channelA?tag=f", "sourceA"),
        new_recording(7, 1, "channelA", "channel?tag=f", "sourceV"),
        new_recording(8, 1, "channel", "channel?tag=f", "sourceB"),
        new_recording(8, 1, "channelB", "channelB?tag=f", "sourceB"),
        new_recording(8, 1, "channel", "channel?tag=f", "sourceB"),
    ]
}

/// Ids of the fixture recordings on stripped channel `"channel"`, stream 1.
pub const MATCHING_IDS: [u64; 3] = [0, 2, 4];

/// `n` recordings on the same channel and stream with distinct sessions.
pub fn uniform_recordings(n: usize, channel: &str, stream_id: i32) -> Vec<NewRecording> {
    (0..n)
        .map(|i| new_recording(i as i32, stream_id, channel, channel, "source"))
        .collect()
}
