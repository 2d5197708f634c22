//! The recording descriptor value type and its sentinels.

use crate::id::RecordingId;

/// `stopTimestamp` value of a recording that has not stopped yet.
pub const NULL_TIMESTAMP: i64 = -1;

/// `stopPosition` value of a recording whose end is not yet known.
pub const NULL_POSITION: i64 = -1;

/// Everything the archive knows about one recorded stream.
///
/// The transport geometry (`initial_term_id`, `term_buffer_length`,
/// `mtu_length`, `segment_file_length`) is what a replay needs to rebuild
/// the original stream layout.
///
/// # Examples
///
/// ```
/// use reel_core::{RecordingDescriptor, RecordingId, NULL_POSITION, NULL_TIMESTAMP};
///
/// let d = RecordingDescriptor {
///     recording_id: RecordingId(0),
///     start_timestamp: 1_000,
///     stop_timestamp: NULL_TIMESTAMP,
///     start_position: 0,
///     stop_position: NULL_POSITION,
///     initial_term_id: 0,
///     segment_file_length: 128 * 1024 * 1024,
///     term_buffer_length: 64 * 1024,
///     mtu_length: 1408,
///     session_id: 6,
///     stream_id: 1,
///     stripped_channel: "aeron:udp?endpoint=localhost:40123".into(),
///     original_channel: "aeron:udp?endpoint=localhost:40123|session-id=6".into(),
///     source_identity: "127.0.0.1:40123".into(),
/// };
/// assert!(d.is_active());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingDescriptor {
    /// Catalog-assigned identity.
    pub recording_id: RecordingId,
    /// Epoch millis at which recording began.
    pub start_timestamp: i64,
    /// Epoch millis at which recording ended, or [`NULL_TIMESTAMP`].
    pub stop_timestamp: i64,
    /// Stream position of the first recorded byte.
    pub start_position: i64,
    /// Stream position one past the last recorded byte, or [`NULL_POSITION`].
    pub stop_position: i64,
    /// Term id at which the recorded stream started.
    pub initial_term_id: i32,
    /// Size of each segment file written by the data plane.
    pub segment_file_length: i32,
    /// Term buffer length of the recorded stream.
    pub term_buffer_length: i32,
    /// MTU of the recorded stream.
    pub mtu_length: i32,
    /// Transport session id of the recorded stream.
    pub session_id: i32,
    /// Stream id of the recorded stream.
    pub stream_id: i32,
    /// Channel URI with session qualifiers removed. Listing filters match on this.
    pub stripped_channel: String,
    /// Channel URI as originally requested.
    pub original_channel: String,
    /// Where the data came from.
    pub source_identity: String,
}

impl RecordingDescriptor {
    /// Whether the recording is still in progress.
    pub fn is_active(&self) -> bool {
        self.stop_timestamp == NULL_TIMESTAMP
    }

    /// Whether `position` lies within the known recorded range.
    ///
    /// An active recording has no upper bound here; callers must bound it
    /// by the last position the recording reported.
    pub fn contains_position(&self, position: i64) -> bool {
        if position < self.start_position {
            return false;
        }
        self.is_active() || self.stop_position == NULL_POSITION || position <= self.stop_position
    }
}

/// Input to a catalog append: a descriptor minus the fields the catalog
/// assigns itself (`recording_id`, the timestamps).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRecording {
    /// Stream position of the first recorded byte.
    pub start_position: i64,
    /// Known stop position, usually [`NULL_POSITION`] for a live recording.
    pub stop_position: i64,
    /// Term id at which the recorded stream started.
    pub initial_term_id: i32,
    /// Size of each segment file.
    pub segment_file_length: i32,
    /// Term buffer length of the recorded stream.
    pub term_buffer_length: i32,
    /// MTU of the recorded stream.
    pub mtu_length: i32,
    /// Transport session id.
    pub session_id: i32,
    /// Stream id.
    pub stream_id: i32,
    /// Channel URI as originally requested.
    pub original_channel: String,
    /// Channel URI with session qualifiers removed.
    pub stripped_channel: String,
    /// Where the data came from.
    pub source_identity: String,
}

impl NewRecording {
    /// Build the descriptor that the catalog persists for this recording.
    pub fn into_descriptor(self, recording_id: RecordingId, start_timestamp: i64) -> RecordingDescriptor {
        RecordingDescriptor {
            recording_id,
            start_timestamp,
            stop_timestamp: NULL_TIMESTAMP,
            start_position: self.start_position,
            stop_position: self.stop_position,
            initial_term_id: self.initial_term_id,
            segment_file_length: self.segment_file_length,
            term_buffer_length: self.term_buffer_length,
            mtu_length: self.mtu_length,
            session_id: self.session_id,
            stream_id: self.stream_id,
            stripped_channel: self.stripped_channel,
            original_channel: self.original_channel,
            source_identity: self.source_identity,
        }
    }
}
