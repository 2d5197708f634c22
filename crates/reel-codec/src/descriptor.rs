//! The `RecordingDescriptor` message.
//!
//! The body (fixed block plus the three channel/source strings) is the
//! unit stored in a catalog slot. On the wire the same body follows a
//! [`MessageHeader`], so a stored body becomes a message by stamping a
//! header in front of it and patching the correlation id in place.

use reel_core::{RecordingDescriptor, RecordingId};

use crate::codec::{
    get_i32_at, get_i64_at, get_u64_at, put_i64_at, read_var_str, take, var_str_length,
    write_i32_le, write_i64_le, write_u64_le, write_var_str,
};
use crate::error::CodecError;
use crate::header::{split_header, template, MessageHeader};

/// Length of the fixed block.
pub const BLOCK_LENGTH: u16 = 72;

/// Byte offsets of the fixed fields within a body.
pub mod offset {
    /// `correlationId` i64.
    pub const CORRELATION_ID: usize = 0;
    /// `recordingId` u64.
    pub const RECORDING_ID: usize = 8;
    /// `startTimestamp` i64.
    pub const START_TIMESTAMP: usize = 16;
    /// `stopTimestamp` i64.
    pub const STOP_TIMESTAMP: usize = 24;
    /// `startPosition` i64.
    pub const START_POSITION: usize = 32;
    /// `stopPosition` i64.
    pub const STOP_POSITION: usize = 40;
    /// `initialTermId` i32.
    pub const INITIAL_TERM_ID: usize = 48;
    /// `segmentFileLength` i32.
    pub const SEGMENT_FILE_LENGTH: usize = 52;
    /// `termBufferLength` i32.
    pub const TERM_BUFFER_LENGTH: usize = 56;
    /// `mtuLength` i32.
    pub const MTU_LENGTH: usize = 60;
    /// `sessionId` i32.
    pub const SESSION_ID: usize = 64;
    /// `streamId` i32.
    pub const STREAM_ID: usize = 68;
}

/// Encoded body length of `descriptor`, header excluded.
pub fn body_length(descriptor: &RecordingDescriptor) -> usize {
    BLOCK_LENGTH as usize
        + var_str_length(&descriptor.stripped_channel)
        + var_str_length(&descriptor.original_channel)
        + var_str_length(&descriptor.source_identity)
}

/// Append the body of `descriptor` (no message header) to `buf`.
pub fn encode_descriptor_body(
    buf: &mut Vec<u8>,
    correlation_id: i64,
    descriptor: &RecordingDescriptor,
) -> Result<(), CodecError> {
    buf.reserve(body_length(descriptor));
    write_i64_le(buf, correlation_id);
    write_u64_le(buf, descriptor.recording_id.0);
    write_i64_le(buf, descriptor.start_timestamp);
    write_i64_le(buf, descriptor.stop_timestamp);
    write_i64_le(buf, descriptor.start_position);
    write_i64_le(buf, descriptor.stop_position);
    write_i32_le(buf, descriptor.initial_term_id);
    write_i32_le(buf, descriptor.segment_file_length);
    write_i32_le(buf, descriptor.term_buffer_length);
    write_i32_le(buf, descriptor.mtu_length);
    write_i32_le(buf, descriptor.session_id);
    write_i32_le(buf, descriptor.stream_id);
    write_var_str(buf, "strippedChannel", &descriptor.stripped_channel)?;
    write_var_str(buf, "originalChannel", &descriptor.original_channel)?;
    write_var_str(buf, "sourceIdentity", &descriptor.source_identity)
}

/// Append a complete `RecordingDescriptor` message to `buf`.
pub fn encode_descriptor_message(
    buf: &mut Vec<u8>,
    correlation_id: i64,
    descriptor: &RecordingDescriptor,
) -> Result<(), CodecError> {
    MessageHeader::new(template::RECORDING_DESCRIPTOR, BLOCK_LENGTH).encode(buf);
    encode_descriptor_body(buf, correlation_id, descriptor)
}

/// Message header that introduces a descriptor body.
pub fn descriptor_message_header() -> MessageHeader {
    MessageHeader::new(template::RECORDING_DESCRIPTOR, BLOCK_LENGTH)
}

/// Overwrite the correlation id of an encoded body.
pub fn stamp_correlation_id(body: &mut [u8], correlation_id: i64) -> Result<(), CodecError> {
    put_i64_at(body, offset::CORRELATION_ID, correlation_id)
}

/// Overwrite the stop fields of an encoded body.
pub fn stamp_stop(body: &mut [u8], stop_timestamp: i64, stop_position: i64) -> Result<(), CodecError> {
    put_i64_at(body, offset::STOP_TIMESTAMP, stop_timestamp)?;
    put_i64_at(body, offset::STOP_POSITION, stop_position)
}

/// A zero-copy view of an encoded descriptor body.
///
/// Fixed fields are read on demand from the block; the strings borrow
/// from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordingDescriptorView<'a> {
    block: &'a [u8],
    stripped_channel: &'a str,
    original_channel: &'a str,
    source_identity: &'a str,
    encoded_length: usize,
}

impl<'a> RecordingDescriptorView<'a> {
    /// Decode a body laid out with this build's block length.
    pub fn decode_body(body: &'a [u8]) -> Result<Self, CodecError> {
        Self::decode_with_block_length(body, BLOCK_LENGTH as usize)
    }

    fn decode_with_block_length(body: &'a [u8], block_length: usize) -> Result<Self, CodecError> {
        if block_length < BLOCK_LENGTH as usize {
            return Err(CodecError::Truncated {
                needed: BLOCK_LENGTH as usize,
                available: block_length,
            });
        }
        let mut r = body;
        let block = take(&mut r, block_length)?;
        let stripped_channel = read_var_str(&mut r, "strippedChannel")?;
        let original_channel = read_var_str(&mut r, "originalChannel")?;
        let source_identity = read_var_str(&mut r, "sourceIdentity")?;
        Ok(Self {
            block,
            stripped_channel,
            original_channel,
            source_identity,
            encoded_length: body.len() - r.len(),
        })
    }

    fn i64_at(&self, offset: usize) -> i64 {
        get_i64_at(self.block, offset).unwrap_or_default()
    }

    fn i32_at(&self, offset: usize) -> i32 {
        get_i32_at(self.block, offset).unwrap_or_default()
    }

    /// Bytes the body occupies, header excluded.
    pub fn encoded_length(&self) -> usize {
        self.encoded_length
    }

    /// Correlation id stamped on the body.
    pub fn correlation_id(&self) -> i64 {
        self.i64_at(offset::CORRELATION_ID)
    }

    /// Recording id.
    pub fn recording_id(&self) -> RecordingId {
        RecordingId(get_u64_at(self.block, offset::RECORDING_ID).unwrap_or_default())
    }

    /// Start timestamp in epoch millis.
    pub fn start_timestamp(&self) -> i64 {
        self.i64_at(offset::START_TIMESTAMP)
    }

    /// Stop timestamp in epoch millis, or the null sentinel.
    pub fn stop_timestamp(&self) -> i64 {
        self.i64_at(offset::STOP_TIMESTAMP)
    }

    /// Start position.
    pub fn start_position(&self) -> i64 {
        self.i64_at(offset::START_POSITION)
    }

    /// Stop position, or the null sentinel.
    pub fn stop_position(&self) -> i64 {
        self.i64_at(offset::STOP_POSITION)
    }

    /// Transport session id.
    pub fn session_id(&self) -> i32 {
        self.i32_at(offset::SESSION_ID)
    }

    /// Stream id.
    pub fn stream_id(&self) -> i32 {
        self.i32_at(offset::STREAM_ID)
    }

    /// Channel with session qualifiers removed.
    pub fn stripped_channel(&self) -> &'a str {
        self.stripped_channel
    }

    /// Channel as originally requested.
    pub fn original_channel(&self) -> &'a str {
        self.original_channel
    }

    /// Source identity.
    pub fn source_identity(&self) -> &'a str {
        self.source_identity
    }

    /// Copy into an owned descriptor.
    pub fn to_descriptor(&self) -> RecordingDescriptor {
        RecordingDescriptor {
            recording_id: self.recording_id(),
            start_timestamp: self.start_timestamp(),
            stop_timestamp: self.stop_timestamp(),
            start_position: self.start_position(),
            stop_position: self.stop_position(),
            initial_term_id: self.i32_at(offset::INITIAL_TERM_ID),
            segment_file_length: self.i32_at(offset::SEGMENT_FILE_LENGTH),
            term_buffer_length: self.i32_at(offset::TERM_BUFFER_LENGTH),
            mtu_length: self.i32_at(offset::MTU_LENGTH),
            session_id: self.session_id(),
            stream_id: self.stream_id(),
            stripped_channel: self.stripped_channel.to_string(),
            original_channel: self.original_channel.to_string(),
            source_identity: self.source_identity.to_string(),
        }
    }
}

/// Decode a complete `RecordingDescriptor` message, header included.
pub fn decode_descriptor_message(buf: &[u8]) -> Result<RecordingDescriptorView<'_>, CodecError> {
    let (header, body) = split_header(buf)?;
    header.expect_template(template::RECORDING_DESCRIPTOR)?;
    RecordingDescriptorView::decode_with_block_length(body, header.block_length as usize)
}
