//! The message header and schema constants.

use crate::codec::{read_u16_le, take, write_u16_le};
use crate::error::CodecError;

/// Schema id carried by every archive message.
pub const SCHEMA_ID: u16 = 101;

/// Schema version written by this build.
///
/// Decoders accept any version: fields are located using the header's
/// `block_length`, so a newer peer's extra fixed fields are skipped.
pub const SCHEMA_VERSION: u16 = 1;

/// Template ids of every message in the schema.
pub mod template {
    /// `ControlResponse`.
    pub const CONTROL_RESPONSE: u16 = 1;
    /// `ConnectRequest`.
    pub const CONNECT_REQUEST: u16 = 2;
    /// `CloseSessionRequest`.
    pub const CLOSE_SESSION_REQUEST: u16 = 3;
    /// `StartRecordingRequest`.
    pub const START_RECORDING_REQUEST: u16 = 4;
    /// `StopRecordingRequest`.
    pub const STOP_RECORDING_REQUEST: u16 = 5;
    /// `ReplayRequest`.
    pub const REPLAY_REQUEST: u16 = 6;
    /// `ListRecordingsRequest`.
    pub const LIST_RECORDINGS_REQUEST: u16 = 8;
    /// `ListRecordingsForUriRequest`.
    pub const LIST_RECORDINGS_FOR_URI_REQUEST: u16 = 9;
    /// `CatalogHeader` (file layout only, never sent).
    pub const CATALOG_HEADER: u16 = 20;
    /// `RecordingDescriptorHeader` (file layout only, never sent).
    pub const RECORDING_DESCRIPTOR_HEADER: u16 = 21;
    /// `RecordingDescriptor`.
    pub const RECORDING_DESCRIPTOR: u16 = 22;
    /// `RecordingStarted`.
    pub const RECORDING_STARTED: u16 = 101;
    /// `RecordingProgress`.
    pub const RECORDING_PROGRESS: u16 = 102;
    /// `RecordingStopped`.
    pub const RECORDING_STOPPED: u16 = 103;
}

/// The 8-byte prefix of every message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Length of the fixed block that follows.
    pub block_length: u16,
    /// Which message this is.
    pub template_id: u16,
    /// Always [`SCHEMA_ID`] for messages this crate understands.
    pub schema_id: u16,
    /// Schema version of the sender.
    pub version: u16,
}

impl MessageHeader {
    /// Encoded size in bytes.
    pub const ENCODED_LENGTH: usize = 8;

    /// Header for a message of this schema and version.
    pub fn new(template_id: u16, block_length: u16) -> Self {
        Self {
            block_length,
            template_id,
            schema_id: SCHEMA_ID,
            version: SCHEMA_VERSION,
        }
    }

    /// Append the header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        write_u16_le(buf, self.block_length);
        write_u16_le(buf, self.template_id);
        write_u16_le(buf, self.schema_id);
        write_u16_le(buf, self.version);
    }

    /// Write the header over the first 8 bytes of `dst`.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<(), CodecError> {
        let available = dst.len();
        let Some(dst) = dst.get_mut(..Self::ENCODED_LENGTH) else {
            return Err(CodecError::Truncated {
                needed: Self::ENCODED_LENGTH,
                available,
            });
        };
        dst[0..2].copy_from_slice(&self.block_length.to_le_bytes());
        dst[2..4].copy_from_slice(&self.template_id.to_le_bytes());
        dst[4..6].copy_from_slice(&self.schema_id.to_le_bytes());
        dst[6..8].copy_from_slice(&self.version.to_le_bytes());
        Ok(())
    }

    /// Read a header from the front of the cursor and check its schema id.
    pub fn decode(r: &mut &[u8]) -> Result<Self, CodecError> {
        let header = Self {
            block_length: read_u16_le(r)?,
            template_id: read_u16_le(r)?,
            schema_id: read_u16_le(r)?,
            version: read_u16_le(r)?,
        };
        if header.schema_id != SCHEMA_ID {
            return Err(CodecError::SchemaMismatch {
                found: header.schema_id,
                expected: SCHEMA_ID,
            });
        }
        Ok(header)
    }

    /// Split the fixed block off the cursor, leaving the var-length fields.
    pub fn take_block<'a>(&self, r: &mut &'a [u8]) -> Result<&'a [u8], CodecError> {
        take(r, self.block_length as usize)
    }

    /// Fail unless this header introduces `expected`.
    pub fn expect_template(&self, expected: u16) -> Result<(), CodecError> {
        if self.template_id != expected {
            return Err(CodecError::UnexpectedTemplate {
                found: self.template_id,
                expected,
            });
        }
        Ok(())
    }
}

/// Decode the header at the front of `buf` and return it with the rest.
pub fn split_header(buf: &[u8]) -> Result<(MessageHeader, &[u8]), CodecError> {
    let mut r = buf;
    let header = MessageHeader::decode(&mut r)?;
    Ok((header, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_encode_into_agree() {
        let header = MessageHeader::new(template::CONTROL_RESPONSE, 20);
        let mut appended = Vec::new();
        header.encode(&mut appended);
        let mut in_place = [0u8; 10];
        header.encode_into(&mut in_place).unwrap();
        assert_eq!(appended.as_slice(), &in_place[..8]);
        assert_eq!(appended.len(), MessageHeader::ENCODED_LENGTH);
    }

    #[test]
    fn foreign_schema_rejected() {
        let mut buf = Vec::new();
        MessageHeader {
            block_length: 0,
            template_id: 1,
            schema_id: 7,
            version: 1,
        }
        .encode(&mut buf);
        assert_eq!(
            split_header(&buf).unwrap_err(),
            CodecError::SchemaMismatch {
                found: 7,
                expected: SCHEMA_ID
            }
        );
    }

    #[test]
    fn encode_into_short_buffer_fails() {
        let mut dst = [0u8; 4];
        assert!(MessageHeader::new(1, 0).encode_into(&mut dst).is_err());
    }
}
