//! Byte layout of the catalog file's header slot and per-recording slot header.
//!
//! These records are never sent on the wire; they only frame the catalog's
//! fixed-stride slots. Each slot is a [`DescriptorHeader`] followed, at
//! [`DESCRIPTOR_HEADER_LENGTH`], by an encoded recording descriptor body.

use crate::codec::{get_i32_at, put_i32_at, put_u8_at};
use crate::error::CodecError;
use crate::header::MessageHeader;

/// Catalog file format version written and accepted by this build.
pub const CATALOG_VERSION: i32 = 1;

/// Offset of the descriptor body within a slot.
pub const DESCRIPTOR_HEADER_LENGTH: usize = 32;

/// Offset within a slot where a message header can be stamped so that
/// header and body form one contiguous message.
pub const MESSAGE_HEADER_OFFSET: usize = DESCRIPTOR_HEADER_LENGTH - MessageHeader::ENCODED_LENGTH;

const VERSION_OFFSET: usize = 0;
const ENTRY_LENGTH_OFFSET: usize = 4;

const LENGTH_OFFSET: usize = 0;
const VALID_OFFSET: usize = 4;
const RESERVED_OFFSET: usize = 31;

/// Header stored in slot 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogHeader {
    /// File format version.
    pub version: i32,
    /// Uniform slot stride in bytes.
    pub entry_length: i32,
}

impl CatalogHeader {
    /// Header for a new file of this build's version.
    pub fn new(entry_length: i32) -> Self {
        Self {
            version: CATALOG_VERSION,
            entry_length,
        }
    }

    /// Read from the start of slot 0.
    pub fn decode(slot: &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            version: get_i32_at(slot, VERSION_OFFSET)?,
            entry_length: get_i32_at(slot, ENTRY_LENGTH_OFFSET)?,
        })
    }

    /// Write over the start of slot 0. Other bytes are left alone.
    pub fn encode_into(&self, slot: &mut [u8]) -> Result<(), CodecError> {
        put_i32_at(slot, VERSION_OFFSET, self.version)?;
        put_i32_at(slot, ENTRY_LENGTH_OFFSET, self.entry_length)
    }
}

/// Frame at the start of every recording slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorHeader {
    /// Encoded body length; 0 means the slot was never committed.
    pub length: i32,
    /// 1 when live, 0 once invalidated.
    pub valid: u8,
}

impl DescriptorHeader {
    /// Read from the start of a slot.
    pub fn decode(slot: &[u8]) -> Result<Self, CodecError> {
        let valid = slot.get(VALID_OFFSET).copied().ok_or(CodecError::Truncated {
            needed: VALID_OFFSET + 1,
            available: slot.len(),
        })?;
        Ok(Self {
            length: get_i32_at(slot, LENGTH_OFFSET)?,
            valid,
        })
    }

    /// Write over the start of a slot and clear the reserved byte.
    pub fn encode_into(&self, slot: &mut [u8]) -> Result<(), CodecError> {
        put_i32_at(slot, LENGTH_OFFSET, self.length)?;
        put_u8_at(slot, VALID_OFFSET, self.valid)?;
        put_u8_at(slot, RESERVED_OFFSET, 0)
    }

    /// Whether the slot holds a live recording.
    pub fn is_valid(&self) -> bool {
        self.valid == 1
    }

    /// Overwrite only the `valid` byte of a slot.
    pub fn set_valid(slot: &mut [u8], valid: bool) -> Result<(), CodecError> {
        put_u8_at(slot, VALID_OFFSET, u8::from(valid))
    }
}
