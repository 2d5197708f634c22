//! Error types for encoding and decoding.

use std::fmt;

/// Errors raised while encoding or decoding a message or catalog record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before a field could be read.
    Truncated {
        /// Bytes the field needed.
        needed: usize,
        /// Bytes that were left.
        available: usize,
    },
    /// The message header names a different schema.
    SchemaMismatch {
        /// Schema id found in the header.
        found: u16,
        /// Schema id this build understands.
        expected: u16,
    },
    /// A well-formed message of the wrong type for the decoder used.
    UnexpectedTemplate {
        /// Template id found in the header.
        found: u16,
        /// Template id the decoder was asked for.
        expected: u16,
    },
    /// The template id is not part of the schema.
    UnknownTemplate {
        /// The unrecognized template id.
        template_id: u16,
    },
    /// An enum field carries a value outside its declared set.
    UnknownEnumValue {
        /// Name of the enum field.
        field: &'static str,
        /// The raw value found.
        value: i64,
    },
    /// A string field is not valid UTF-8.
    InvalidUtf8 {
        /// Name of the string field.
        field: &'static str,
    },
    /// A variable-length field is too long for its `u32` length prefix.
    FieldTooLong {
        /// Name of the field.
        field: &'static str,
        /// Its length in bytes.
        length: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated: needed {needed} bytes, {available} available")
            }
            Self::SchemaMismatch { found, expected } => {
                write!(f, "schema id {found} does not match expected {expected}")
            }
            Self::UnexpectedTemplate { found, expected } => {
                write!(f, "template id {found} where {expected} was expected")
            }
            Self::UnknownTemplate { template_id } => {
                write!(f, "unknown template id {template_id}")
            }
            Self::UnknownEnumValue { field, value } => {
                write!(f, "unknown value {value} for {field}")
            }
            Self::InvalidUtf8 { field } => write!(f, "{field} is not valid UTF-8"),
            Self::FieldTooLong { field, length } => {
                write!(f, "{field} of {length} bytes exceeds the u32 length prefix")
            }
        }
    }
}

impl std::error::Error for CodecError {}
