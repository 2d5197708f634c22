//! Wire and catalog binary formats for the Reel recording archive.
//!
//! Every message is a fixed-size block of little-endian fields followed by
//! variable-length UTF-8 fields, prefixed by an 8-byte [`MessageHeader`].
//! The same recording descriptor body is used on the wire and inside the
//! catalog file, which lets the archive send a catalog entry by stamping a
//! header in front of it instead of re-encoding it.
//!
//! # Architecture
//!
//! - [`codec`] little-endian primitives shared by all messages
//! - [`header`] the message header and schema constants
//! - [`control`] client requests and the control response
//! - [`descriptor`] the recording descriptor, owned and zero-copy
//! - [`events`] recording lifecycle notifications
//! - [`catalog`] catalog file header and per-slot descriptor header

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod codec;
pub mod control;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod header;

pub use catalog::{
    CatalogHeader, DescriptorHeader, CATALOG_VERSION, DESCRIPTOR_HEADER_LENGTH,
    MESSAGE_HEADER_OFFSET,
};
pub use control::{
    encode_control_response, peek_correlation_id, ControlRequest, ControlResponse,
    ControlResponseCode,
};
pub use descriptor::{
    body_length, decode_descriptor_message, descriptor_message_header, encode_descriptor_body,
    encode_descriptor_message, stamp_correlation_id, stamp_stop, RecordingDescriptorView,
};
pub use error::CodecError;
pub use events::RecordingEvent;
pub use header::{MessageHeader, SCHEMA_ID, SCHEMA_VERSION};
