//! Error types for the catalog.

use std::fmt;
use std::io;

use reel_codec::CodecError;
use reel_core::RecordingId;

/// Errors raised by catalog operations.
///
/// The open-time variants (`IncompatibleVersion`, `InvalidEntryLength`,
/// `CorruptEntry`) are fatal to the archive. The rest are reported to the
/// caller of the failing operation.
#[derive(Debug)]
pub enum CatalogError {
    /// The catalog file could not be read, written, or synced.
    Io(io::Error),
    /// The file was written by an incompatible format version.
    IncompatibleVersion {
        /// Version in the file header.
        found: i32,
        /// Version this build understands.
        expected: i32,
    },
    /// The slot stride is not a power of two in the accepted range.
    InvalidEntryLength {
        /// The rejected stride.
        length: i64,
    },
    /// A committed slot failed validation during recovery.
    CorruptEntry {
        /// The recording the slot should hold.
        recording_id: RecordingId,
        /// What was wrong with it.
        detail: String,
    },
    /// An encoded descriptor does not fit in one slot.
    DescriptorTooLarge {
        /// Encoded body length.
        length: usize,
        /// Room available in a slot.
        max: usize,
    },
    /// The catalog already holds `max_entries` recordings.
    CatalogFull {
        /// The configured cap.
        max_entries: u64,
    },
    /// No live recording has this id.
    UnknownRecording {
        /// The id asked for.
        recording_id: RecordingId,
    },
    /// A stop position earlier than the recording's start.
    InvalidStopPosition {
        /// The recording being stopped.
        recording_id: RecordingId,
        /// Its start position.
        start_position: i64,
        /// The rejected stop position.
        stop_position: i64,
    },
    /// A stored record could not be encoded or decoded.
    Codec(CodecError),
    /// The catalog has been closed.
    Closed,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "catalog I/O error: {e}"),
            Self::IncompatibleVersion { found, expected } => {
                write!(f, "incompatible catalog version {found}, expected {expected}")
            }
            Self::InvalidEntryLength { length } => {
                write!(f, "invalid catalog entry length {length}")
            }
            Self::CorruptEntry {
                recording_id,
                detail,
            } => write!(f, "corrupt catalog entry for recording {recording_id}: {detail}"),
            Self::DescriptorTooLarge { length, max } => {
                write!(f, "descriptor of {length} bytes exceeds slot capacity {max}")
            }
            Self::CatalogFull { max_entries } => {
                write!(f, "catalog full at {max_entries} recordings")
            }
            Self::UnknownRecording { recording_id } => {
                write!(f, "unknown recording {recording_id}")
            }
            Self::InvalidStopPosition {
                recording_id,
                start_position,
                stop_position,
            } => write!(
                f,
                "stop position {stop_position} precedes start position {start_position} \
                 for recording {recording_id}"
            ),
            Self::Codec(e) => write!(f, "catalog codec error: {e}"),
            Self::Closed => write!(f, "catalog is closed"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CatalogError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for CatalogError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}
