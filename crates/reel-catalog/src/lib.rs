//! Persistent recording catalog for the Reel recording archive.
//!
//! The catalog is a single file of fixed-stride slots: a header slot
//! carrying the format version and stride, then one slot per recording
//! holding its encoded descriptor. Fixed stride gives O(1) lookup by id and
//! a plain sequential scan for listings.
//!
//! Recovery on open tolerates an unclean shutdown: a trailing partial slot
//! is truncated and a slot whose header was never written is treated as
//! free. Anything else that fails validation is reported as corruption.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod iter;
pub mod options;

pub use catalog::Catalog;
pub use error::CatalogError;
pub use iter::{CatalogEntry, CatalogIter};
pub use options::{
    is_valid_entry_length, CatalogOptions, FileSyncLevel, CATALOG_FILE_NAME, DEFAULT_ENTRY_LENGTH,
    DEFAULT_MAX_ENTRIES, MAX_ENTRY_LENGTH, MIN_ENTRY_LENGTH,
};
