//! Catalog configuration.

use crate::error::CatalogError;

/// Name of the catalog file inside the archive directory.
pub const CATALOG_FILE_NAME: &str = "archive.catalog";

/// Default slot stride in bytes.
pub const DEFAULT_ENTRY_LENGTH: usize = 4096;

/// Smallest accepted slot stride.
pub const MIN_ENTRY_LENGTH: usize = 256;

/// Largest accepted slot stride.
pub const MAX_ENTRY_LENGTH: usize = 65536;

/// Default cap on the number of recordings.
pub const DEFAULT_MAX_ENTRIES: u64 = 1 << 20;

/// How hard the catalog pushes each mutation to stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileSyncLevel {
    /// Leave flushing to the OS.
    None,
    /// `sync_data` after every mutation.
    #[default]
    Data,
    /// `sync_all` after every mutation, file metadata included.
    Metadata,
}

/// Options for [`Catalog::open`](crate::Catalog::open).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Slot stride for a new file. An existing file keeps its own stride.
    pub entry_length: usize,
    /// Durability of each mutation.
    pub file_sync_level: FileSyncLevel,
    /// Appends beyond this many recordings fail with
    /// [`CatalogError::CatalogFull`].
    pub max_entries: u64,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            entry_length: DEFAULT_ENTRY_LENGTH,
            file_sync_level: FileSyncLevel::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CatalogOptions {
    /// Check the options before any file is touched.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !is_valid_entry_length(self.entry_length) {
            return Err(CatalogError::InvalidEntryLength {
                length: self.entry_length as i64,
            });
        }
        Ok(())
    }
}

/// Whether `length` is a power of two within the accepted stride range.
pub fn is_valid_entry_length(length: usize) -> bool {
    length.is_power_of_two() && (MIN_ENTRY_LENGTH..=MAX_ENTRY_LENGTH).contains(&length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CatalogOptions::default().validate().is_ok());
    }

    #[test]
    fn entry_length_bounds() {
        assert!(is_valid_entry_length(256));
        assert!(is_valid_entry_length(65536));
        assert!(!is_valid_entry_length(128));
        assert!(!is_valid_entry_length(131072));
        assert!(!is_valid_entry_length(3000));
        assert!(!is_valid_entry_length(0));
    }
}
