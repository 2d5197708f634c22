//! The persistent recording catalog.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use reel_codec::descriptor::offset;
use reel_codec::{
    body_length, encode_descriptor_body, stamp_stop, CatalogHeader, DescriptorHeader, CATALOG_VERSION,
    DESCRIPTOR_HEADER_LENGTH,
};
use reel_core::{EpochClock, NewRecording, RecordingDescriptor, RecordingId};
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::iter::{slot_entry, CatalogEntry, CatalogIter};
use crate::options::{is_valid_entry_length, CatalogOptions, FileSyncLevel, CATALOG_FILE_NAME};

/// Durable index of recordings, one fixed-stride slot per recording.
///
/// Slot 0 holds the [`CatalogHeader`]; recording `k` lives in slot `k + 1`,
/// so a lookup is a single offset computation. Every slot is mirrored in
/// memory: reads are served from the mirror and take `&self`, mutations
/// write through to the file and take `&mut self`. The archive conductor
/// is the only writer.
///
/// Ids are dense from zero, strictly increasing, and never reused:
/// [`invalidate`](Self::invalidate) only clears a slot's `valid` flag.
///
/// # Examples
///
/// ```no_run
/// use reel_catalog::{Catalog, CatalogOptions};
/// use reel_core::{NewRecording, SystemEpochClock, NULL_POSITION};
///
/// let mut catalog = Catalog::open(
///     "/tmp/archive",
///     CatalogOptions::default(),
///     Box::new(SystemEpochClock),
/// )
/// .unwrap();
/// let id = catalog
///     .add_new_recording(NewRecording {
///         start_position: 0,
///         stop_position: NULL_POSITION,
///         initial_term_id: 0,
///         segment_file_length: 128 * 1024 * 1024,
///         term_buffer_length: 64 * 1024,
///         mtu_length: 1408,
///         session_id: 6,
///         stream_id: 1,
///         original_channel: "aeron:ipc?tag=7".into(),
///         stripped_channel: "aeron:ipc".into(),
///         source_identity: "aeron:ipc".into(),
///     })
///     .unwrap();
/// assert_eq!(catalog.lookup(id).unwrap().stream_id, 1);
/// ```
pub struct Catalog {
    path: PathBuf,
    file: Option<File>,
    entry_length: usize,
    file_sync_level: FileSyncLevel,
    max_entries: u64,
    slots: Vec<u8>,
    next_recording_id: RecordingId,
    clock: Box<dyn EpochClock>,
}

impl Catalog {
    /// Open the catalog in `dir`, creating the directory and file if needed.
    ///
    /// A new file gets a header with `options.entry_length`. An existing
    /// file is validated and recovered: its stored stride wins over the
    /// requested one, a trailing partial slot is truncated, and the scan
    /// stops at the first slot that was never committed.
    pub fn open(
        dir: impl AsRef<Path>,
        options: CatalogOptions,
        clock: Box<dyn EpochClock>,
    ) -> Result<Self, CatalogError> {
        options.validate()?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(CATALOG_FILE_NAME);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let (entry_length, slots, count) = if bytes.is_empty() {
            let slots = create_header_slot(&mut file, options.entry_length)?;
            debug!(path = %path.display(), entry_length = options.entry_length, "created catalog");
            (options.entry_length, slots, 0)
        } else {
            recover(&mut file, &path, bytes, options.entry_length)?
        };

        Ok(Self {
            path,
            file: Some(file),
            entry_length,
            file_sync_level: options.file_sync_level,
            max_entries: options.max_entries,
            slots,
            next_recording_id: RecordingId(count),
            clock,
        })
    }

    // ── Writes ──────────────────────────────────────────────────

    /// Append a recording and return its newly allocated id.
    ///
    /// The start timestamp comes from the catalog's clock and the stop
    /// timestamp is null. The body is written and synced before the slot
    /// header, so a crash in between leaves a slot that recovery treats as
    /// free. Without a sync level the OS may reorder the two writes; a torn
    /// last slot is then discarded on recovery.
    pub fn add_new_recording(&mut self, recording: NewRecording) -> Result<RecordingId, CatalogError> {
        self.ensure_open()?;
        if self.next_recording_id.0 >= self.max_entries {
            return Err(CatalogError::CatalogFull {
                max_entries: self.max_entries,
            });
        }

        let recording_id = self.next_recording_id;
        let descriptor = recording.into_descriptor(recording_id, self.clock.time_ms());

        let mut slot = vec![0u8; self.entry_length];
        let mut body = Vec::new();
        encode_descriptor_body(&mut body, 0, &descriptor)?;
        let max = self.max_descriptor_length();
        if body.len() > max {
            return Err(CatalogError::DescriptorTooLarge {
                length: body.len(),
                max,
            });
        }
        slot[DESCRIPTOR_HEADER_LENGTH..DESCRIPTOR_HEADER_LENGTH + body.len()]
            .copy_from_slice(&body);

        let slot_offset = self.slot_offset(recording_id);
        self.write_at(slot_offset, &slot)?;
        self.sync()?;

        DescriptorHeader {
            length: body.len() as i32,
            valid: 1,
        }
        .encode_into(&mut slot)?;
        self.write_at(slot_offset, &slot[..DESCRIPTOR_HEADER_LENGTH])?;
        self.sync()?;

        self.slots.extend_from_slice(&slot);
        self.next_recording_id = recording_id.next();
        debug!(
            recording_id = recording_id.0,
            stream_id = descriptor.stream_id,
            channel = %descriptor.stripped_channel,
            "added recording"
        );
        Ok(recording_id)
    }

    /// Record that a recording has stopped.
    pub fn update_stop(
        &mut self,
        recording_id: RecordingId,
        stop_timestamp: i64,
        stop_position: i64,
    ) -> Result<(), CatalogError> {
        self.ensure_open()?;
        let start_position = self.live_entry(recording_id)?.view()?.start_position();
        if stop_position < start_position {
            return Err(CatalogError::InvalidStopPosition {
                recording_id,
                start_position,
                stop_position,
            });
        }

        // The mirror only changes once the file has the new fields.
        let body_start = self.slot_offset(recording_id) as usize + DESCRIPTOR_HEADER_LENGTH;
        let mut fixed = self.slots[body_start..body_start + offset::STOP_POSITION + 8].to_vec();
        stamp_stop(&mut fixed, stop_timestamp, stop_position)?;
        let patch = &fixed[offset::STOP_TIMESTAMP..];

        let from = body_start + offset::STOP_TIMESTAMP;
        self.write_at(from as u64, patch)?;
        self.sync()?;
        self.slots[from..from + patch.len()].copy_from_slice(patch);
        debug!(recording_id = recording_id.0, stop_position, "recording stopped");
        Ok(())
    }

    /// Mark a recording as deleted. Its id is never reused.
    pub fn invalidate(&mut self, recording_id: RecordingId) -> Result<(), CatalogError> {
        self.ensure_open()?;
        self.live_entry(recording_id)?;

        let slot_start = self.slot_offset(recording_id) as usize;
        let mut header = self.slots[slot_start..slot_start + DESCRIPTOR_HEADER_LENGTH].to_vec();
        DescriptorHeader::set_valid(&mut header, false)?;
        self.write_at(slot_start as u64, &header)?;
        self.sync()?;
        self.slots[slot_start..slot_start + DESCRIPTOR_HEADER_LENGTH].copy_from_slice(&header);
        debug!(recording_id = recording_id.0, "invalidated recording");
        Ok(())
    }

    /// Flush and release the file. Later calls do nothing.
    pub fn close(&mut self) -> Result<(), CatalogError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!(path = %self.path.display(), recordings = self.next_recording_id.0, "closed catalog");
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Decode the live recording with this id.
    pub fn lookup(&self, recording_id: RecordingId) -> Result<RecordingDescriptor, CatalogError> {
        self.ensure_open()?;
        Ok(self.live_entry(recording_id)?.view()?.to_descriptor())
    }

    /// The committed slot for this id, live or invalidated.
    pub fn entry(&self, recording_id: RecordingId) -> Option<CatalogEntry<'_>> {
        slot_entry(&self.slots, self.entry_length, recording_id)
    }

    /// Live entries from `from` onward, in increasing id order, for which
    /// `predicate` holds.
    ///
    /// The walk is bounded by the ids allocated when it was created.
    pub fn for_each_matching<'a, P>(&'a self, from: RecordingId, predicate: P) -> CatalogIter<'a, P>
    where
        P: FnMut(&CatalogEntry<'a>) -> bool,
    {
        CatalogIter::new(
            &self.slots,
            self.entry_length,
            from,
            self.next_recording_id,
            predicate,
        )
    }

    /// The id the next append will receive.
    pub fn next_recording_id(&self) -> RecordingId {
        self.next_recording_id
    }

    /// Number of live recordings.
    pub fn count_valid(&self) -> u64 {
        self.for_each_matching(RecordingId(0), |_| true).count() as u64
    }

    /// Slot stride in bytes.
    pub fn entry_length(&self) -> usize {
        self.entry_length
    }

    /// Largest encoded descriptor body a slot can hold.
    pub fn max_descriptor_length(&self) -> usize {
        self.entry_length - DESCRIPTOR_HEADER_LENGTH
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    // ── Internals ───────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), CatalogError> {
        if self.file.is_none() {
            return Err(CatalogError::Closed);
        }
        Ok(())
    }

    fn live_entry(&self, recording_id: RecordingId) -> Result<CatalogEntry<'_>, CatalogError> {
        match self.entry(recording_id) {
            Some(entry) if entry.is_valid() => Ok(entry),
            _ => Err(CatalogError::UnknownRecording { recording_id }),
        }
    }

    fn slot_offset(&self, recording_id: RecordingId) -> u64 {
        (recording_id.0 + 1) * self.entry_length as u64
    }

    fn write_at(&mut self, position: u64, bytes: &[u8]) -> Result<(), CatalogError> {
        let file = self.file.as_mut().ok_or(CatalogError::Closed)?;
        file.seek(SeekFrom::Start(position))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn sync(&self) -> Result<(), CatalogError> {
        let file = self.file.as_ref().ok_or(CatalogError::Closed)?;
        match self.file_sync_level {
            FileSyncLevel::None => {}
            FileSyncLevel::Data => file.sync_data()?,
            FileSyncLevel::Metadata => file.sync_all()?,
        }
        Ok(())
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(?err, "failed to close catalog");
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.path)
            .field("entry_length", &self.entry_length)
            .field("next_recording_id", &self.next_recording_id)
            .field("closed", &self.file.is_none())
            .finish()
    }
}

// ── Open and recovery ───────────────────────────────────────────

fn create_header_slot(file: &mut File, entry_length: usize) -> Result<Vec<u8>, CatalogError> {
    let mut slot = vec![0u8; entry_length];
    CatalogHeader::new(entry_length as i32).encode_into(&mut slot)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&slot)?;
    file.sync_all()?;
    Ok(slot)
}

/// Validate an existing file and rebuild the mirror from it.
///
/// Returns the stride, the mirror, and the number of committed recordings.
fn recover(
    file: &mut File,
    path: &Path,
    mut bytes: Vec<u8>,
    requested_entry_length: usize,
) -> Result<(usize, Vec<u8>, u64), CatalogError> {
    let header = CatalogHeader::decode(&bytes)?;
    if header.version != CATALOG_VERSION {
        return Err(CatalogError::IncompatibleVersion {
            found: header.version,
            expected: CATALOG_VERSION,
        });
    }
    let entry_length = usize::try_from(header.entry_length)
        .ok()
        .filter(|&length| is_valid_entry_length(length))
        .ok_or(CatalogError::InvalidEntryLength {
            length: header.entry_length as i64,
        })?;
    if entry_length != requested_entry_length {
        debug!(
            stored = entry_length,
            requested = requested_entry_length,
            "existing catalog keeps its stored entry length"
        );
    }

    // A header slot cut short keeps its header fields; pad it back out.
    if bytes.len() < entry_length {
        warn!(path = %path.display(), len = bytes.len(), "header slot is short, padding");
        bytes.resize(entry_length, 0);
        file.set_len(entry_length as u64)?;
        file.sync_all()?;
    }

    let partial = bytes.len() % entry_length;
    if partial != 0 {
        warn!(
            path = %path.display(),
            invalid_len = bytes.len(),
            "catalog len is not a multiple of entry length, truncating"
        );
        bytes.truncate(bytes.len() - partial);
    }

    let slot_count = bytes.len() / entry_length;
    let mut committed = 0u64;
    for index in 1..slot_count {
        let recording_id = RecordingId(committed);
        let slot = &bytes[index * entry_length..(index + 1) * entry_length];
        let slot_header = DescriptorHeader::decode(slot)?;
        if slot_header.length == 0 {
            break;
        }
        check_length(slot_header, entry_length, recording_id)?;
        if let Err(detail) = check_body(slot, slot_header, recording_id) {
            let next_committed = match bytes.get((index + 1) * entry_length..) {
                Some(rest) if !rest.is_empty() => DescriptorHeader::decode(rest)?.length != 0,
                _ => false,
            };
            if next_committed {
                return Err(CatalogError::CorruptEntry {
                    recording_id,
                    detail,
                });
            }
            // Header reached the disk before the body: the append never completed.
            warn!(
                path = %path.display(),
                recording_id = recording_id.0,
                %detail,
                "discarding torn append"
            );
            break;
        }
        committed += 1;
    }

    let committed_len = (committed as usize + 1) * entry_length;
    if committed_len < bytes.len() {
        warn!(
            path = %path.display(),
            recordings = committed,
            dropped_bytes = bytes.len() - committed_len,
            "discarding uncommitted catalog slots"
        );
        bytes.truncate(committed_len);
    }
    if partial != 0 || committed_len as u64 != file.metadata()?.len() {
        file.set_len(committed_len as u64)?;
        file.sync_all()?;
    }

    debug!(
        path = %path.display(),
        entry_length,
        recordings = committed,
        "recovered catalog"
    );
    Ok((entry_length, bytes, committed))
}

fn check_length(
    header: DescriptorHeader,
    entry_length: usize,
    recording_id: RecordingId,
) -> Result<(), CatalogError> {
    let max = entry_length - DESCRIPTOR_HEADER_LENGTH;
    if header.length < 0 || header.length as usize > max {
        return Err(CatalogError::CorruptEntry {
            recording_id,
            detail: format!("length {} outside 1..={max}", header.length),
        });
    }
    Ok(())
}

/// Whether the body decodes to this slot's recording at the length the
/// header claims.
fn check_body(slot: &[u8], header: DescriptorHeader, recording_id: RecordingId) -> Result<(), String> {
    let entry = CatalogEntry::new(recording_id, header, slot);
    let view = entry.view().map_err(|e| e.to_string())?;
    if view.recording_id() != recording_id {
        return Err(format!("slot holds recording {}", view.recording_id()));
    }
    let decoded = body_length(&view.to_descriptor());
    if decoded != header.length as usize {
        return Err(format!(
            "body decodes to {decoded} bytes, header says {}",
            header.length
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{ManualClock, NULL_POSITION, NULL_TIMESTAMP};
    use reel_test_utils::fixtures::new_recording;
    use tempfile::TempDir;

    fn catalog_with_two(dir: &TempDir) -> Catalog {
        let options = CatalogOptions {
            entry_length: 1024,
            file_sync_level: FileSyncLevel::None,
            ..CatalogOptions::default()
        };
        let mut catalog = Catalog::open(dir.path(), options, Box::new(ManualClock::new(5))).unwrap();
        catalog.add_new_recording(new_recording(1, 1, "a", "a", "s")).unwrap();
        catalog.add_new_recording(new_recording(2, 1, "b", "b", "s")).unwrap();
        catalog
    }

    /// Swap in a handle the OS refuses to write through.
    fn make_unwritable(catalog: &mut Catalog) {
        let read_only = File::open(&catalog.path).unwrap();
        catalog.file = Some(read_only);
    }

    #[test]
    fn failed_update_stop_leaves_mirror_untouched() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_with_two(&dir);
        make_unwritable(&mut catalog);

        let result = catalog.update_stop(RecordingId(1), 900, 4096);
        assert!(matches!(result, Err(CatalogError::Io(_))));

        let descriptor = catalog.lookup(RecordingId(1)).unwrap();
        assert_eq!(descriptor.stop_timestamp, NULL_TIMESTAMP);
        assert_eq!(descriptor.stop_position, NULL_POSITION);
        assert!(descriptor.is_active());
    }

    #[test]
    fn failed_invalidate_leaves_recording_live() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_with_two(&dir);
        make_unwritable(&mut catalog);

        assert!(matches!(
            catalog.invalidate(RecordingId(0)),
            Err(CatalogError::Io(_))
        ));
        assert!(catalog.lookup(RecordingId(0)).is_ok());
        assert_eq!(catalog.count_valid(), 2);
    }

    #[test]
    fn failed_append_allocates_no_id() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_with_two(&dir);
        make_unwritable(&mut catalog);

        assert!(catalog
            .add_new_recording(new_recording(3, 1, "c", "c", "s"))
            .is_err());
        assert_eq!(catalog.next_recording_id(), RecordingId(2));
        assert!(catalog.entry(RecordingId(2)).is_none());
    }
}
