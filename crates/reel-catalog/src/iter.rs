//! Raw slot views and the resumable catalog iterator.

use reel_codec::{CodecError, DescriptorHeader, RecordingDescriptorView, DESCRIPTOR_HEADER_LENGTH};
use reel_core::RecordingId;

/// A borrowed view of one committed catalog slot.
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry<'a> {
    recording_id: RecordingId,
    header: DescriptorHeader,
    slot: &'a [u8],
}

impl<'a> CatalogEntry<'a> {
    pub(crate) fn new(recording_id: RecordingId, header: DescriptorHeader, slot: &'a [u8]) -> Self {
        Self {
            recording_id,
            header,
            slot,
        }
    }

    /// Id of the recording in this slot.
    pub fn recording_id(&self) -> RecordingId {
        self.recording_id
    }

    /// Whether the entry is live.
    pub fn is_valid(&self) -> bool {
        self.header.is_valid()
    }

    /// The encoded descriptor body, exactly `length` bytes.
    pub fn body(&self) -> &'a [u8] {
        let end = DESCRIPTOR_HEADER_LENGTH + self.header.length.max(0) as usize;
        self.slot
            .get(DESCRIPTOR_HEADER_LENGTH..end)
            .unwrap_or_default()
    }

    /// Length of the encoded body.
    pub fn encoded_length(&self) -> usize {
        self.body().len()
    }

    /// The whole fixed-stride slot, header included.
    pub fn slot(&self) -> &'a [u8] {
        self.slot
    }

    /// Decode the body without copying.
    pub fn view(&self) -> Result<RecordingDescriptorView<'a>, CodecError> {
        RecordingDescriptorView::decode_body(self.body())
    }
}

/// Lazy walk over live catalog entries in increasing id order.
///
/// Returned by [`Catalog::for_each_matching`](crate::Catalog::for_each_matching).
/// Invalidated entries and entries rejected by the predicate are skipped.
/// [`position`](Self::position) is the next id the iterator would examine,
/// so a caller can stop early and later resume from exactly that point.
pub struct CatalogIter<'a, P> {
    slots: &'a [u8],
    entry_length: usize,
    next: u64,
    end: u64,
    predicate: P,
}

impl<'a, P> CatalogIter<'a, P>
where
    P: FnMut(&CatalogEntry<'a>) -> bool,
{
    pub(crate) fn new(
        slots: &'a [u8],
        entry_length: usize,
        from: RecordingId,
        end: RecordingId,
        predicate: P,
    ) -> Self {
        Self {
            slots,
            entry_length,
            next: from.0,
            end: end.0,
            predicate,
        }
    }

    /// The next recording id this iterator would examine.
    pub fn position(&self) -> RecordingId {
        RecordingId(self.next)
    }
}

impl<'a, P> Iterator for CatalogIter<'a, P>
where
    P: FnMut(&CatalogEntry<'a>) -> bool,
{
    type Item = CatalogEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let recording_id = RecordingId(self.next);
            self.next += 1;
            let Some(entry) = slot_entry(self.slots, self.entry_length, recording_id) else {
                continue;
            };
            if entry.is_valid() && (self.predicate)(&entry) {
                return Some(entry);
            }
        }
        None
    }
}

/// Locate the slot for `recording_id` in a mirror that starts with the
/// header slot.
pub(crate) fn slot_entry(
    slots: &[u8],
    entry_length: usize,
    recording_id: RecordingId,
) -> Option<CatalogEntry<'_>> {
    let index = usize::try_from(recording_id.0).ok()?.checked_add(1)?;
    let start = index.checked_mul(entry_length)?;
    let slot = slots.get(start..start.checked_add(entry_length)?)?;
    let header = DescriptorHeader::decode(slot).ok()?;
    if header.length <= 0 {
        return None;
    }
    Some(CatalogEntry::new(recording_id, header, slot))
}
