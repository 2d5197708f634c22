//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one recording in the catalog.
///
/// Assigned by the catalog on append: dense from zero, strictly
/// increasing, and never reused, even after the entry it names has been
/// invalidated. `RecordingId(n)` lives in catalog slot `n + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordingId(pub u64);

impl RecordingId {
    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The id as a response's signed `relevantId`, if it fits.
    pub fn to_relevant_id(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordingId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a connected client's control session.
///
/// Allocated by the conductor from a monotonic counter when a control
/// image appears, and echoed to the client as the `relevantId` of the
/// connect response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlSessionId(pub u64);

impl fmt::Display for ControlSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ControlSessionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_id_next_is_successor() {
        assert_eq!(RecordingId(0).next(), RecordingId(1));
        assert_eq!(RecordingId(41).next(), RecordingId(42));
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![RecordingId(3), RecordingId(0), RecordingId(2)];
        ids.sort();
        assert_eq!(ids, vec![RecordingId(0), RecordingId(2), RecordingId(3)]);
        assert_eq!(ControlSessionId(7).to_string(), "7");
    }

    #[test]
    fn relevant_id_rejects_ids_past_i64_max() {
        assert_eq!(RecordingId(12).to_relevant_id(), Some(12));
        assert_eq!(RecordingId(i64::MAX as u64).to_relevant_id(), Some(i64::MAX));
        assert_eq!(RecordingId(i64::MAX as u64 + 1).to_relevant_id(), None);
    }
}
