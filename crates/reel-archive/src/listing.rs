//! Resumable listing of catalog descriptors.
//!
//! A [`ListingSession`] streams up to `record_count` matching descriptors
//! to one client, one batch per [`do_work`](ListingSession::do_work) call.
//! A batch stops before the descriptor that would take it past the
//! channel's maximum payload length, unless that descriptor would be the
//! first of the batch; a lone oversized descriptor is still sent. The
//! cursor is the only record of progress, so descriptors arrive in
//! strictly increasing id order with no gaps or repeats.

use reel_catalog::{Catalog, CatalogEntry};
use reel_codec::MessageHeader;
use reel_core::{strip_channel, Publication, RecordingId};

use crate::error::ControlError;
use crate::proxy::ControlSessionProxy;

/// Which recordings a listing reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingFilter {
    /// Every live recording.
    All,
    /// Live recordings on one stream of one channel.
    ForUri {
        /// Stream id, matched exactly.
        stream_id: i32,
        /// Stripped channel, matched exactly against each recording's
        /// stripped channel.
        channel: String,
    },
}

impl ListingFilter {
    /// Filter on `channel` and `stream_id`. The channel is stripped of
    /// session qualifiers first.
    pub fn for_uri(channel: &str, stream_id: i32) -> Self {
        Self::ForUri {
            stream_id,
            channel: strip_channel(channel),
        }
    }

    /// Whether `entry` passes the filter.
    pub fn matches(&self, entry: &CatalogEntry<'_>) -> bool {
        match self {
            Self::All => true,
            Self::ForUri { stream_id, channel } => entry
                .view()
                .map(|view| view.stream_id() == *stream_id && view.stripped_channel() == channel)
                .unwrap_or(false),
        }
    }
}

/// Lifecycle of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingState {
    /// No work done yet.
    NotStarted,
    /// Streaming descriptors.
    Active,
    /// Finished or aborted; never leaves this state.
    Done,
}

/// What one [`ListingSession::do_work`] call sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListingCycle {
    /// Descriptors sent.
    pub descriptors: usize,
    /// Whether the cycle ended with `RECORDING_UNKNOWN`.
    pub recording_unknown: bool,
}

impl ListingCycle {
    /// Messages sent, for duty-cycle accounting.
    pub fn work_count(&self) -> usize {
        self.descriptors + usize::from(self.recording_unknown)
    }
}

/// A cursor over the catalog serving one list request.
#[derive(Clone, Debug)]
pub struct ListingSession {
    correlation_id: i64,
    from_recording_id: RecordingId,
    cursor: RecordingId,
    remaining: u32,
    sent: u64,
    filter: ListingFilter,
    state: ListingState,
}

impl ListingSession {
    /// A listing of up to `record_count` recordings from `from_recording_id`.
    pub fn new(
        correlation_id: i64,
        from_recording_id: RecordingId,
        record_count: u32,
        filter: ListingFilter,
    ) -> Self {
        Self {
            correlation_id,
            from_recording_id,
            cursor: from_recording_id,
            remaining: record_count,
            sent: 0,
            filter,
            state: if record_count == 0 {
                ListingState::Done
            } else {
                ListingState::NotStarted
            },
        }
    }

    /// Correlation id of the request being served.
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }

    /// The first id the request asked for.
    pub fn from_recording_id(&self) -> RecordingId {
        self.from_recording_id
    }

    /// Next id the listing will examine.
    pub fn cursor(&self) -> RecordingId {
        self.cursor
    }

    /// Matches still owed to the client.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Descriptors sent so far, including any sent by a cycle that
    /// later failed.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Current state.
    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Whether the listing has nothing more to send.
    pub fn is_done(&self) -> bool {
        self.state == ListingState::Done
    }

    /// Stop without sending anything further.
    pub fn abort(&mut self) {
        self.state = ListingState::Done;
    }

    /// Send at most one MTU-bounded batch.
    ///
    /// The payload limit is read from `publication` on every call. If the
    /// requested start is past the end of the catalog, or the catalog runs
    /// out before `record_count` matches, the listing ends with
    /// `RECORDING_UNKNOWN` naming the id one past the last examined.
    pub fn do_work(
        &mut self,
        catalog: &Catalog,
        proxy: &mut ControlSessionProxy,
        publication: &mut dyn Publication,
    ) -> Result<ListingCycle, ControlError> {
        let mut cycle = ListingCycle::default();
        match self.state {
            ListingState::Done => return Ok(cycle),
            ListingState::NotStarted => {
                if self.from_recording_id >= catalog.next_recording_id() {
                    return self.finish_unknown(self.from_recording_id, proxy, publication, cycle);
                }
                self.state = ListingState::Active;
            }
            ListingState::Active => {}
        }

        let max_payload_length = publication.max_payload_length();
        let mut sent_bytes = 0usize;
        let filter = &self.filter;
        let mut matches = catalog.for_each_matching(self.cursor, |entry| filter.matches(entry));

        loop {
            let Some(entry) = matches.next() else {
                let end = matches.position();
                self.cursor = end;
                return self.finish_unknown(end, proxy, publication, cycle);
            };

            let length = entry.encoded_length() + MessageHeader::ENCODED_LENGTH;
            if cycle.descriptors > 0 && sent_bytes + length > max_payload_length {
                self.cursor = entry.recording_id();
                return Ok(cycle);
            }

            sent_bytes += proxy.send_descriptor(self.correlation_id, entry.body(), publication)?;
            cycle.descriptors += 1;
            self.sent += 1;
            self.cursor = matches.position();
            self.remaining -= 1;
            if self.remaining == 0 {
                self.state = ListingState::Done;
                return Ok(cycle);
            }
        }
    }

    fn finish_unknown(
        &mut self,
        recording_id: RecordingId,
        proxy: &mut ControlSessionProxy,
        publication: &mut dyn Publication,
        mut cycle: ListingCycle,
    ) -> Result<ListingCycle, ControlError> {
        self.state = ListingState::Done;
        proxy.send_recording_unknown(self.correlation_id, recording_id, publication)?;
        cycle.recording_unknown = true;
        Ok(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::SendPolicy;
    use reel_catalog::{CatalogOptions, FileSyncLevel};
    use reel_codec::ControlResponseCode;
    use reel_core::{BusySpinIdleStrategy, ManualClock, OfferError};
    use reel_test_utils::fixtures::{uri_listing_recordings, MATCHING_IDS};
    use reel_test_utils::{MockPublication, SentMessage};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        catalog: Catalog,
        proxy: ControlSessionProxy,
        publication: MockPublication,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut catalog = Catalog::open(
            dir.path(),
            CatalogOptions {
                file_sync_level: FileSyncLevel::None,
                ..CatalogOptions::default()
            },
            Box::new(ManualClock::new(0)),
        )
        .unwrap();
        for recording in uri_listing_recordings() {
            catalog.add_new_recording(recording).unwrap();
        }
        Fixture {
            _dir: dir,
            catalog,
            proxy: ControlSessionProxy::new(Box::new(BusySpinIdleStrategy), SendPolicy::Unbounded),
            publication: MockPublication::new("aeron:ipc", 20),
        }
    }

    fn run(f: &mut Fixture, session: &mut ListingSession) -> ListingCycle {
        session
            .do_work(&f.catalog, &mut f.proxy, &mut f.publication)
            .unwrap()
    }

    #[test]
    fn for_uri_strips_request_channel() {
        assert_eq!(
            ListingFilter::for_uri("channel?tag=f|session-id=3", 1),
            ListingFilter::ForUri {
                stream_id: 1,
                channel: "channel".into()
            }
        );
    }

    #[test]
    fn sends_matching_descriptors_in_order() {
        let mut f = fixture();
        let mut session = ListingSession::new(7, RecordingId(0), 3, ListingFilter::for_uri("channel", 1));
        let cycle = run(&mut f, &mut session);

        assert_eq!(cycle.descriptors, 3);
        assert!(!cycle.recording_unknown);
        assert!(session.is_done());
        let ids: Vec<u64> = f.publication.messages().iter().filter_map(|m| m.descriptor_id()).collect();
        assert_eq!(ids, MATCHING_IDS.to_vec());
        assert_eq!(f.publication.frames().len(), 3);
    }

    #[test]
    fn every_descriptor_echoes_correlation_id() {
        let mut f = fixture();
        let mut session = ListingSession::new(-42, RecordingId(0), 5, ListingFilter::All);
        run(&mut f, &mut session);
        for message in f.publication.messages() {
            match message {
                SentMessage::Descriptor { correlation_id, .. } => assert_eq!(correlation_id, -42),
                SentMessage::Response(r) => assert_eq!(r.correlation_id, -42),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn exhaustion_reports_one_past_last() {
        let mut f = fixture();
        let mut session = ListingSession::new(7, RecordingId(1), 5, ListingFilter::for_uri("channel", 1));
        let cycle = run(&mut f, &mut session);

        assert_eq!(cycle.descriptors, 2);
        assert!(cycle.recording_unknown);
        assert!(session.is_done());
        let messages = f.publication.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].descriptor_id(), Some(2));
        assert_eq!(messages[1].descriptor_id(), Some(4));
        let response = messages[2].as_response().unwrap();
        assert_eq!(response.code, ControlResponseCode::RecordingUnknown);
        assert_eq!(response.relevant_id, 5);
    }

    #[test]
    fn start_past_end_is_unknown() {
        let mut f = fixture();
        f.publication.set_max_payload_length(0);
        let mut session = ListingSession::new(7, RecordingId(5), 3, ListingFilter::for_uri("channel", 1));
        let cycle = run(&mut f, &mut session);

        assert_eq!(cycle, ListingCycle { descriptors: 0, recording_unknown: true });
        let response = f.publication.messages()[0].as_response().cloned().unwrap();
        assert_eq!(response.relevant_id, 5);
        assert_eq!(f.publication.frames().len(), 1);

        assert_eq!(run(&mut f, &mut session), ListingCycle::default());
        assert_eq!(f.publication.frames().len(), 1);
    }

    #[test]
    fn non_matching_stream_is_skipped() {
        let mut f = fixture();
        let mut session = ListingSession::new(7, RecordingId(0), 3, ListingFilter::for_uri("channel", 2));
        let cycle = run(&mut f, &mut session);
        assert_eq!(cycle.descriptors, 0);
        assert!(cycle.recording_unknown);
        assert_eq!(
            f.publication.messages()[0].as_response().unwrap().relevant_id,
            5
        );
    }

    #[test]
    fn batches_resume_across_cycles() {
        let mut f = fixture();
        // Room for exactly one descriptor per cycle.
        let one = {
            let entry = f.catalog.entry(RecordingId(0)).unwrap();
            entry.encoded_length() + MessageHeader::ENCODED_LENGTH
        };
        f.publication.set_max_payload_length(one + 1);

        let mut session = ListingSession::new(7, RecordingId(0), 3, ListingFilter::for_uri("channel", 1));
        for expected in MATCHING_IDS {
            let cycle = run(&mut f, &mut session);
            assert_eq!(cycle.descriptors, 1);
            let messages = f.publication.take_messages();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].descriptor_id(), Some(expected));
        }
        assert!(session.is_done());
        assert_eq!(run(&mut f, &mut session).work_count(), 0);
    }

    #[test]
    fn invalidated_entries_do_not_count() {
        let mut f = fixture();
        f.catalog.invalidate(RecordingId(2)).unwrap();
        let mut session = ListingSession::new(7, RecordingId(0), 2, ListingFilter::for_uri("channel", 1));
        run(&mut f, &mut session);
        let ids: Vec<u64> = f.publication.messages().iter().filter_map(|m| m.descriptor_id()).collect();
        assert_eq!(ids, vec![0, 4]);
        assert!(session.is_done());
    }

    #[test]
    fn channel_down_propagates_and_keeps_cursor() {
        let mut f = fixture();
        f.publication.fail_always(OfferError::Closed);
        let mut session = ListingSession::new(7, RecordingId(0), 3, ListingFilter::All);
        let err = session
            .do_work(&f.catalog, &mut f.proxy, &mut f.publication)
            .unwrap_err();
        assert!(matches!(err, ControlError::ChannelDown { .. }));
        assert_eq!(session.cursor(), RecordingId(0));
    }

    #[test]
    fn zero_count_is_done_immediately() {
        let mut f = fixture();
        let mut session = ListingSession::new(7, RecordingId(0), 0, ListingFilter::All);
        assert!(session.is_done());
        assert_eq!(run(&mut f, &mut session), ListingCycle::default());
        assert!(f.publication.frames().is_empty());
    }
}
