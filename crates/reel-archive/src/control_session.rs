//! Per-client control protocol state machine.
//!
//! A [`ControlSession`] is created when the transport delivers a new
//! control image. It waits for a `ConnectRequest`, opens the client's
//! response publication, then serves requests until the client closes the
//! session, the image goes away, or a send fails. Each
//! [`do_work`](ControlSession::do_work) polls a bounded number of request
//! fragments and gives every active listing one batch.

use reel_catalog::CatalogError;
use reel_codec::{peek_correlation_id, CodecError, ControlRequest, ControlResponseCode};
use reel_core::{strip_channel, ControlSessionId, Image, Publication, RecordingId, SourceLocation};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::conductor::ArchiveCore;
use crate::error::ControlError;
use crate::listing::{ListingFilter, ListingSession};
use crate::proxy::ControlSessionProxy;

/// Lifecycle of a control session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Image accepted; no response channel yet.
    AwaitingConnect,
    /// Connected and serving requests.
    Active,
    /// Finished; the conductor will drop it.
    Closed,
}

/// One fragment from the control image, decoded.
enum Inbound {
    Request(ControlRequest),
    Malformed {
        correlation_id: Option<i64>,
        error: CodecError,
    },
}

/// The protocol engine for one connected client.
pub struct ControlSession {
    id: ControlSessionId,
    image: Box<dyn Image>,
    publication: Option<Box<dyn Publication>>,
    state: SessionState,
    listings: Vec<ListingSession>,
}

impl ControlSession {
    /// A session reading requests from `image`.
    pub fn new(id: ControlSessionId, image: Box<dyn Image>) -> Self {
        Self {
            id,
            image,
            publication: None,
            state: SessionState::AwaitingConnect,
            listings: Vec::new(),
        }
    }

    /// The session's id, echoed to the client on connect.
    pub fn id(&self) -> ControlSessionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the conductor should drop this session.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Listings still in progress.
    pub fn active_listings(&self) -> usize {
        self.listings.len()
    }

    /// Close the session and abort its listings.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        for listing in &mut self.listings {
            listing.abort();
        }
        self.listings.clear();
        self.publication = None;
        self.state = SessionState::Closed;
        debug!(session = self.id.0, "control session closed");
    }

    /// Poll requests, serve them, and advance listings. Returns the work done.
    pub(crate) fn do_work(&mut self, core: &mut ArchiveCore) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut inbound: SmallVec<[Inbound; 8]> = SmallVec::new();
        let limit = core.config.control_fragment_limit;
        let mut work = self.image.poll(
            &mut |fragment| {
                inbound.push(match ControlRequest::decode(fragment) {
                    Ok(request) => Inbound::Request(request),
                    Err(error) => Inbound::Malformed {
                        correlation_id: peek_correlation_id(fragment),
                        error,
                    },
                })
            },
            limit,
        );

        for message in inbound {
            if self.is_closed() {
                break;
            }
            if let Err(err) = self.on_inbound(message, core) {
                self.detach(err, core);
                return work;
            }
        }

        if self.state == SessionState::Active {
            match self.drive_listings(core) {
                Ok(sent) => work += sent,
                Err(err) => {
                    self.detach(err, core);
                    return work;
                }
            }
        }

        if !self.is_closed() && self.image.is_closed() {
            debug!(session = self.id.0, "control image closed");
            self.close();
            work += 1;
        }
        work
    }

    fn detach(&mut self, err: ControlError, core: &mut ArchiveCore) {
        warn!(session = self.id.0, %err, "closing control session");
        if matches!(
            err,
            ControlError::ChannelDown { .. } | ControlError::SendTimeout { .. }
        ) {
            core.metrics.channel_down_detaches += 1;
        }
        self.close();
    }

    fn drive_listings(&mut self, core: &mut ArchiveCore) -> Result<usize, ControlError> {
        let Some(publication) = self.publication.as_deref_mut() else {
            return Ok(0);
        };
        let mut work = 0;
        for listing in &mut self.listings {
            let before = listing.sent();
            let result = listing.do_work(&core.catalog, &mut core.proxy, publication);
            core.metrics.descriptors_sent += listing.sent() - before;
            let cycle = result?;
            if cycle.recording_unknown {
                core.metrics.recording_unknown_responses += 1;
            }
            work += cycle.work_count();
        }
        self.listings.retain(|listing| !listing.is_done());
        Ok(work)
    }

    // ── Request dispatch ────────────────────────────────────────

    fn on_inbound(&mut self, message: Inbound, core: &mut ArchiveCore) -> Result<(), ControlError> {
        match message {
            Inbound::Request(request) => {
                core.metrics.requests_received += 1;
                self.on_request(request, core)
            }
            Inbound::Malformed {
                correlation_id,
                error,
            } => {
                core.metrics.malformed_requests += 1;
                match (correlation_id, self.state) {
                    (Some(correlation_id), SessionState::Active) => {
                        self.send_error(correlation_id, &format!("malformed request: {error}"), core)
                    }
                    _ => {
                        warn!(session = self.id.0, %error, "dropping malformed request");
                        Ok(())
                    }
                }
            }
        }
    }

    fn on_request(&mut self, request: ControlRequest, core: &mut ArchiveCore) -> Result<(), ControlError> {
        if self.state == SessionState::AwaitingConnect {
            return match request {
                ControlRequest::Connect {
                    correlation_id,
                    response_stream_id,
                    response_channel,
                } => self.on_connect(correlation_id, response_stream_id, &response_channel, core),
                other => {
                    warn!(
                        session = self.id.0,
                        template_id = other.template_id(),
                        "request before connect, dropping"
                    );
                    Ok(())
                }
            };
        }

        match request {
            ControlRequest::Connect { correlation_id, .. } => {
                self.send_error(correlation_id, "session already connected", core)
            }
            ControlRequest::CloseSession { control_session_id } => {
                if control_session_id == self.id.0 {
                    self.close();
                } else {
                    warn!(
                        session = self.id.0,
                        requested = control_session_id,
                        "close request for another session, ignoring"
                    );
                }
                Ok(())
            }
            ControlRequest::StartRecording {
                correlation_id,
                stream_id,
                source_location,
                channel,
            } => self.on_start_recording(correlation_id, stream_id, source_location, &channel, core),
            ControlRequest::StopRecording {
                correlation_id,
                stream_id,
                channel,
            } => self.on_stop_recording(correlation_id, stream_id, &channel, core),
            ControlRequest::Replay {
                correlation_id,
                recording_id,
                position,
                length,
                replay_stream_id,
                replay_channel,
            } => self.on_replay(
                correlation_id,
                RecordingId(recording_id),
                position,
                length,
                &replay_channel,
                replay_stream_id,
                core,
            ),
            ControlRequest::ListRecordings {
                correlation_id,
                from_recording_id,
                record_count,
            } => self.on_list(
                correlation_id,
                from_recording_id,
                record_count,
                ListingFilter::All,
                core,
            ),
            ControlRequest::ListRecordingsForUri {
                correlation_id,
                from_recording_id,
                record_count,
                stream_id,
                channel,
            } => self.on_list(
                correlation_id,
                from_recording_id,
                record_count,
                ListingFilter::for_uri(&channel, stream_id),
                core,
            ),
        }
    }

    fn on_connect(
        &mut self,
        correlation_id: i64,
        response_stream_id: i32,
        response_channel: &str,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        match core.transport.add_publication(response_channel, response_stream_id) {
            Ok(publication) => {
                self.publication = Some(publication);
                self.state = SessionState::Active;
                core.metrics.sessions_opened += 1;
                debug!(
                    session = self.id.0,
                    channel = response_channel,
                    stream_id = response_stream_id,
                    "control session connected"
                );
                let session_id = self.id.0 as i64;
                self.send(core, |proxy, publication| {
                    proxy.send_response(
                        correlation_id,
                        session_id,
                        ControlResponseCode::Ok,
                        "",
                        publication,
                    )
                })
            }
            Err(err) => {
                warn!(session = self.id.0, %err, "cannot open response channel");
                self.close();
                Ok(())
            }
        }
    }

    fn on_start_recording(
        &mut self,
        correlation_id: i64,
        stream_id: i32,
        source_location: SourceLocation,
        channel: &str,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        let key = (strip_channel(channel), stream_id);
        if core.recording_subscriptions.contains_key(&key) {
            let message = format!("recording already active for {} stream {stream_id}", key.0);
            return self.send_error(correlation_id, &message, core);
        }
        match core
            .data_plane
            .start_recording(channel, stream_id, source_location)
        {
            Ok(()) => {
                core.recording_subscriptions.insert(key, source_location);
                self.send_ok(correlation_id, core)
            }
            Err(err) => self.send_error(correlation_id, &err.to_string(), core),
        }
    }

    fn on_stop_recording(
        &mut self,
        correlation_id: i64,
        stream_id: i32,
        channel: &str,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        let key = (strip_channel(channel), stream_id);
        if !core.recording_subscriptions.contains_key(&key) {
            let message = format!("no recording active for {} stream {stream_id}", key.0);
            return self.send_error(correlation_id, &message, core);
        }
        match core.data_plane.stop_recording(channel, stream_id) {
            Ok(()) => {
                core.recording_subscriptions.shift_remove(&key);
                self.send_ok(correlation_id, core)
            }
            Err(err) => self.send_error(correlation_id, &err.to_string(), core),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_replay(
        &mut self,
        correlation_id: i64,
        recording_id: RecordingId,
        position: i64,
        length: i64,
        replay_channel: &str,
        replay_stream_id: i32,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        if recording_id.to_relevant_id().is_none() {
            let message = format!("recording id {recording_id} out of range");
            return self.send_error(correlation_id, &message, core);
        }
        let descriptor = match core.catalog.lookup(recording_id) {
            Ok(descriptor) => descriptor,
            Err(CatalogError::UnknownRecording { .. }) => {
                core.metrics.recording_unknown_responses += 1;
                return self.send(core, |proxy, publication| {
                    proxy.send_recording_unknown(correlation_id, recording_id, publication)
                });
            }
            Err(err) => return self.send_error(correlation_id, &err.to_string(), core),
        };

        if length < 0 {
            return self.send_error(correlation_id, &format!("invalid replay length {length}"), core);
        }
        let Some(end) = position.checked_add(length) else {
            return self.send_error(correlation_id, "replay range overflows", core);
        };
        let limit = if descriptor.is_active() {
            core.recorded_position(&descriptor)
        } else {
            descriptor.stop_position
        };
        if !descriptor.contains_position(position) || end > limit {
            let message = format!(
                "replay range {position}..{end} outside recording {recording_id} \
                 [{}, {limit}]",
                descriptor.start_position
            );
            return self.send_error(correlation_id, &message, core);
        }

        match core.data_plane.start_replay(
            &descriptor,
            position,
            length,
            replay_channel,
            replay_stream_id,
        ) {
            Ok(replay_session_id) => self.send(core, |proxy, publication| {
                proxy.send_response(
                    correlation_id,
                    replay_session_id,
                    ControlResponseCode::Ok,
                    "",
                    publication,
                )
            }),
            Err(err) => self.send_error(correlation_id, &err.to_string(), core),
        }
    }

    fn on_list(
        &mut self,
        correlation_id: i64,
        from_recording_id: u64,
        record_count: i32,
        filter: ListingFilter,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        let Ok(count) = u32::try_from(record_count) else {
            return self.send_error(correlation_id, &format!("invalid record count {record_count}"), core);
        };
        if count == 0 {
            return self.send_error(correlation_id, "record count must be positive", core);
        }
        if RecordingId(from_recording_id).to_relevant_id().is_none() {
            let message = format!("from recording id {from_recording_id} out of range");
            return self.send_error(correlation_id, &message, core);
        }
        if self.listings.len() >= core.config.max_listings_per_session {
            return self.send_error(correlation_id, "too many active listings", core);
        }
        self.listings.push(ListingSession::new(
            correlation_id,
            RecordingId(from_recording_id),
            count,
            filter,
        ));
        Ok(())
    }

    // ── Replies ─────────────────────────────────────────────────

    fn send<F>(&mut self, core: &mut ArchiveCore, f: F) -> Result<(), ControlError>
    where
        F: FnOnce(&mut ControlSessionProxy, &mut dyn Publication) -> Result<usize, ControlError>,
    {
        let Some(publication) = self.publication.as_deref_mut() else {
            return Ok(());
        };
        f(&mut core.proxy, publication).map(|_| ())
    }

    fn send_ok(&mut self, correlation_id: i64, core: &mut ArchiveCore) -> Result<(), ControlError> {
        self.send(core, |proxy, publication| {
            proxy.send_ok_response(correlation_id, publication)
        })
    }

    fn send_error(
        &mut self,
        correlation_id: i64,
        message: &str,
        core: &mut ArchiveCore,
    ) -> Result<(), ControlError> {
        core.metrics.error_responses += 1;
        self.send(core, |proxy, publication| {
            proxy.send_response(correlation_id, 0, ControlResponseCode::Error, message, publication)
        })
    }
}
