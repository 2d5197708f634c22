//! Seams to the collaborators the archive consumes but does not implement:
//! the message transport, the idle/backoff policy, the wall clock, and the
//! data plane that moves recorded bytes.

use crate::descriptor::RecordingDescriptor;
use crate::error::{DataPlaneError, OfferError, TransportError};

/// A non-blocking outbound message channel.
///
/// `offer` never blocks: it either accepts the whole message and returns the
/// new stream position, or reports why it could not.
pub trait Publication: Send {
    /// Try to send one message.
    fn offer(&mut self, buffer: &[u8]) -> Result<u64, OfferError>;

    /// Largest message, in bytes, the channel accepts in one offer.
    ///
    /// A transport property that may change over the channel's lifetime,
    /// so callers query it fresh rather than caching it.
    fn max_payload_length(&self) -> usize;

    /// Channel URI this publication sends on.
    fn channel(&self) -> &str;

    /// Stream id this publication sends on.
    fn stream_id(&self) -> i32;
}

/// An inbound message stream from one remote publisher.
pub trait Image: Send {
    /// Deliver up to `fragment_limit` available messages to `handler`.
    ///
    /// Returns the number of messages delivered. Never blocks.
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8]), fragment_limit: usize) -> usize;

    /// Whether the remote publisher has gone away and no data remains.
    fn is_closed(&self) -> bool;
}

/// The message transport as seen by the archive conductor.
pub trait Transport: Send {
    /// Create an outbound publication to `channel`/`stream_id`.
    fn add_publication(
        &mut self,
        channel: &str,
        stream_id: i32,
    ) -> Result<Box<dyn Publication>, TransportError>;

    /// Take the next newly connected control-request image, if any.
    fn poll_control_image(&mut self) -> Option<Box<dyn Image>>;
}

/// What a duty-cycle loop does when there is nothing to do.
pub trait IdleStrategy: Send {
    /// Called after a cycle that did no work.
    fn idle(&mut self);

    /// Called after a cycle that did work, restarting any backoff.
    fn reset(&mut self);

    /// Idle or reset depending on how much work the last cycle did.
    fn idle_work(&mut self, work_count: usize) {
        if work_count > 0 {
            self.reset();
        } else {
            self.idle();
        }
    }
}

/// Source of wall-clock time in epoch milliseconds.
pub trait EpochClock: Send {
    /// Current time in milliseconds since the Unix epoch.
    fn time_ms(&self) -> i64;
}

/// Where a stream to be recorded originates relative to the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceLocation {
    /// Published on the same host (IPC or local spy).
    Local,
    /// Published by a remote host.
    Remote,
}

/// The data plane that subscribes to recorded streams, writes segment files,
/// and serves replays.
///
/// The archive only bookkeeps: it forwards control requests here and is
/// told about recording lifecycle through the conductor's
/// `on_recording_*` callbacks. A [`DataPlaneError`] is relayed to the
/// requesting client as an `ERROR` response carrying its text.
pub trait DataPlane: Send {
    /// Begin recording `channel`/`stream_id`.
    fn start_recording(
        &mut self,
        channel: &str,
        stream_id: i32,
        source: SourceLocation,
    ) -> Result<(), DataPlaneError>;

    /// Stop recording `channel`/`stream_id`.
    fn stop_recording(&mut self, channel: &str, stream_id: i32) -> Result<(), DataPlaneError>;

    /// Replay `length` bytes of `recording` from `position` onto
    /// `replay_channel`/`replay_stream_id`, returning a replay session id.
    fn start_replay(
        &mut self,
        recording: &RecordingDescriptor,
        position: i64,
        length: i64,
        replay_channel: &str,
        replay_stream_id: i32,
    ) -> Result<i64, DataPlaneError>;
}
