//! Best-effort publication of recording lifecycle events.

use reel_codec::RecordingEvent;
use reel_core::Publication;
use tracing::{debug, warn};

/// Publishes [`RecordingEvent`]s without ever stalling the conductor.
///
/// Each event gets a fixed number of offers. If none is accepted, or the
/// channel is down, the event is dropped and the caller is told so.
pub struct RecordingEventsProxy {
    publication: Box<dyn Publication>,
    attempts: usize,
    buffer: Vec<u8>,
}

impl RecordingEventsProxy {
    /// Publish on `publication`, offering each event up to `attempts` times.
    pub fn new(publication: Box<dyn Publication>, attempts: usize) -> Self {
        Self {
            publication,
            attempts: attempts.max(1),
            buffer: Vec::with_capacity(256),
        }
    }

    /// Offer `event`. Returns whether it was delivered.
    pub fn send(&mut self, event: &RecordingEvent) -> bool {
        self.buffer.clear();
        if let Err(err) = event.encode(&mut self.buffer) {
            warn!(%err, recording_id = event.recording_id().0, "cannot encode recording event");
            return false;
        }
        for _ in 0..self.attempts {
            match self.publication.offer(&self.buffer) {
                Ok(_) => return true,
                Err(err) if err.is_terminal() => {
                    debug!(%err, recording_id = event.recording_id().0, "recording events channel down");
                    return false;
                }
                Err(_) => {}
            }
        }
        debug!(
            recording_id = event.recording_id().0,
            attempts = self.attempts,
            "dropping recording event"
        );
        false
    }
}
