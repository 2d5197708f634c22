//! Cumulative control-plane counters.
//!
//! [`ArchiveMetrics`] is updated by the conductor on its own thread and
//! read back through [`ArchiveConductor::metrics`](crate::ArchiveConductor::metrics).

/// Counters since the conductor was launched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveMetrics {
    /// Control images accepted from the transport.
    pub sessions_accepted: u64,
    /// Sessions that completed the connect handshake.
    pub sessions_opened: u64,
    /// Sessions removed, for any reason.
    pub sessions_closed: u64,
    /// Requests decoded successfully.
    pub requests_received: u64,
    /// Requests that failed to decode.
    pub malformed_requests: u64,
    /// Recording descriptors sent by listings.
    pub descriptors_sent: u64,
    /// `RECORDING_UNKNOWN` responses sent.
    pub recording_unknown_responses: u64,
    /// `ERROR` responses sent.
    pub error_responses: u64,
    /// Sessions closed because their response channel failed.
    pub channel_down_detaches: u64,
    /// Recordings added to the catalog.
    pub recordings_started: u64,
    /// Recordings whose stop was written to the catalog.
    pub recordings_stopped: u64,
    /// Recording events delivered.
    pub events_sent: u64,
    /// Recording events dropped after exhausting their attempts.
    pub events_dropped: u64,
}
