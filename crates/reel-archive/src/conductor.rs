//! The archive conductor: single-threaded owner of the catalog and every
//! control session.
//!
//! [`ArchiveConductor::do_work`] is one duty cycle. It accepts newly
//! connected control images, gives every session one turn, and drops
//! the sessions that closed. The conductor is also where the data plane
//! reports recording lifecycle, through the `on_recording_*` callbacks.
//!
//! Nothing here blocks except a response send under
//! [`SendPolicy::Unbounded`](crate::SendPolicy::Unbounded).

use indexmap::IndexMap;
use reel_catalog::{Catalog, CatalogError};
use reel_codec::RecordingEvent;
use reel_core::{
    ControlSessionId, DataPlane, EpochClock, NewRecording, RecordingDescriptor, RecordingId,
    SourceLocation, Transport,
};
use tracing::{debug, info, warn};

use crate::config::ArchiveConfig;
use crate::control_session::ControlSession;
use crate::error::ArchiveError;
use crate::events::RecordingEventsProxy;
use crate::metrics::ArchiveMetrics;
use crate::proxy::ControlSessionProxy;

/// State shared by all control sessions, lent to each in turn.
pub(crate) struct ArchiveCore {
    pub(crate) config: ArchiveConfig,
    pub(crate) catalog: Catalog,
    pub(crate) proxy: ControlSessionProxy,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) data_plane: Box<dyn DataPlane>,
    /// Active recordings requested by clients, keyed by stripped channel and stream.
    pub(crate) recording_subscriptions: IndexMap<(String, i32), SourceLocation>,
    /// Furthest position reported by each active recording.
    pub(crate) recorded_positions: IndexMap<RecordingId, i64>,
    pub(crate) events: Option<RecordingEventsProxy>,
    pub(crate) metrics: ArchiveMetrics,
    pub(crate) clock: Box<dyn EpochClock>,
}

impl ArchiveCore {
    /// How far an active recording can be replayed: its last reported
    /// position, or its start if it has reported none since launch.
    pub(crate) fn recorded_position(&self, descriptor: &RecordingDescriptor) -> i64 {
        self.recorded_positions
            .get(&descriptor.recording_id)
            .copied()
            .unwrap_or(descriptor.start_position)
    }

    fn publish_event(&mut self, event: RecordingEvent) {
        let Some(events) = self.events.as_mut() else {
            return;
        };
        if events.send(&event) {
            self.metrics.events_sent += 1;
        } else {
            self.metrics.events_dropped += 1;
        }
    }
}

/// Owns the catalog and drives every control session.
///
/// # Examples
///
/// ```no_run
/// use reel_archive::{ArchiveConductor, ArchiveConfig, LocalTransport};
/// use reel_core::SystemEpochClock;
/// # use reel_core::{DataPlane, DataPlaneError, RecordingDescriptor, SourceLocation};
/// # struct NoData;
/// # impl DataPlane for NoData {
/// #     fn start_recording(&mut self, _: &str, _: i32, _: SourceLocation) -> Result<(), DataPlaneError> { Ok(()) }
/// #     fn stop_recording(&mut self, _: &str, _: i32) -> Result<(), DataPlaneError> { Ok(()) }
/// #     fn start_replay(&mut self, _: &RecordingDescriptor, _: i64, _: i64, _: &str, _: i32) -> Result<i64, DataPlaneError> { Ok(0) }
/// # }
///
/// let transport = LocalTransport::new(64);
/// let mut conductor = ArchiveConductor::launch(
///     ArchiveConfig::default(),
///     Box::new(transport.clone()),
///     Box::new(NoData),
///     SystemEpochClock,
/// )
/// .unwrap();
/// conductor.do_work();
/// ```
pub struct ArchiveConductor {
    core: ArchiveCore,
    sessions: IndexMap<ControlSessionId, ControlSession>,
    next_session_id: u64,
}

impl ArchiveConductor {
    /// Validate `config`, open (or recover) the catalog, and create the
    /// recording events publication if one is configured.
    pub fn launch<C>(
        config: ArchiveConfig,
        mut transport: Box<dyn Transport>,
        data_plane: Box<dyn DataPlane>,
        clock: C,
    ) -> Result<Self, ArchiveError>
    where
        C: EpochClock + Clone + 'static,
    {
        config.validate()?;
        let catalog = Catalog::open(
            &config.archive_dir,
            config.catalog.clone(),
            Box::new(clock.clone()),
        )?;

        let events = match &config.recording_events {
            Some(channel) => {
                let publication = transport.add_publication(&channel.channel, channel.stream_id)?;
                Some(RecordingEventsProxy::new(
                    publication,
                    config.event_offer_attempts,
                ))
            }
            None => None,
        };

        let proxy = ControlSessionProxy::new(config.idle_strategy.build(), config.send_policy);
        info!(
            catalog = %catalog.path().display(),
            recordings = catalog.next_recording_id().0,
            "archive conductor launched"
        );

        Ok(Self {
            core: ArchiveCore {
                config,
                catalog,
                proxy,
                transport,
                data_plane,
                recording_subscriptions: IndexMap::new(),
                recorded_positions: IndexMap::new(),
                events,
                metrics: ArchiveMetrics::default(),
                clock: Box::new(clock),
            },
            sessions: IndexMap::new(),
            next_session_id: 1,
        })
    }

    /// Run one duty cycle. Returns the amount of work done; zero means
    /// the caller may idle.
    pub fn do_work(&mut self) -> usize {
        let mut work = 0;

        while let Some(image) = self.core.transport.poll_control_image() {
            let id = ControlSessionId(self.next_session_id);
            self.next_session_id += 1;
            self.sessions.insert(id, ControlSession::new(id, image));
            self.core.metrics.sessions_accepted += 1;
            debug!(session = id.0, "control image accepted");
            work += 1;
        }

        for session in self.sessions.values_mut() {
            work += session.do_work(&mut self.core);
        }

        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_closed());
        self.core.metrics.sessions_closed += (before - self.sessions.len()) as u64;

        work
    }

    // ── Recording lifecycle ─────────────────────────────────────

    /// The data plane began a recording: add it to the catalog and
    /// announce it.
    pub fn on_recording_started(
        &mut self,
        recording: NewRecording,
    ) -> Result<RecordingId, CatalogError> {
        let start_position = recording.start_position;
        let session_id = recording.session_id;
        let stream_id = recording.stream_id;
        let channel = recording.original_channel.clone();
        let source_identity = recording.source_identity.clone();

        let recording_id = self.core.catalog.add_new_recording(recording)?;
        self.core.recorded_positions.insert(recording_id, start_position);
        self.core.metrics.recordings_started += 1;
        self.core.publish_event(RecordingEvent::Started {
            recording_id,
            start_position,
            session_id,
            stream_id,
            channel,
            source_identity,
        });
        Ok(recording_id)
    }

    /// A live recording reached `position`. Replays of the recording are
    /// bounded by the furthest position reported so far.
    pub fn on_recording_progress(
        &mut self,
        recording_id: RecordingId,
        position: i64,
    ) -> Result<(), CatalogError> {
        let descriptor = self.core.catalog.lookup(recording_id)?;
        let start_position = descriptor.start_position;
        if descriptor.is_active() {
            let known = self
                .core
                .recorded_positions
                .entry(recording_id)
                .or_insert(start_position);
            *known = (*known).max(position);
        }
        self.core.publish_event(RecordingEvent::Progress {
            recording_id,
            start_position,
            position,
        });
        Ok(())
    }

    /// A recording ended at `stop_position`: stamp the stop into the
    /// catalog with the current time and announce it.
    pub fn on_recording_stopped(
        &mut self,
        recording_id: RecordingId,
        stop_position: i64,
    ) -> Result<(), CatalogError> {
        let start_position = self.core.catalog.lookup(recording_id)?.start_position;
        let now = self.core.clock.time_ms();
        self.core
            .catalog
            .update_stop(recording_id, now, stop_position)?;
        self.core.recorded_positions.shift_remove(&recording_id);
        self.core.metrics.recordings_stopped += 1;
        self.core.publish_event(RecordingEvent::Stopped {
            recording_id,
            start_position,
            stop_position,
        });
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Counters since launch.
    pub fn metrics(&self) -> &ArchiveMetrics {
        &self.core.metrics
    }

    /// Read access to the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.core.catalog
    }

    /// The configuration the conductor was launched with.
    pub fn config(&self) -> &ArchiveConfig {
        &self.core.config
    }

    /// Control sessions currently open.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// A session by id, while it is open.
    pub fn session(&self, id: ControlSessionId) -> Option<&ControlSession> {
        self.sessions.get(&id)
    }

    /// Furthest position an active recording has reported since launch.
    pub fn recorded_position(&self, recording_id: RecordingId) -> Option<i64> {
        self.core.recorded_positions.get(&recording_id).copied()
    }

    /// Recordings started by clients and not yet stopped, as
    /// `(stripped channel, stream id)`.
    pub fn active_recordings(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.core
            .recording_subscriptions
            .keys()
            .map(|(channel, stream_id)| (channel.as_str(), *stream_id))
    }

    /// Close every session and the catalog. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), CatalogError> {
        for session in self.sessions.values_mut() {
            session.close();
        }
        let closed = self.sessions.len() as u64;
        self.sessions.clear();
        self.core.metrics.sessions_closed += closed;
        if !self.core.catalog.is_closed() {
            debug!("archive conductor closing");
        }
        self.core.catalog.close().inspect_err(|err| {
            warn!(%err, "catalog close failed");
        })
    }
}

impl std::fmt::Debug for ArchiveConductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveConductor")
            .field("catalog", &self.core.catalog)
            .field("sessions", &self.sessions.len())
            .field("metrics", &self.core.metrics)
            .finish_non_exhaustive()
    }
}
