//! Reel: the control plane of a recording archive.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Reel sub-crates. For most users, adding `reel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use reel::prelude::*;
//! use reel::archive::LocalTransport;
//! use reel::codec::decode_descriptor_message;
//!
//! // The archive only bookkeeps; a real data plane moves the bytes.
//! struct NoDataPlane;
//! impl DataPlane for NoDataPlane {
//!     fn start_recording(&mut self, _: &str, _: i32, _: SourceLocation) -> Result<(), DataPlaneError> {
//!         Ok(())
//!     }
//!     fn stop_recording(&mut self, _: &str, _: i32) -> Result<(), DataPlaneError> {
//!         Ok(())
//!     }
//!     fn start_replay(
//!         &mut self, _: &RecordingDescriptor, _: i64, _: i64, _: &str, _: i32,
//!     ) -> Result<i64, DataPlaneError> {
//!         Ok(1)
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let transport = LocalTransport::new(64);
//! let config = ArchiveConfig {
//!     archive_dir: dir.path().to_path_buf(),
//!     ..ArchiveConfig::default()
//! };
//! let mut conductor = ArchiveConductor::launch(
//!     config,
//!     Box::new(transport.clone()),
//!     Box::new(NoDataPlane),
//!     SystemEpochClock,
//! )
//! .unwrap();
//!
//! let id = conductor
//!     .on_recording_started(NewRecording {
//!         start_position: 0,
//!         stop_position: NULL_POSITION,
//!         initial_term_id: 0,
//!         segment_file_length: 128 * 1024 * 1024,
//!         term_buffer_length: 64 * 1024,
//!         mtu_length: 1408,
//!         session_id: 6,
//!         stream_id: 1,
//!         original_channel: "aeron:ipc?tag=1".into(),
//!         stripped_channel: "aeron:ipc".into(),
//!         source_identity: "local".into(),
//!     })
//!     .unwrap();
//!
//! // A client connects and lists the catalog.
//! let mut responses = transport.subscribe("aeron:ipc", 20);
//! let mut client = transport.connect_control();
//! client
//!     .send(&ControlRequest::Connect {
//!         correlation_id: 1,
//!         response_stream_id: 20,
//!         response_channel: "aeron:ipc".into(),
//!     })
//!     .unwrap();
//! conductor.do_work();
//! let reply = ControlResponse::decode(&responses.try_recv().unwrap()).unwrap();
//! assert_eq!(reply.code, ControlResponseCode::Ok);
//!
//! client
//!     .send(&ControlRequest::ListRecordings {
//!         correlation_id: 2,
//!         from_recording_id: 0,
//!         record_count: 1,
//!     })
//!     .unwrap();
//! conductor.do_work();
//! let frame = responses.try_recv().unwrap();
//! let descriptor = decode_descriptor_message(&frame).unwrap();
//! assert_eq!(descriptor.recording_id(), id);
//! assert_eq!(descriptor.correlation_id(), 2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `reel-core` | IDs, recording descriptor, channel stripping, transport and clock traits, idle strategies |
//! | [`codec`] | `reel-codec` | Wire and catalog binary formats |
//! | [`catalog`] | `reel-catalog` | The persistent recording catalog |
//! | [`archive`] | `reel-archive` | Control sessions, listings, conductor, runner, local transport |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`reel-core`).
///
/// Contains the [`types::RecordingDescriptor`] value type, the transport
/// seams ([`types::Publication`], [`types::Image`], [`types::Transport`]),
/// the [`types::DataPlane`] seam, and the idle strategies.
pub use reel_core as types;

/// Wire and catalog binary formats (`reel-codec`).
///
/// Control requests and responses, the recording descriptor in owned and
/// zero-copy form, and recording events.
pub use reel_codec as codec;

/// The persistent recording catalog (`reel-catalog`).
///
/// [`catalog::Catalog`] can also be opened directly for offline
/// inspection or maintenance, such as invalidating recordings.
pub use reel_catalog as catalog;

/// The control plane (`reel-archive`).
///
/// [`archive::ArchiveConductor`] for a caller-driven duty cycle,
/// [`archive::ArchiveRunner`] to run it on its own thread.
pub use reel_archive as archive;

/// Common imports for typical Reel usage.
///
/// ```rust
/// use reel::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use reel_core::{
        ControlSessionId, DataPlane, EpochClock, IdleStrategy, IdleStrategyKind, Image,
        NewRecording, Publication, RecordingDescriptor, RecordingId, SourceLocation,
        SystemEpochClock, Transport, NULL_POSITION, NULL_TIMESTAMP,
    };

    // Errors
    pub use reel_core::{DataPlaneError, OfferError, TransportError};
    pub use reel_codec::CodecError;
    pub use reel_catalog::CatalogError;
    pub use reel_archive::{ArchiveError, ConfigError, ControlError};

    // Wire messages
    pub use reel_codec::{ControlRequest, ControlResponse, ControlResponseCode, RecordingEvent};

    // Catalog
    pub use reel_catalog::{Catalog, CatalogOptions, FileSyncLevel};

    // Archive
    pub use reel_archive::{
        ArchiveConductor, ArchiveConfig, ArchiveMetrics, ArchiveRunner, EventsChannel, SendPolicy,
    };
}
