//! Control plane of the Reel recording archive.
//!
//! The [`ArchiveConductor`] owns the catalog and one [`ControlSession`] per
//! connected client. Each session decodes the client's requests, answers
//! them through the shared [`ControlSessionProxy`], and runs its
//! [`ListingSession`]s one MTU-bounded batch per duty cycle, so a slow
//! client never holds the conductor for more than one batch.
//!
//! # Architecture
//!
//! - [`proxy`] encodes and sends responses with retry/idle flow control
//! - [`listing`] resumable catalog listings
//! - [`control_session`] per-client protocol state machine
//! - [`conductor`] duty cycle and recording lifecycle callbacks
//! - [`events`] best-effort recording event publication
//! - [`runner`] conductor thread
//! - [`transport`] in-process crossbeam transport

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod conductor;
pub mod config;
pub mod control_session;
pub mod error;
pub mod events;
pub mod listing;
pub mod metrics;
pub mod proxy;
pub mod runner;
pub mod transport;

pub use conductor::ArchiveConductor;
pub use config::{ArchiveConfig, ConfigError, EventsChannel};
pub use control_session::{ControlSession, SessionState};
pub use error::{ArchiveError, ControlError};
pub use events::RecordingEventsProxy;
pub use listing::{ListingCycle, ListingFilter, ListingSession, ListingState};
pub use metrics::ArchiveMetrics;
pub use proxy::{ControlSessionProxy, SendPolicy};
pub use runner::ArchiveRunner;
pub use transport::{
    ClientSendError, LocalControlClient, LocalImage, LocalPublication, LocalTransport,
    DEFAULT_MAX_PAYLOAD_LENGTH,
};
