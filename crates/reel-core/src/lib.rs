//! Core types and traits for the Reel recording archive.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Reel workspace:
//! identifiers, the recording descriptor value type, channel URI
//! canonicalisation, and the seams to the message transport (publications,
//! images), idle strategies, and clocks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod clock;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod idle;
pub mod traits;

pub use channel::strip_channel;
pub use clock::{ManualClock, SystemEpochClock};
pub use descriptor::{NewRecording, RecordingDescriptor, NULL_POSITION, NULL_TIMESTAMP};
pub use error::{DataPlaneError, OfferError, TransportError};
pub use id::{ControlSessionId, RecordingId};
pub use idle::{
    BackoffIdleStrategy, BusySpinIdleStrategy, IdleStrategyKind, SleepingIdleStrategy,
    YieldingIdleStrategy,
};
pub use traits::{DataPlane, EpochClock, IdleStrategy, Image, Publication, SourceLocation, Transport};
