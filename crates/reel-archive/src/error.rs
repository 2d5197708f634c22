//! Error types for the control plane.

use std::error::Error;
use std::fmt;

use reel_catalog::CatalogError;
use reel_codec::CodecError;
use reel_core::{OfferError, TransportError};

use crate::config::ConfigError;

// ── ControlError ───────────────────────────────────────────────────

/// A failure that ends one control session.
///
/// None of these can be reported to the client: either its channel is
/// unusable or the archive could not build the reply. The owning control
/// session is closed and the conductor carries on.
#[derive(Debug)]
pub enum ControlError {
    /// The response channel reported a terminal state.
    ChannelDown {
        /// Channel of the response publication.
        channel: String,
        /// Stream id of the response publication.
        stream_id: i32,
        /// What the publication reported.
        cause: OfferError,
    },
    /// A bounded send policy ran out of attempts.
    SendTimeout {
        /// Offers made before giving up.
        attempts: usize,
    },
    /// A response could not be encoded.
    Codec(CodecError),
    /// A catalog read failed while serving the session.
    Catalog(CatalogError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelDown {
                channel,
                stream_id,
                cause,
            } => write!(f, "response channel is down: {channel} stream {stream_id} ({cause})"),
            Self::SendTimeout { attempts } => {
                write!(f, "response not accepted after {attempts} attempts")
            }
            Self::Codec(e) => write!(f, "response encoding failed: {e}"),
            Self::Catalog(e) => write!(f, "catalog error: {e}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ChannelDown { cause, .. } => Some(cause),
            Self::Codec(e) => Some(e),
            Self::Catalog(e) => Some(e),
            Self::SendTimeout { .. } => None,
        }
    }
}

impl From<CodecError> for ControlError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<CatalogError> for ControlError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

// ── ArchiveError ───────────────────────────────────────────────────

/// Errors that stop the archive from starting or from running.
#[derive(Debug)]
pub enum ArchiveError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// The catalog could not be opened or recovered.
    Catalog(CatalogError),
    /// The recording events publication could not be created.
    Transport(TransportError),
    /// The conductor thread could not be spawned.
    ThreadSpawnFailed {
        /// The OS error text.
        reason: String,
    },
    /// The conductor could not be recovered from its thread (it panicked).
    ConductorRecoveryFailed,
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid archive config: {e}"),
            Self::Catalog(e) => write!(f, "catalog failure: {e}"),
            Self::Transport(e) => write!(f, "transport failure: {e}"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn conductor thread: {reason}")
            }
            Self::ConductorRecoveryFailed => {
                write!(f, "conductor could not be recovered from its thread")
            }
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Catalog(e) => Some(e),
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ArchiveError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CatalogError> for ArchiveError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<TransportError> for ArchiveError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
