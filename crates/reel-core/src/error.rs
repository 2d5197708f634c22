//! Error types at the transport and data-plane seams.

use std::error::Error;
use std::fmt;

/// Why a non-blocking [`Publication::offer`](crate::Publication::offer) did
/// not accept a message.
///
/// [`BackPressured`](Self::BackPressured) and
/// [`AdminAction`](Self::AdminAction) are transient: the caller may retry.
/// [`NotConnected`](Self::NotConnected) and [`Closed`](Self::Closed) are
/// terminal for a control-plane reply channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferError {
    /// The subscriber is not keeping up; retry later.
    BackPressured,
    /// The transport is busy with an administrative action; retry.
    AdminAction,
    /// No subscriber is connected.
    NotConnected,
    /// The publication has been closed.
    Closed,
}

impl OfferError {
    /// Whether retrying the offer can ever succeed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NotConnected | Self::Closed)
    }
}

impl fmt::Display for OfferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackPressured => write!(f, "back pressured"),
            Self::AdminAction => write!(f, "admin action in progress"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Closed => write!(f, "publication closed"),
        }
    }
}

impl Error for OfferError {}

/// Failures reported by a [`Transport`](crate::Transport) when creating
/// a publication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The channel URI could not be used.
    InvalidChannel {
        /// The offending channel.
        channel: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The transport has shut down.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel { channel, reason } => {
                write!(f, "invalid channel '{channel}': {reason}")
            }
            Self::Closed => write!(f, "transport closed"),
        }
    }
}

impl Error for TransportError {}

/// Failures reported by a [`DataPlane`](crate::DataPlane).
///
/// The `Display` text is relayed to the requesting client as the error
/// message of its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataPlaneError {
    /// The data plane refused the request.
    Rejected {
        /// Why, in words fit for the client.
        reason: String,
    },
    /// The data plane has shut down.
    Closed,
}

impl DataPlaneError {
    /// A refusal with `reason`.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DataPlaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "{reason}"),
            Self::Closed => write!(f, "data plane closed"),
        }
    }
}

impl Error for DataPlaneError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_disconnect_and_close_are_terminal() {
        assert!(!OfferError::BackPressured.is_terminal());
        assert!(!OfferError::AdminAction.is_terminal());
        assert!(OfferError::NotConnected.is_terminal());
        assert!(OfferError::Closed.is_terminal());
    }

    #[test]
    fn data_plane_rejection_displays_reason_verbatim() {
        assert_eq!(
            DataPlaneError::rejected("no such interface").to_string(),
            "no such interface"
        );
        assert_eq!(DataPlaneError::Closed.to_string(), "data plane closed");
    }
}
