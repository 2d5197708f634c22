//! Archive configuration, validation, and error types.
//!
//! [`ArchiveConfig`] is the input to
//! [`ArchiveConductor::launch`](crate::ArchiveConductor::launch).
//! [`validate()`](ArchiveConfig::validate) checks it before any file or
//! channel is opened.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use reel_catalog::{is_valid_entry_length, CatalogOptions};
use reel_core::IdleStrategyKind;

use crate::proxy::SendPolicy;

// ── EventsChannel ──────────────────────────────────────────────────

/// Where recording lifecycle notifications are published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventsChannel {
    /// Channel URI.
    pub channel: String,
    /// Stream id.
    pub stream_id: i32,
}

// ── ArchiveConfig ──────────────────────────────────────────────────

/// Everything needed to start an archive.
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    /// Directory holding the catalog file. Created if missing.
    pub archive_dir: PathBuf,
    /// Catalog stride, durability, and capacity.
    pub catalog: CatalogOptions,
    /// Request fragments each control session may poll per duty cycle. Default: 10.
    pub control_fragment_limit: usize,
    /// Concurrent listings one control session may run. Default: 8.
    pub max_listings_per_session: usize,
    /// What a response send does while the client is back-pressured.
    pub send_policy: SendPolicy,
    /// Idle strategy for the duty-cycle loop and for send retries.
    pub idle_strategy: IdleStrategyKind,
    /// Publication for recording events. `None` disables them.
    pub recording_events: Option<EventsChannel>,
    /// Offers made for each event before it is dropped. Default: 3.
    pub event_offer_attempts: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("archive"),
            catalog: CatalogOptions::default(),
            control_fragment_limit: 10,
            max_listings_per_session: 8,
            send_policy: SendPolicy::default(),
            idle_strategy: IdleStrategyKind::default(),
            recording_events: None,
            event_offer_attempts: 3,
        }
    }
}

impl ArchiveConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyArchiveDir);
        }
        if !is_valid_entry_length(self.catalog.entry_length) {
            return Err(ConfigError::InvalidEntryLength {
                length: self.catalog.entry_length,
            });
        }
        if self.catalog.max_entries == 0 {
            return Err(ConfigError::ZeroMaxEntries);
        }
        if self.control_fragment_limit == 0 {
            return Err(ConfigError::ZeroFragmentLimit);
        }
        if self.max_listings_per_session == 0 {
            return Err(ConfigError::ZeroListingLimit);
        }
        if let SendPolicy::Bounded { max_attempts: 0 } = self.send_policy {
            return Err(ConfigError::ZeroSendAttempts);
        }
        if self.event_offer_attempts == 0 {
            return Err(ConfigError::ZeroEventAttempts);
        }
        if let IdleStrategyKind::Backoff {
            min_park, max_park, ..
        } = &self.idle_strategy
        {
            if min_park > max_park {
                return Err(ConfigError::InvalidIdleStrategy {
                    reason: format!("min_park {min_park:?} exceeds max_park {max_park:?}"),
                });
            }
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`ArchiveConfig::validate()`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `archive_dir` is empty.
    EmptyArchiveDir,
    /// Catalog entry length is not a power of two in the accepted range.
    InvalidEntryLength {
        /// The configured length.
        length: usize,
    },
    /// `catalog.max_entries` is zero.
    ZeroMaxEntries,
    /// `control_fragment_limit` is zero.
    ZeroFragmentLimit,
    /// `max_listings_per_session` is zero.
    ZeroListingLimit,
    /// A bounded send policy with zero attempts.
    ZeroSendAttempts,
    /// `event_offer_attempts` is zero.
    ZeroEventAttempts,
    /// The idle strategy parameters are inconsistent.
    InvalidIdleStrategy {
        /// Which parameter is wrong.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyArchiveDir => write!(f, "archive directory is empty"),
            Self::InvalidEntryLength { length } => write!(
                f,
                "catalog entry length {length} is not a power of two in [256, 65536]"
            ),
            Self::ZeroMaxEntries => write!(f, "catalog max_entries must be at least 1"),
            Self::ZeroFragmentLimit => write!(f, "control_fragment_limit must be at least 1"),
            Self::ZeroListingLimit => write!(f, "max_listings_per_session must be at least 1"),
            Self::ZeroSendAttempts => write!(f, "bounded send policy needs at least 1 attempt"),
            Self::ZeroEventAttempts => write!(f, "event_offer_attempts must be at least 1"),
            Self::InvalidIdleStrategy { reason } => write!(f, "invalid idle strategy: {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ArchiveConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = ArchiveConfig {
            control_fragment_limit: 0,
            ..ArchiveConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFragmentLimit));

        config.control_fragment_limit = 1;
        config.max_listings_per_session = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroListingLimit));

        config.max_listings_per_session = 1;
        config.send_policy = SendPolicy::Bounded { max_attempts: 0 };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSendAttempts));

        config.send_policy = SendPolicy::Bounded { max_attempts: 1 };
        config.event_offer_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroEventAttempts));
    }

    #[test]
    fn catalog_options_checked() {
        let mut config = ArchiveConfig::default();
        config.catalog.entry_length = 100;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidEntryLength { length: 100 })
        );
        config.catalog.entry_length = 512;
        config.catalog.max_entries = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxEntries));
    }

    #[test]
    fn inverted_backoff_rejected() {
        let config = ArchiveConfig {
            idle_strategy: IdleStrategyKind::Backoff {
                max_spins: 1,
                max_yields: 1,
                min_park: Duration::from_millis(5),
                max_park: Duration::from_millis(1),
            },
            ..ArchiveConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIdleStrategy { .. })
        ));
    }

    #[test]
    fn empty_dir_rejected() {
        let config = ArchiveConfig {
            archive_dir: PathBuf::new(),
            ..ArchiveConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyArchiveDir));
    }
}
