//! [`EpochClock`] implementations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::traits::EpochClock;

/// Reads the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEpochClock;

impl EpochClock for SystemEpochClock {
    fn time_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the catalog or conductor.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start at `time_ms`.
    pub fn new(time_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(time_ms)),
        }
    }

    /// Jump to `time_ms`.
    pub fn set(&self, time_ms: i64) {
        self.now.store(time_ms, Ordering::Release);
    }

    /// Move forward by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl EpochClock for ManualClock {
    fn time_ms(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}
