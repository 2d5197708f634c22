//! Dedicated conductor thread.
//!
//! [`ArchiveRunner`] moves an [`ArchiveConductor`] onto its own thread and
//! runs the duty cycle until shut down. The conductor comes back out of
//! [`join`](ArchiveRunner::join), so callers can inspect metrics and the
//! catalog, or close it, after the thread stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::conductor::ArchiveConductor;
use crate::error::ArchiveError;

/// Handle to a conductor running on its own thread.
pub struct ArchiveRunner {
    shutdown_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<ArchiveConductor>>,
}

impl ArchiveRunner {
    /// Spawn the conductor thread. It idles with the conductor's
    /// configured idle strategy whenever a cycle does no work.
    pub fn spawn(mut conductor: ArchiveConductor) -> Result<Self, ArchiveError> {
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown_flag);
        let mut idle = conductor.config().idle_strategy.build();

        let handle = thread::Builder::new()
            .name("reel-archive".into())
            .spawn(move || {
                debug!("conductor thread started");
                while !flag.load(Ordering::Acquire) {
                    let work = conductor.do_work();
                    idle.idle_work(work);
                }
                debug!("conductor thread stopping");
                conductor
            })
            .map_err(|e| ArchiveError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            shutdown_flag,
            handle: Some(handle),
        })
    }

    /// Whether the conductor thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Ask the conductor thread to stop after its current cycle.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Release);
    }

    /// Stop the thread and take the conductor back.
    pub fn join(mut self) -> Result<ArchiveConductor, ArchiveError> {
        self.shutdown();
        let handle = self
            .handle
            .take()
            .ok_or(ArchiveError::ConductorRecoveryFailed)?;
        handle
            .join()
            .map_err(|_| ArchiveError::ConductorRecoveryFailed)
    }
}

impl Drop for ArchiveRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown();
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ArchiveRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRunner")
            .field("running", &self.is_running())
            .finish()
    }
}
