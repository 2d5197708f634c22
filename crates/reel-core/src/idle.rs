//! Idle strategies for duty-cycle loops and send retries.
//!
//! None of these block on I/O; the most they do is park the calling thread
//! for a bounded period.

use std::thread;
use std::time::Duration;

use crate::traits::IdleStrategy;

/// Spin without yielding. Lowest latency, burns a core.
#[derive(Clone, Debug, Default)]
pub struct BusySpinIdleStrategy;

impl IdleStrategy for BusySpinIdleStrategy {
    fn idle(&mut self) {
        std::hint::spin_loop();
    }

    fn reset(&mut self) {}
}

/// Yield the thread to the scheduler on every idle call.
#[derive(Clone, Debug, Default)]
pub struct YieldingIdleStrategy;

impl IdleStrategy for YieldingIdleStrategy {
    fn idle(&mut self) {
        thread::yield_now();
    }

    fn reset(&mut self) {}
}

/// Park for a fixed period on every idle call.
#[derive(Clone, Debug)]
pub struct SleepingIdleStrategy {
    period: Duration,
}

impl SleepingIdleStrategy {
    /// Sleep for `period` whenever idle.
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl IdleStrategy for SleepingIdleStrategy {
    fn idle(&mut self) {
        thread::sleep(self.period);
    }

    fn reset(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BackoffPhase {
    Spinning,
    Yielding,
    Parking,
}

/// Spin, then yield, then park with an exponentially growing period.
///
/// `reset()` returns to the spinning phase, so a loop that keeps finding
/// work stays hot while an idle one settles at `max_park`.
#[derive(Clone, Debug)]
pub struct BackoffIdleStrategy {
    max_spins: u64,
    max_yields: u64,
    min_park: Duration,
    max_park: Duration,
    phase: BackoffPhase,
    spins: u64,
    yields: u64,
    park: Duration,
}

impl BackoffIdleStrategy {
    /// Build a strategy with explicit phase limits.
    pub fn new(max_spins: u64, max_yields: u64, min_park: Duration, max_park: Duration) -> Self {
        let max_park = max_park.max(min_park);
        Self {
            max_spins,
            max_yields,
            min_park,
            max_park,
            phase: BackoffPhase::Spinning,
            spins: 0,
            yields: 0,
            park: min_park,
        }
    }

    /// Current park period; exposed for tests and diagnostics.
    pub fn park_period(&self) -> Duration {
        self.park
    }

    #[cfg(test)]
    fn is_parking(&self) -> bool {
        self.phase == BackoffPhase::Parking
    }
}

impl Default for BackoffIdleStrategy {
    fn default() -> Self {
        Self::new(10, 5, Duration::from_micros(1), Duration::from_millis(1))
    }
}

impl IdleStrategy for BackoffIdleStrategy {
    fn idle(&mut self) {
        match self.phase {
            BackoffPhase::Spinning => {
                std::hint::spin_loop();
                self.spins += 1;
                if self.spins >= self.max_spins {
                    self.phase = BackoffPhase::Yielding;
                }
            }
            BackoffPhase::Yielding => {
                thread::yield_now();
                self.yields += 1;
                if self.yields >= self.max_yields {
                    self.phase = BackoffPhase::Parking;
                }
            }
            BackoffPhase::Parking => {
                thread::park_timeout(self.park);
                self.park = (self.park * 2).min(self.max_park);
            }
        }
    }

    fn reset(&mut self) {
        self.phase = BackoffPhase::Spinning;
        self.spins = 0;
        self.yields = 0;
        self.park = self.min_park;
    }
}

/// Configuration-level choice of idle strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdleStrategyKind {
    /// [`BusySpinIdleStrategy`].
    BusySpin,
    /// [`YieldingIdleStrategy`].
    Yielding,
    /// [`SleepingIdleStrategy`] with the given period.
    Sleeping {
        /// How long to sleep per idle call.
        period: Duration,
    },
    /// [`BackoffIdleStrategy`] with the given limits.
    Backoff {
        /// Spins before yielding.
        max_spins: u64,
        /// Yields before parking.
        max_yields: u64,
        /// First park period.
        min_park: Duration,
        /// Ceiling on the park period.
        max_park: Duration,
    },
}

impl Default for IdleStrategyKind {
    fn default() -> Self {
        Self::Backoff {
            max_spins: 10,
            max_yields: 5,
            min_park: Duration::from_micros(1),
            max_park: Duration::from_millis(1),
        }
    }
}

impl IdleStrategyKind {
    /// Construct a fresh strategy instance.
    pub fn build(&self) -> Box<dyn IdleStrategy> {
        match self {
            Self::BusySpin => Box::new(BusySpinIdleStrategy),
            Self::Yielding => Box::new(YieldingIdleStrategy),
            Self::Sleeping { period } => Box::new(SleepingIdleStrategy::new(*period)),
            Self::Backoff {
                max_spins,
                max_yields,
                min_park,
                max_park,
            } => Box::new(BackoffIdleStrategy::new(
                *max_spins, *max_yields, *min_park, *max_park,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_walks_through_phases() {
        let mut s = BackoffIdleStrategy::new(2, 2, Duration::from_nanos(1), Duration::from_nanos(8));
        for _ in 0..4 {
            assert!(!s.is_parking());
            s.idle();
        }
        assert!(s.is_parking());
        s.idle();
        assert_eq!(s.park_period(), Duration::from_nanos(2));
        s.idle();
        s.idle();
        s.idle();
        assert_eq!(s.park_period(), Duration::from_nanos(8));
    }

    #[test]
    fn reset_restarts_spinning() {
        let mut s = BackoffIdleStrategy::new(1, 1, Duration::from_nanos(1), Duration::from_nanos(4));
        s.idle();
        s.idle();
        s.idle();
        assert!(s.is_parking());
        s.idle_work(1);
        assert!(!s.is_parking());
        assert_eq!(s.park_period(), Duration::from_nanos(1));
    }

    #[test]
    fn kind_builds_every_variant() {
        let kinds = [
            IdleStrategyKind::BusySpin,
            IdleStrategyKind::Yielding,
            IdleStrategyKind::Sleeping {
                period: Duration::from_nanos(1),
            },
            IdleStrategyKind::default(),
        ];
        for kind in kinds {
            let mut s = kind.build();
            s.idle();
            s.reset();
        }
    }
}
