//! Clock and deadline arithmetic for bounded waits.
//!
//! Every polling loop in the engine is bounded by a [`Deadline`] computed
//! once at wait start and never re-derived from elapsed polls, so slow
//! polling cannot stretch a wait. The clock sits behind a trait so tests can
//! inject a virtual clock and assert timeout boundaries without wall-clock
//! delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of time and sleep used by every polling loop.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `interval`.
    fn sleep(&self, interval: Duration);
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Virtual clock for deterministic tests.
///
/// `sleep` advances the clock instantly instead of blocking, so a polling
/// loop that would take seconds of wall time completes immediately while
/// still observing the same sequence of instants.
#[derive(Debug, Default)]
pub struct TestClock {
    now_ms: AtomicU64,
}

impl TestClock {
    /// Create a virtual clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a virtual clock starting at `start_ms`.
    #[must_use]
    pub fn at(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Advance the clock without sleeping.
    pub fn advance(&self, delta: Duration) {
        self.now_ms
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, interval: Duration) {
        self.advance(interval);
    }
}

/// A fixed point in time a bounded wait must not poll past.
///
/// Computed once from `clock.now_ms() + timeout`; a wait loop keeps polling
/// while `now < deadline` and reports timeout as soon as the deadline is
/// reached. The deadline is never extended mid-wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    end_ms: u64,
}

impl Deadline {
    /// Compute the deadline `timeout` from now.
    #[must_use]
    pub fn after(clock: &dyn Clock, timeout: Duration) -> Self {
        Self {
            end_ms: clock.now_ms().saturating_add(timeout.as_millis() as u64),
        }
    }

    /// Absolute end of the wait in milliseconds since the Unix epoch.
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    /// Time left before expiry; zero once expired.
    #[must_use]
    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        Duration::from_millis(self.end_ms.saturating_sub(clock.now_ms()))
    }

    /// Whether the deadline has been reached.
    #[must_use]
    pub fn expired(&self, clock: &dyn Clock) -> bool {
        clock.now_ms() >= self.end_ms
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod test_clock_tests {
        use super::*;

        #[test]
        fn test_starts_at_zero() {
            let clock = TestClock::new();
            assert_eq!(clock.now_ms(), 0);
        }

        #[test]
        fn test_starts_at_given_instant() {
            let clock = TestClock::at(1_000);
            assert_eq!(clock.now_ms(), 1_000);
        }

        #[test]
        fn test_advance() {
            let clock = TestClock::new();
            clock.advance(Duration::from_millis(250));
            assert_eq!(clock.now_ms(), 250);
        }

        #[test]
        fn test_sleep_advances_instead_of_blocking() {
            let clock = TestClock::new();
            let wall_start = std::time::Instant::now();
            clock.sleep(Duration::from_secs(30));
            assert_eq!(clock.now_ms(), 30_000);
            assert!(wall_start.elapsed() < Duration::from_secs(1));
        }
    }

    mod system_clock_tests {
        use super::*;

        #[test]
        fn test_now_is_nonzero_and_monotonic_enough() {
            let clock = SystemClock;
            let a = clock.now_ms();
            let b = clock.now_ms();
            assert!(a > 0);
            assert!(b >= a);
        }

        #[test]
        fn test_sleep_blocks() {
            let clock = SystemClock;
            let start = std::time::Instant::now();
            clock.sleep(Duration::from_millis(20));
            assert!(start.elapsed() >= Duration::from_millis(20));
        }
    }

    mod deadline_tests {
        use super::*;

        #[test]
        fn test_after_adds_timeout() {
            let clock = TestClock::at(500);
            let deadline = Deadline::after(&clock, Duration::from_millis(1_000));
            assert_eq!(deadline.end_ms(), 1_500);
        }

        #[test]
        fn test_remaining_counts_down() {
            let clock = TestClock::new();
            let deadline = Deadline::after(&clock, Duration::from_millis(1_000));
            clock.advance(Duration::from_millis(300));
            assert_eq!(deadline.remaining(&clock), Duration::from_millis(700));
        }

        #[test]
        fn test_remaining_saturates_at_zero() {
            let clock = TestClock::new();
            let deadline = Deadline::after(&clock, Duration::from_millis(100));
            clock.advance(Duration::from_millis(500));
            assert_eq!(deadline.remaining(&clock), Duration::ZERO);
        }

        #[test]
        fn test_expired_exactly_at_deadline() {
            let clock = TestClock::new();
            let deadline = Deadline::after(&clock, Duration::from_millis(100));
            assert!(!deadline.expired(&clock));
            clock.advance(Duration::from_millis(100));
            assert!(deadline.expired(&clock));
        }

        #[test]
        fn test_zero_timeout_expires_immediately() {
            let clock = TestClock::at(42);
            let deadline = Deadline::after(&clock, Duration::ZERO);
            assert!(deadline.expired(&clock));
        }

        #[test]
        fn test_deadline_is_not_rederived_from_polls() {
            // The deadline is a value, so nothing a later poll does can move it.
            let clock = TestClock::new();
            let deadline = Deadline::after(&clock, Duration::from_millis(100));
            let end_before = deadline.end_ms();
            clock.sleep(Duration::from_millis(75));
            clock.sleep(Duration::from_millis(75));
            assert_eq!(deadline.end_ms(), end_before);
            assert!(deadline.expired(&clock));
        }
    }
}
