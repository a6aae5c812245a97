//! Reconnect delay schedule.

use std::time::Duration;

/// Doubling delays starting from an initial value.
///
/// ```text
/// 2 s → 4 s → 8 s → 16 s → ...
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { next: initial }
    }

    /// Returns the current delay and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        delay
    }

    /// Total wait across `attempts` connection attempts (one delay between
    /// each consecutive pair).
    pub fn total_wait(initial: Duration, attempts: u32) -> Duration {
        let mut backoff = Self::new(initial);
        (1..attempts).map(|_| backoff.next_delay()).sum()
    }
}
