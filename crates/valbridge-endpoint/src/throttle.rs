//! Rate limiting for repetitive log lines.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Lets one event through per window.
///
/// Uses Tokio's clock so paused-time tests can step over the window.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl LogThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` if the caller should log now, and starts a new window.
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(at) if now.duration_since(at) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_allow_once_per_window() {
        let throttle = LogThrottle::new(Duration::from_secs(30));
        assert!(throttle.allow());
        assert!(!throttle.allow());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!throttle.allow());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(throttle.allow());
        assert!(!throttle.allow());
    }
}
