//! Monotonic clock on top of the tokio timer.

use bridge_traits::MonotonicClock;
use tokio::time::Instant;

/// Clock anchored at construction.
///
/// Reads `tokio::time::Instant`, so it follows the runtime's paused clock
/// when tests freeze time.
#[derive(Debug, Clone)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for InstantClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn advances_with_time() {
        let clock = InstantClock::new();
        let first = clock.now_secs();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = clock.now_secs();

        assert!(first >= 0.0);
        assert!(second >= first + 0.004);
    }
}
