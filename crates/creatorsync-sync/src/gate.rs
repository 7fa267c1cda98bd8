//! Fixed spacing between consecutive upstream calls.

use std::time::Duration;

use tokio::time::Instant;

/// Earliest instant the next call may start, given when the previous one
/// was let through.
#[must_use]
pub fn next_permit(last: Option<Instant>, now: Instant, interval: Duration) -> Instant {
    match last {
        Some(prev) => (prev + interval).max(now),
        None => now,
    }
}

#[derive(Debug)]
pub struct IntervalGate {
    interval: Duration,
    last: Option<Instant>,
}

impl IntervalGate {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Sleeps until the interval since the previous permit has elapsed. The
    /// first call never waits.
    pub async fn wait(&mut self) {
        let now = Instant::now();
        let permit = next_permit(self.last, now, self.interval);
        if permit > now {
            tokio::time::sleep_until(permit).await;
        }
        self.last = Some(Instant::now());
    }
}
