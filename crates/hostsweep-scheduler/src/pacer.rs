//! Launch pacing: keep a minimum spacing between consecutive launches.
//!
//! Pacing only spreads launches out against the cluster manager. It never
//! decides whether a launch happens, so disabling it cannot affect the
//! once-per-host guarantee.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct LaunchPacer {
    interval: Duration,
    last: Option<Instant>,
}

impl LaunchPacer {
    /// Space launches at least `interval` apart. The first launch is never
    /// delayed.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A pacer that never waits.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the next launch may go out, then claim the slot.
    pub async fn ready(&mut self) {
        if !self.interval.is_zero() {
            if let Some(last) = self.last {
                let next = last + self.interval;
                if next > Instant::now() {
                    trace!(wait = ?(next - Instant::now()), "pacing launch");
                    tokio::time::sleep_until(next).await;
                }
            }
        }
        self.last = Some(Instant::now());
    }
}
