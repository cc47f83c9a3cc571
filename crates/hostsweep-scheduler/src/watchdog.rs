//! Stall watchdog: makes a run that stopped making progress visible.
//!
//! Rejected launches and failed or lost tasks never reach the tracker as
//! errors; they just keep the run from completing. The watchdog watches
//! the progress channel and warns whenever nothing has changed for
//! `timeout`, naming the hosts that hold the run up. It repeats every
//! `timeout` until progress resumes, the run is done, or shutdown.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::progress::Progress;

#[derive(Debug, Clone)]
pub struct StallWatchdog {
    timeout: Duration,
}

impl StallWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Watch `progress` until the run is done, the sender is dropped, or
    /// `shutdown` fires. Returns the number of stall warnings emitted.
    pub async fn run(
        self,
        mut progress: watch::Receiver<Progress>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut warnings = 0;

        loop {
            if progress.borrow_and_update().is_done() {
                debug!("run complete, watchdog exiting");
                break;
            }

            tokio::select! {
                changed = progress.changed() => {
                    if changed.is_err() {
                        debug!("progress channel closed, watchdog exiting");
                        break;
                    }
                }
                _ = tokio::time::sleep(self.timeout) => {
                    let snapshot = progress.borrow().clone();
                    report_stall(&snapshot, self.timeout);
                    warnings += 1;
                }
                _ = shutdown.changed() => {
                    debug!("watchdog shutting down");
                    break;
                }
            }
        }

        warnings
    }
}

fn report_stall(snapshot: &Progress, timeout: Duration) {
    if snapshot.is_blocked() {
        error!(
            completed = snapshot.completed,
            known = snapshot.known,
            stalled = ?snapshot.stalled,
            "run cannot complete: every remaining host ended without success"
        );
        return;
    }

    warn!(
        phase = %snapshot.phase,
        completed = snapshot.completed,
        known = snapshot.known,
        waiting_for_offer = ?snapshot.unserviced,
        in_flight = ?snapshot.pending,
        stalled = ?snapshot.stalled,
        idle = ?timeout,
        "no scheduling progress"
    );
}
