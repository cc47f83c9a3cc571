//! Event loop: feeds driver events to the scheduler one at a time.
//!
//! This is the only consumer of the event channel, so the two handlers run
//! sequentially and to completion. Outbound call failures are logged and
//! the run continues: a launch that never reached the manager looks the
//! same as a rejected one, and the watchdog reports the resulting stall.

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use hostsweep_core::TaskStatus;

use crate::dispatcher::Dispatch;
use crate::driver::{DriverEvent, SchedulerDriver};
use crate::error::DriverResult;
use crate::pacer::LaunchPacer;
use crate::progress::Progress;
use crate::scheduler::InstallScheduler;
use crate::tracker::TerminationDecision;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every known host completed and the driver was stopped.
    Completed { hosts: usize },
    /// The event stream closed before completion.
    Disconnected { progress: Progress },
}

/// Drive `scheduler` from `events` until it terminates or the stream ends.
///
/// A progress snapshot is published on `progress` whenever it changes.
/// Only a failure to stop the driver is returned as an error.
pub async fn run<D>(
    scheduler: &mut InstallScheduler,
    driver: &D,
    events: &mut mpsc::Receiver<DriverEvent>,
    pacer: &mut LaunchPacer,
    progress: &watch::Sender<Progress>,
) -> DriverResult<RunOutcome>
where
    D: SchedulerDriver + ?Sized,
{
    while let Some(event) = events.recv().await {
        match event {
            DriverEvent::Registered { framework_id } => {
                info!(%framework_id, "registered with cluster manager");
            }
            DriverEvent::Offers(offers) => {
                info!(
                    offers = ?offers.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
                    "received resource offers"
                );
                let dispatch = scheduler.handle_offers(&offers);
                apply_dispatch(driver, dispatch, pacer).await;
            }
            DriverEvent::Status(status) => {
                let decision = scheduler.handle_status(&status);
                acknowledge(driver, &status).await;

                if decision == TerminationDecision::Terminate {
                    publish(progress, scheduler.progress());
                    info!("stopping driver");
                    driver.stop().await?;
                    return Ok(RunOutcome::Completed {
                        hosts: scheduler.registry().known_count(),
                    });
                }
            }
            DriverEvent::Rescinded(offer_id) => {
                debug!(%offer_id, "offer rescinded");
            }
            DriverEvent::Error(message) => {
                error!(%message, "cluster manager reported an error");
            }
        }

        publish(progress, scheduler.progress());
    }

    let snapshot = scheduler.progress();
    warn!(
        completed = snapshot.completed,
        known = snapshot.known,
        "event stream closed before every host completed"
    );
    Ok(RunOutcome::Disconnected { progress: snapshot })
}

async fn apply_dispatch<D>(driver: &D, dispatch: Dispatch, pacer: &mut LaunchPacer)
where
    D: SchedulerDriver + ?Sized,
{
    if dispatch.is_empty() {
        return;
    }

    for launch in &dispatch.launches {
        pacer.ready().await;
        if let Err(e) = driver.launch(&launch.offer_id, &launch.task).await {
            error!(
                hostname = %launch.task.hostname,
                task_id = %launch.task.id,
                offer_id = %launch.offer_id,
                error = %e,
                "launch failed; host will not be retried"
            );
        }
    }

    if !dispatch.declined.is_empty() {
        if let Err(e) = driver.decline(&dispatch.declined).await {
            warn!(offers = dispatch.declined.len(), error = %e, "failed to decline offers");
        }
    }
}

async fn acknowledge<D>(driver: &D, status: &TaskStatus)
where
    D: SchedulerDriver + ?Sized,
{
    if status.uuid.is_none() {
        return;
    }
    if let Err(e) = driver.acknowledge(status).await {
        warn!(task_id = %status.task_id, error = %e, "failed to acknowledge status update");
    }
}

fn publish(progress: &watch::Sender<Progress>, snapshot: Progress) {
    progress.send_if_modified(|current| {
        if *current == snapshot {
            false
        } else {
            *current = snapshot;
            true
        }
    });
}
