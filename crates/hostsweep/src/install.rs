//! Install mode: register, schedule until done, tear down.
//!
//! 1. Subscribes to the master (fatal on failure, no retry)
//! 2. Starts the stall watchdog on the progress channel
//! 3. Runs the scheduler event loop until every host completes, the
//!    event stream closes, or Ctrl-C
//! 4. Stops the watchdog and the event stream task

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use hostsweep_core::{InstallerConfig, Payload};
use hostsweep_mesos::{MesosConfig, MesosDriver, Subscription};
use hostsweep_scheduler::{InstallScheduler, LaunchPacer, Progress, RunOutcome, StallWatchdog, run};

pub async fn run_install(
    master: String,
    payload: Payload,
    config: &InstallerConfig,
) -> anyhow::Result<RunOutcome> {
    let launch_interval = config.launch_interval()?;
    let stall_timeout = config.stall_timeout()?;

    info!(
        %master,
        script = %payload.script_uri(),
        launch_interval = ?launch_interval,
        "hostsweep starting"
    );

    // ── Register ─────────────────────────────────────────────────
    let mesos = MesosConfig {
        master,
        framework: config.framework_info(),
        refuse_seconds: config.offers.refuse_seconds,
    };
    let Subscription {
        driver,
        mut events,
        stream,
    } = MesosDriver::subscribe(&mesos)
        .await
        .context("failed to register with mesos master")?;

    // ── Watchdog ─────────────────────────────────────────────────
    let (progress_tx, progress_rx) = watch::channel(Progress::initial());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watchdog = tokio::spawn(StallWatchdog::new(stall_timeout).run(progress_rx, shutdown_rx));

    // ── Event loop ───────────────────────────────────────────────
    let mut scheduler = InstallScheduler::new(payload);
    let mut pacer = LaunchPacer::new(launch_interval);

    let outcome = tokio::select! {
        result = run(&mut scheduler, &driver, &mut events, &mut pacer, &progress_tx) => {
            Some(result)
        }
        _ = tokio::signal::ctrl_c() => None,
    };

    let _ = shutdown_tx.send(true);
    let _ = watchdog.await;
    stream.abort();

    match outcome {
        Some(result) => Ok(result.context("failed to stop driver")?),
        None => {
            let progress = scheduler.progress();
            warn!(
                completed = progress.completed,
                known = progress.known,
                "interrupted before installation completed"
            );
            anyhow::bail!("interrupted")
        }
    }
}
