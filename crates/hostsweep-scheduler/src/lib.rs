//! hostsweep-scheduler: one-shot, once-per-host task scheduling.
//!
//! Consumes resource offers from a cluster manager, launches exactly one
//! installer task on every distinct host, and stops the driver once every
//! known host has reported success.
//!
//! # Architecture
//!
//! ```text
//! run()  (single consumer of DriverEvent, handlers never overlap)
//!   ├── InstallScheduler
//!   │   ├── HostRegistry      (known / serviced / completed hosts)
//!   │   ├── OfferDispatcher   (offers → launches + declines)
//!   │   └── CompletionTracker (statuses → Continue | Terminate)
//!   ├── LaunchPacer           (optional spacing between launches)
//!   ├── SchedulerDriver       (launch / decline / acknowledge / stop)
//!   └── watch::Sender<Progress> ──► StallWatchdog
//! ```
//!
//! The core never fails: failures it cannot resolve (rejected launches,
//! failed or lost tasks) leave the run short of completion. The watchdog
//! turns that stall into periodic warnings.

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod pacer;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod tracker;
pub mod watchdog;

pub use dispatcher::{Dispatch, OfferDispatcher};
pub use driver::{DriverEvent, SchedulerDriver};
pub use error::{DriverError, DriverResult};
pub use pacer::LaunchPacer;
pub use progress::{Progress, RunPhase};
pub use registry::{HostRegistry, HostStatus};
pub use runner::{RunOutcome, run};
pub use scheduler::InstallScheduler;
pub use tracker::{CompletionTracker, TerminationDecision};
pub use watchdog::StallWatchdog;
