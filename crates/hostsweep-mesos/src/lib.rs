//! hostsweep-mesos: a `SchedulerDriver` for the Mesos v1 scheduler HTTP API.
//!
//! # Protocol
//!
//! ```text
//! POST /api/v1/scheduler  SUBSCRIBE      → 200, Mesos-Stream-Id, RecordIO event stream
//!                                          SUBSCRIBED, OFFERS, UPDATE, RESCIND, ...
//! POST /api/v1/scheduler  ACCEPT/LAUNCH  → 202
//! POST /api/v1/scheduler  DECLINE        → 202
//! POST /api/v1/scheduler  ACKNOWLEDGE    → 202
//! POST /api/v1/scheduler  TEARDOWN       → 202
//! ```
//!
//! Every call after SUBSCRIBE carries the `Mesos-Stream-Id` header and the
//! framework id assigned in SUBSCRIBED. Events are decoded on a background
//! task and forwarded as `DriverEvent`s over an mpsc channel.

pub mod driver;
pub mod error;
pub mod recordio;
pub mod wire;

pub use driver::{MesosConfig, MesosDriver, Subscription};
pub use error::{MesosError, MesosResult};
pub use recordio::{RecordIoDecoder, RecordIoError};
