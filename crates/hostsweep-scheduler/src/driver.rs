//! The seam between the scheduler core and a cluster manager transport.
//!
//! A driver delivers `DriverEvent`s over a channel and accepts outbound
//! calls through `SchedulerDriver`. The event loop is the only caller, so
//! implementations never see concurrent calls from the scheduler.

use async_trait::async_trait;

use hostsweep_core::{FrameworkId, Offer, OfferId, TaskInfo, TaskStatus};

use crate::error::DriverResult;

/// Inbound events from the cluster manager.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// Registration completed; the id is logged, not consumed.
    Registered { framework_id: FrameworkId },
    /// A batch of offers delivered together.
    Offers(Vec<Offer>),
    /// A task changed state.
    Status(TaskStatus),
    /// The manager withdrew an offer before it was used.
    Rescinded(OfferId),
    /// The manager reported an error for this framework.
    Error(String),
}

/// Outbound calls to the cluster manager.
#[async_trait]
pub trait SchedulerDriver: Send + Sync {
    /// Launch `task` using the resources of `offer_id`.
    async fn launch(&self, offer_id: &OfferId, task: &TaskInfo) -> DriverResult<()>;

    /// Hand unused offers back to the manager.
    async fn decline(&self, offer_ids: &[OfferId]) -> DriverResult<()>;

    /// Acknowledge a status update that carries an acknowledgement token.
    async fn acknowledge(&self, status: &TaskStatus) -> DriverResult<()>;

    /// Tear down the framework's connection.
    async fn stop(&self) -> DriverResult<()>;
}
