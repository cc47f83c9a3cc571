//! JSON shapes of the Mesos v1 scheduler API, and conversions to and from
//! the hostsweep domain types.
//!
//! Only the calls and fields this driver uses are modelled. Unknown event
//! fields are ignored on decode.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use hostsweep_core::{FrameworkInfo, Offer, Resource, TaskInfo, TaskState, TaskStatus};
use hostsweep_scheduler::DriverEvent;

/// Protobuf `*ID` messages: `{"value": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Id {
    pub value: String,
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

// ── Calls ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Subscribe,
    Accept,
    Decline,
    Acknowledge,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<Id>,
    #[serde(rename = "type")]
    pub kind: CallType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<Subscribe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<Accept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline: Option<Decline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledge: Option<Acknowledge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscribe {
    pub framework_info: WireFrameworkInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFrameworkInfo {
    pub user: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub refuse_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accept {
    pub offer_ids: Vec<Id>,
    pub operations: Vec<Operation>,
    pub filters: Filters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub launch: Launch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Launch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Launch {
    pub task_infos: Vec<WireTaskInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTaskInfo {
    pub name: String,
    pub task_id: Id,
    pub agent_id: Id,
    pub resources: Vec<WireResource>,
    pub command: WireCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireCommand {
    pub shell: bool,
    pub value: String,
    pub uris: Vec<WireUri>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireUri {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decline {
    pub offer_ids: Vec<Id>,
    pub filters: Filters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledge {
    pub agent_id: Id,
    pub task_id: Id,
    pub uuid: String,
}

impl Call {
    fn bare(framework_id: Option<&str>, kind: CallType) -> Self {
        Self {
            framework_id: framework_id.map(Id::from),
            kind,
            subscribe: None,
            accept: None,
            decline: None,
            acknowledge: None,
        }
    }

    pub fn subscribe(framework: &FrameworkInfo) -> Self {
        Self {
            subscribe: Some(Subscribe {
                framework_info: WireFrameworkInfo {
                    user: framework.user.clone(),
                    name: framework.name.clone(),
                },
            }),
            ..Self::bare(None, CallType::Subscribe)
        }
    }

    /// Accept one offer with a single LAUNCH operation.
    pub fn launch(
        framework_id: &str,
        offer_id: &str,
        task: &TaskInfo,
        refuse_seconds: f64,
    ) -> Self {
        Self {
            accept: Some(Accept {
                offer_ids: vec![Id::from(offer_id)],
                operations: vec![Operation {
                    kind: OperationType::Launch,
                    launch: Launch {
                        task_infos: vec![WireTaskInfo::from(task)],
                    },
                }],
                filters: Filters { refuse_seconds },
            }),
            ..Self::bare(Some(framework_id), CallType::Accept)
        }
    }

    pub fn decline(framework_id: &str, offer_ids: &[String], refuse_seconds: f64) -> Self {
        Self {
            decline: Some(Decline {
                offer_ids: offer_ids.iter().map(|id| Id::from(id.as_str())).collect(),
                filters: Filters { refuse_seconds },
            }),
            ..Self::bare(Some(framework_id), CallType::Decline)
        }
    }

    /// Build an ACKNOWLEDGE for `status`, if it carries both an agent id
    /// and an acknowledgement uuid.
    pub fn acknowledge(framework_id: &str, status: &TaskStatus) -> Option<Self> {
        let agent_id = status.agent_id.as_deref()?;
        let uuid = status.uuid.clone()?;
        Some(Self {
            acknowledge: Some(Acknowledge {
                agent_id: Id::from(agent_id),
                task_id: Id::from(status.task_id.as_str()),
                uuid,
            }),
            ..Self::bare(Some(framework_id), CallType::Acknowledge)
        })
    }

    pub fn teardown(framework_id: &str) -> Self {
        Self::bare(Some(framework_id), CallType::Teardown)
    }
}

impl From<&TaskInfo> for WireTaskInfo {
    fn from(task: &TaskInfo) -> Self {
        Self {
            name: task.name.clone(),
            task_id: Id::from(task.id.as_str()),
            agent_id: Id::from(task.agent_id.as_str()),
            resources: task
                .resources
                .to_resources()
                .iter()
                .map(WireResource::scalar)
                .collect(),
            command: WireCommand {
                shell: true,
                value: task.command.value.clone(),
                uris: task
                    .command
                    .uris
                    .iter()
                    .map(|uri| WireUri { value: uri.clone() })
                    .collect(),
            },
        }
    }
}

// ── Resources ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResource {
    pub name: String,
    /// `SCALAR`, `RANGES`, `SET` or `TEXT`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub value: f64,
}

impl WireResource {
    pub fn scalar(resource: &Resource) -> Self {
        Self {
            name: resource.name.clone(),
            kind: "SCALAR".to_string(),
            scalar: Some(Scalar {
                value: resource.amount,
            }),
        }
    }
}

// ── Events ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Subscribed,
    Offers,
    InverseOffers,
    Rescind,
    RescindInverseOffer,
    Update,
    UpdateOperationStatus,
    Message,
    Failure,
    Error,
    Heartbeat,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub subscribed: Option<Subscribed>,
    pub offers: Option<OffersEvent>,
    pub rescind: Option<Rescind>,
    pub update: Option<Update>,
    pub failure: Option<Failure>,
    pub error: Option<ErrorEvent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscribed {
    pub framework_id: Id,
    pub heartbeat_interval_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OffersEvent {
    #[serde(default)]
    pub offers: Vec<WireOffer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireOffer {
    pub id: Id,
    pub agent_id: Id,
    pub hostname: String,
    #[serde(default)]
    pub resources: Vec<WireResource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rescind {
    pub offer_id: Id,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub status: WireStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireStatus {
    pub task_id: Id,
    pub state: TaskState,
    pub agent_id: Option<Id>,
    pub message: Option<String>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Failure {
    pub agent_id: Option<Id>,
    pub executor_id: Option<Id>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}

impl From<WireOffer> for Offer {
    fn from(offer: WireOffer) -> Self {
        Offer {
            id: offer.id.value,
            agent_id: offer.agent_id.value,
            hostname: offer.hostname,
            resources: offer
                .resources
                .into_iter()
                .filter_map(|r| {
                    r.scalar.map(|s| Resource {
                        name: r.name,
                        amount: s.value,
                    })
                })
                .collect(),
        }
    }
}

impl From<WireStatus> for TaskStatus {
    fn from(status: WireStatus) -> Self {
        TaskStatus {
            task_id: status.task_id.value,
            state: status.state,
            agent_id: status.agent_id.map(|id| id.value),
            message: status.message,
            uuid: status.uuid,
        }
    }
}

impl Event {
    /// Map a post-subscription event to a `DriverEvent`.
    ///
    /// Heartbeats, failures and event types this driver does not act on
    /// yield `None`.
    pub fn into_driver_event(self) -> Option<DriverEvent> {
        match self.kind {
            EventType::Subscribed => self.subscribed.map(|s| DriverEvent::Registered {
                framework_id: s.framework_id.value,
            }),
            EventType::Offers => self
                .offers
                .map(|o| DriverEvent::Offers(o.offers.into_iter().map(Offer::from).collect())),
            EventType::Update => self.update.map(|u| DriverEvent::Status(u.status.into())),
            EventType::Rescind => self.rescind.map(|r| DriverEvent::Rescinded(r.offer_id.value)),
            EventType::Error => self.error.map(|e| DriverEvent::Error(e.message)),
            EventType::Failure => {
                if let Some(failure) = &self.failure {
                    warn!(
                        agent_id = ?failure.agent_id.as_ref().map(|id| id.value.as_str()),
                        executor_id = ?failure.executor_id.as_ref().map(|id| id.value.as_str()),
                        status = ?failure.status,
                        "agent or executor failure reported"
                    );
                }
                None
            }
            EventType::Heartbeat => {
                trace!("heartbeat");
                None
            }
            other => {
                trace!(event = ?other, "ignoring event");
                None
            }
        }
    }
}
