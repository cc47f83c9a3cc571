//! Domain types shared by the scheduler core and the cluster drivers.
//!
//! Offers and status updates arrive from the cluster manager; tasks and
//! launch requests are produced by the scheduler. None of these are
//! persisted: they live for the handling of a single event.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hostname of a cluster agent. Unique per host.
pub type Hostname = String;

/// Manager-assigned identifier of a resource offer.
pub type OfferId = String;

/// Manager-assigned identifier of an agent (the host a task targets).
pub type AgentId = String;

/// Scheduler-assigned identifier of a launched task.
pub type TaskId = String;

/// Manager-assigned identifier of the registered framework.
pub type FrameworkId = String;

// ── Offers ────────────────────────────────────────────────────────

/// A scalar resource carried by an offer (`cpus`, `mem`, `disk`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub amount: f64,
}

impl Resource {
    pub fn scalar(name: &str, amount: f64) -> Self {
        Self {
            name: name.to_string(),
            amount,
        }
    }
}

/// A time-bounded grant of resources on a specific host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub agent_id: AgentId,
    pub hostname: Hostname,
    /// Resource description as offered. Not validated by the scheduler.
    pub resources: Vec<Resource>,
}

// ── Tasks ─────────────────────────────────────────────────────────

/// Fixed resource request attached to every launched task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpus: f64,
    pub mem: f64,
}

impl ResourceRequest {
    /// One CPU unit and one memory unit. A policy constant, never computed
    /// from the offer.
    pub const MINIMAL: ResourceRequest = ResourceRequest { cpus: 1.0, mem: 1.0 };

    /// The request as named scalar resources.
    pub fn to_resources(&self) -> Vec<Resource> {
        vec![
            Resource::scalar("cpus", self.cpus),
            Resource::scalar("mem", self.mem),
        ]
    }
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self::MINIMAL
    }
}

/// What a task runs on its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Artifacts the agent fetches into the sandbox before running `value`.
    pub uris: Vec<String>,
    /// Shell command line.
    pub value: String,
}

/// A task built for one accepted offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub agent_id: AgentId,
    /// Host the task was built for (not sent on the wire; used for logging).
    pub hostname: Hostname,
    pub resources: ResourceRequest,
    pub command: CommandSpec,
}

/// A task paired with the offer whose resources it will consume.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub offer_id: OfferId,
    pub task: TaskInfo,
}

// ── Status updates ────────────────────────────────────────────────

/// Execution state of a task as reported by the cluster manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[serde(rename = "TASK_STAGING")]
    Staging,
    #[serde(rename = "TASK_STARTING")]
    Starting,
    #[serde(rename = "TASK_RUNNING")]
    Running,
    #[serde(rename = "TASK_KILLING")]
    Killing,
    #[serde(rename = "TASK_FINISHED")]
    Finished,
    #[serde(rename = "TASK_FAILED")]
    Failed,
    #[serde(rename = "TASK_KILLED")]
    Killed,
    #[serde(rename = "TASK_ERROR")]
    Error,
    #[serde(rename = "TASK_LOST")]
    Lost,
    #[serde(rename = "TASK_DROPPED")]
    Dropped,
    #[serde(rename = "TASK_UNREACHABLE")]
    Unreachable,
    #[serde(rename = "TASK_GONE")]
    Gone,
    #[serde(rename = "TASK_GONE_BY_OPERATOR")]
    GoneByOperator,
    #[serde(rename = "TASK_UNKNOWN", other)]
    Unknown,
}

impl TaskState {
    /// The task completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Finished)
    }

    /// The task will not report again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished
                | TaskState::Failed
                | TaskState::Killed
                | TaskState::Error
                | TaskState::Lost
                | TaskState::Dropped
                | TaskState::Gone
                | TaskState::GoneByOperator
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Staging => "staging",
            TaskState::Starting => "starting",
            TaskState::Running => "running",
            TaskState::Killing => "killing",
            TaskState::Finished => "finished",
            TaskState::Failed => "failed",
            TaskState::Killed => "killed",
            TaskState::Error => "error",
            TaskState::Lost => "lost",
            TaskState::Dropped => "dropped",
            TaskState::Unreachable => "unreachable",
            TaskState::Gone => "gone",
            TaskState::GoneByOperator => "gone_by_operator",
            TaskState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An asynchronous notification of a task's execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    pub agent_id: Option<AgentId>,
    pub message: Option<String>,
    /// Present when the manager expects an explicit acknowledgement.
    pub uuid: Option<String>,
}

impl TaskStatus {
    /// A bare status with no agent, message or acknowledgement token.
    pub fn new(task_id: &str, state: TaskState) -> Self {
        Self {
            task_id: task_id.to_string(),
            state,
            agent_id: None,
            message: None,
            uuid: None,
        }
    }
}

// ── Framework ─────────────────────────────────────────────────────

/// The identity a scheduler registers with the cluster manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub name: String,
    /// Run-as user. Empty lets the manager fill in the current user.
    pub user: String,
}
