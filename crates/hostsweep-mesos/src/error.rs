//! Mesos driver error types.

use thiserror::Error;

use hostsweep_scheduler::DriverError;

use crate::recordio::RecordIoError;

pub type MesosResult<T> = Result<T, MesosError>;

#[derive(Debug, Error)]
pub enum MesosError {
    #[error("invalid master address: {0:?}")]
    InvalidMaster(String),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("request to master failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("master answered {status}: {body}")]
    Status { status: http::StatusCode, body: String },

    #[error("subscribe response is missing the Mesos-Stream-Id header")]
    MissingStreamId,

    #[error("event stream closed before SUBSCRIBED")]
    NotSubscribed,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recordio error: {0}")]
    RecordIo(#[from] RecordIoError),

    #[error("driver already stopped")]
    Stopped,
}

impl From<MesosError> for DriverError {
    fn from(err: MesosError) -> Self {
        match err {
            MesosError::Status { .. } => DriverError::Rejected(err.to_string()),
            MesosError::Stopped => DriverError::Stopped,
            other => DriverError::Transport(other.to_string()),
        }
    }
}
