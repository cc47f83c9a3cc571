//! Driver error types.

use thiserror::Error;

/// Errors a `SchedulerDriver` can report back to the event loop.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("call rejected by cluster manager: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("driver already stopped")]
    Stopped,
}

pub type DriverResult<T> = Result<T, DriverError>;
