//! Error types for job coordination.

use thiserror::Error;

use armada_bus::BusError;
use armada_client::ClientError;
use armada_core::ScheduleError;
use armada_state::StateError;

/// Result type alias for job coordination operations.
pub type JobsResult<T> = Result<T, JobError>;

/// Hard errors from the coordinator and pollers.
///
/// Delay and skip are NOT errors — they are [`LeaseDecision`] /
/// [`JobOutcome`] values. An error here means the event or configuration
/// was unusable (`BadRequest` / `BadConfig`, terminal for that input) or a
/// collaborator failed (propagated unchanged; the bus redelivers and the
/// pollers re-issue).
///
/// [`LeaseDecision`]: crate::coordinator::LeaseDecision
/// [`JobOutcome`]: crate::coordinator::JobOutcome
#[derive(Debug, Error)]
pub enum JobError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("bad config: {0}")]
    BadConfig(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Bus(#[from] BusError),
}
