//! Error taxonomy shared by the timer engine and the task mutator.

use thiserror::Error;

use crate::types::{TaskId, TimeEntryId, ValidationError};

/// Boxed error from a record store implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A timer operation attempted in a state that forbids it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerStateError {
    #[error("timer is already running")]
    AlreadyRunning,
    #[error("timer is not running")]
    NotRunning,
    #[error("timer is not paused")]
    NotPaused,
    #[error("timer is not running or paused")]
    NotActive,
}

/// Errors returned by [`TimerEngine`](crate::TimerEngine) and [`TaskMutator`](crate::TaskMutator).
///
/// Every variant is recoverable; a failed operation leaves no partial writes
/// and no timer state change behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task {0} does not exist")]
    TaskNotFound(TaskId),

    #[error("time entry {0} does not exist")]
    TimeEntryNotFound(TimeEntryId),

    #[error(transparent)]
    InvalidState(#[from] TimerStateError),

    #[error("storage error: {0}")]
    Store(#[source] StoreError),
}

impl Error {
    pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
