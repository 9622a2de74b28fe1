//! Core domain logic for the task timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Timing: the single-session start/pause/resume/stop state machine
//! - Auditing: task mutations that append one history row per changed field
//! - Storage seams: the record store traits the two engines write through

pub mod clock;
mod error;
mod mutator;
pub mod store;
mod timer;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, format_hms};
pub use error::{Error, Result, StoreError, TimerStateError};
pub use mutator::{TaskMutator, UpdateOutcome};
pub use store::{TaskStore, TimeEntryStore};
pub use timer::{ActiveSession, StoppedSession, TimerEngine, TimerStatus};
pub use types::{
    EntryCompletion, HistoryChange, HistoryEntry, HistoryEntryId, NewTask, SortKey, Task,
    TaskField, TaskFilter, TaskId, TaskUpdate, TimeEntry, TimeEntryId, UnknownField,
    ValidationError,
};
