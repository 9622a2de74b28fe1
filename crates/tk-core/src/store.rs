//! Record store seams consumed by the timer engine and the task mutator.
//!
//! Every method that writes more than one row must do so atomically: either
//! all rows become visible or none do. The core never compensates for a
//! partially applied write.

use chrono::{DateTime, Utc};

use crate::types::{
    EntryCompletion, HistoryChange, HistoryEntry, HistoryEntryId, NewTask, SortKey, Task,
    TaskFilter, TaskId, TaskUpdate, TimeEntry, TimeEntryId,
};

/// Durable storage for tasks and their audit trail.
pub trait TaskStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts a task together with its creation history row.
    fn insert_task(
        &mut self,
        task: &NewTask,
        creation: &HistoryChange,
        at: DateTime<Utc>,
    ) -> Result<TaskId, Self::Error>;

    /// Applies `update` and appends `changes` as one unit.
    ///
    /// Returns `false`, with nothing written, if the task does not exist.
    fn update_task(
        &mut self,
        id: TaskId,
        update: &TaskUpdate,
        changes: &[HistoryChange],
        at: DateTime<Utc>,
    ) -> Result<bool, Self::Error>;

    /// Deletes a task; its time entries and history go with it.
    fn delete_task(&mut self, id: TaskId) -> Result<bool, Self::Error>;

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, Self::Error>;

    fn list_tasks(&self, filter: &TaskFilter, sort: SortKey) -> Result<Vec<Task>, Self::Error>;

    fn append_history(
        &mut self,
        task_id: TaskId,
        change: &HistoryChange,
        at: DateTime<Utc>,
    ) -> Result<HistoryEntryId, Self::Error>;

    /// History rows for a task, most recent first.
    fn list_history(&self, task_id: TaskId) -> Result<Vec<HistoryEntry>, Self::Error>;
}

/// Durable storage for timing sessions.
pub trait TimeEntryStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn task_exists(&self, id: TaskId) -> Result<bool, Self::Error>;

    /// Opens a new entry with no end time.
    fn insert_time_entry(
        &mut self,
        task_id: TaskId,
        start_time: DateTime<Utc>,
    ) -> Result<TimeEntryId, Self::Error>;

    /// Closes an open entry, adds its duration to the task's total time and
    /// appends the matching `total_time` history row, as one unit.
    ///
    /// The history row holds the total before and after the session; the
    /// increment is their difference.
    ///
    /// Returns `false`, with nothing written, if there is no such open entry.
    fn complete_time_entry(&mut self, completion: &EntryCompletion) -> Result<bool, Self::Error>;

    /// Removes an entry that was never closed. Closed entries are left alone.
    fn discard_time_entry(&mut self, id: TimeEntryId) -> Result<bool, Self::Error>;

    /// Entries for a task, most recent start first.
    fn list_time_entries(&self, task_id: TaskId) -> Result<Vec<TimeEntry>, Self::Error>;

    /// All entries that have a start but no end.
    fn open_time_entries(&self) -> Result<Vec<TimeEntry>, Self::Error>;
}
