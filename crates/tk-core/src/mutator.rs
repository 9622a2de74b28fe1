//! Audited task mutations.
//!
//! Every write that changes a task field also appends one history row per
//! field, and the store applies both in a single transaction.

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::store::{TaskStore, TimeEntryStore};
use crate::types::{
    CREATION_FIELD, HistoryChange, HistoryEntry, NewTask, SortKey, Task, TaskFilter, TaskId,
    TaskUpdate, TimeEntry, ValidationError,
};

/// Outcome of [`TaskMutator::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// No updatable field was present; nothing was written.
    NoChanges,
    /// The task was updated and `fields` history rows were appended.
    Applied { fields: usize },
}

/// Creates, updates and deletes tasks while keeping the audit trail in step.
#[derive(Debug)]
pub struct TaskMutator<C = SystemClock> {
    clock: C,
}

impl TaskMutator<SystemClock> {
    pub const fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for TaskMutator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TaskMutator<C> {
    pub const fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Inserts a task and its `creation` history row.
    pub fn create<S: TaskStore>(&self, store: &mut S, task: NewTask) -> Result<TaskId> {
        let name = validate_name(&task.name)?;
        let task = NewTask { name, ..task };
        let creation = HistoryChange::new(
            CREATION_FIELD,
            None,
            Some(format!("Task created: {}", task.name)),
        );

        let id = store
            .insert_task(&task, &creation, self.clock.wall_clock())
            .map_err(Error::store)?;
        tracing::debug!(task_id = %id, name = %task.name, "task created");
        Ok(id)
    }

    /// Applies the fields present in `update`, recording old and new values.
    pub fn update<S: TaskStore>(
        &self,
        store: &mut S,
        id: TaskId,
        update: &TaskUpdate,
    ) -> Result<UpdateOutcome> {
        let current = store
            .get_task(id)
            .map_err(Error::store)?
            .ok_or(Error::TaskNotFound(id))?;

        let fields = update.fields();
        if fields.is_empty() {
            tracing::debug!(task_id = %id, "update has no recognized fields");
            return Ok(UpdateOutcome::NoChanges);
        }

        let mut update = update.clone();
        if let Some(name) = &update.name {
            update.name = Some(validate_name(name)?);
        }

        let changes: Vec<HistoryChange> = fields
            .iter()
            .map(|&field| {
                HistoryChange::new(
                    field.as_str(),
                    current.field_value(field),
                    update.new_value(field).flatten(),
                )
            })
            .collect();

        if !store
            .update_task(id, &update, &changes, self.clock.wall_clock())
            .map_err(Error::store)?
        {
            return Err(Error::TaskNotFound(id));
        }
        tracing::debug!(task_id = %id, fields = changes.len(), "task updated");
        Ok(UpdateOutcome::Applied {
            fields: changes.len(),
        })
    }

    /// Deletes a task. Its time entries and history are removed with it.
    pub fn delete<S: TaskStore>(&self, store: &mut S, id: TaskId) -> Result<()> {
        if !store.delete_task(id).map_err(Error::store)? {
            return Err(Error::TaskNotFound(id));
        }
        tracing::debug!(task_id = %id, "task deleted");
        Ok(())
    }

    pub fn get<S: TaskStore>(&self, store: &S, id: TaskId) -> Result<Option<Task>> {
        store.get_task(id).map_err(Error::store)
    }

    pub fn list<S: TaskStore>(
        &self,
        store: &S,
        filter: &TaskFilter,
        sort: SortKey,
    ) -> Result<Vec<Task>> {
        store.list_tasks(filter, sort).map_err(Error::store)
    }

    /// Audit trail for a task, most recent first.
    pub fn history<S: TaskStore>(&self, store: &S, id: TaskId) -> Result<Vec<HistoryEntry>> {
        self.require(store, id)?;
        store.list_history(id).map_err(Error::store)
    }

    /// Timing sessions recorded for a task, most recent first.
    pub fn time_entries<S>(&self, store: &S, id: TaskId) -> Result<Vec<TimeEntry>>
    where
        S: TaskStore + TimeEntryStore,
    {
        self.require(store, id)?;
        store.list_time_entries(id).map_err(Error::store)
    }

    fn require<S: TaskStore>(&self, store: &S, id: TaskId) -> Result<Task> {
        store
            .get_task(id)
            .map_err(Error::store)?
            .ok_or(Error::TaskNotFound(id))
    }
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
