//! Storage layer for the task timer.
//!
//! Provides persistence for tasks, time entries and the task audit trail
//! using `rusqlite`, and implements the record store traits from `tk-core`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! The timer engine relies on being the only writer of open time entries, so
//! sharing one database between several engines needs a `Mutex` around the
//! engine as well as the connection.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g., `2024-01-15T10:30:00.000Z`).
//! Deadlines are calendar dates stored as `YYYY-MM-DD`. Both formats sort
//! lexicographically in chronological order, which the list queries rely on.
//!
//! ## Atomic Writes
//!
//! Every write that touches more than one row (task + history, entry + total
//! + history) runs in a single transaction. Dropping the transaction without
//! committing rolls it back, so early returns never leave partial writes.
//!
//! ## Cascades
//!
//! `PRAGMA foreign_keys = ON` is set on every connection; deleting a task
//! removes its time entries and history rows.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;
use tk_core::types::{TOTAL_TIME_FIELD, format_date};
use tk_core::{
    EntryCompletion, HistoryChange, HistoryEntry, HistoryEntryId, NewTask, SortKey, Task,
    TaskField, TaskFilter, TaskId, TaskStore, TaskUpdate, TimeEntry, TimeEntryId, TimeEntryStore,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp or date.
    #[error("invalid {column} for {table} row {id}: {value}")]
    TimestampParse {
        table: &'static str,
        column: &'static str,
        id: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value is outside the range the domain allows.
    #[error("invalid {table} row {id}: {message}")]
    InvalidRow {
        table: &'static str,
        id: i64,
        message: String,
    },
    /// A duration does not fit in a SQLite integer.
    #[error("duration out of range: {0} seconds")]
    DurationOutOfRange(u64),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

const TASK_COLUMNS: &str =
    "id, name, description, category, created_at, deadline, completed, priority, total_time";

const ENTRY_COLUMNS: &str = "id, task_id, start_time, end_time, duration";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT,
                created_at TEXT NOT NULL,
                deadline TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                total_time INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_name ON tasks(name);

            -- Time entries: one row per timing session
            -- end_time and duration stay NULL while the session is open
            CREATE TABLE IF NOT EXISTS time_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration INTEGER,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_task ON time_entries(task_id);
            CREATE INDEX IF NOT EXISTS idx_time_entries_open ON time_entries(end_time)
                WHERE end_time IS NULL;

            -- Task history: append-only audit trail, one row per changed field
            CREATE TABLE IF NOT EXISTS task_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                changed_at TEXT NOT NULL,
                field_name TEXT NOT NULL,
                old_value TEXT,
                new_value TEXT,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_task_history_task ON task_history(task_id, changed_at);
            ",
        )?;
        Ok(())
    }

    fn query_tasks(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Task>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params), TaskRow::from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn query_entries(&self, sql: &str, params: Vec<Value>) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params), EntryRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

impl TaskStore for Database {
    type Error = DbError;

    fn insert_task(
        &mut self,
        task: &NewTask,
        creation: &HistoryChange,
        at: DateTime<Utc>,
    ) -> Result<TaskId, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "
            INSERT INTO tasks (name, description, category, created_at, deadline, priority)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                task.name,
                task.description,
                task.category,
                format_timestamp(at),
                task.deadline.map(format_date),
                task.priority,
            ],
        )?;
        let id = TaskId::new(tx.last_insert_rowid());
        insert_history(&tx, id, creation, at)?;
        tx.commit()?;
        tracing::debug!(task_id = %id, "inserted task");
        Ok(id)
    }

    fn update_task(
        &mut self,
        id: TaskId,
        update: &TaskUpdate,
        changes: &[HistoryChange],
        at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let fields = update.fields();
        if fields.is_empty() {
            return Ok(self.get_task(id)?.is_some());
        }

        let assignments: Vec<String> = fields
            .iter()
            .map(|field| format!("{} = ?", field.as_str()))
            .collect();
        let mut values: Vec<Value> = fields
            .iter()
            .map(|&field| column_value(update, field))
            .collect();
        values.push(Value::Integer(id.get()));
        let query = format!(
            "UPDATE tasks SET {} WHERE id = ?",
            assignments.join(", ")
        );

        let tx = self.conn.transaction()?;
        if tx.execute(&query, params_from_iter(values))? == 0 {
            return Ok(false);
        }
        for change in changes {
            insert_history(&tx, id, change, at)?;
        }
        tx.commit()?;
        tracing::debug!(task_id = %id, fields = fields.len(), history = changes.len(), "updated task");
        Ok(true)
    }

    fn delete_task(&mut self, id: TaskId) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", [id.get()])?;
        Ok(deleted > 0)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
                [id.get()],
                TaskRow::from_row,
            )
            .optional()?;
        row.map(TaskRow::into_task).transpose()
    }

    fn list_tasks(&self, filter: &TaskFilter, sort: SortKey) -> Result<Vec<Task>, DbError> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1");
        let mut values = Vec::new();

        if let Some(completed) = filter.completed {
            query.push_str(" AND completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(priority) = filter.priority {
            query.push_str(" AND priority = ?");
            values.push(Value::Integer(i64::from(priority)));
        }
        if let Some(category) = &filter.category {
            query.push_str(" AND category = ?");
            values.push(Value::Text(category.clone()));
        }

        query.push_str(" ORDER BY ");
        query.push_str(order_clause(sort));
        self.query_tasks(&query, values)
    }

    fn append_history(
        &mut self,
        task_id: TaskId,
        change: &HistoryChange,
        at: DateTime<Utc>,
    ) -> Result<HistoryEntryId, DbError> {
        Ok(insert_history(&self.conn, task_id, change, at)?)
    }

    fn list_history(&self, task_id: TaskId) -> Result<Vec<HistoryEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, task_id, changed_at, field_name, old_value, new_value
            FROM task_history
            WHERE task_id = ?
            ORDER BY changed_at DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map([task_id.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;
        let mut history = Vec::new();
        for row in rows {
            let (id, task_id, changed_at, field_name, old_value, new_value) = row?;
            history.push(HistoryEntry {
                id: HistoryEntryId::new(id),
                task_id: TaskId::new(task_id),
                changed_at: parse_timestamp(&changed_at, "task_history", "changed_at", id)?,
                field_name,
                old_value,
                new_value,
            });
        }
        Ok(history)
    }
}

impl TimeEntryStore for Database {
    type Error = DbError;

    fn task_exists(&self, id: TaskId) -> Result<bool, DbError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)",
            [id.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_time_entry(
        &mut self,
        task_id: TaskId,
        start_time: DateTime<Utc>,
    ) -> Result<TimeEntryId, DbError> {
        self.conn.execute(
            "INSERT INTO time_entries (task_id, start_time) VALUES (?, ?)",
            params![task_id.get(), format_timestamp(start_time)],
        )?;
        let id = TimeEntryId::new(self.conn.last_insert_rowid());
        tracing::debug!(%task_id, entry_id = %id, "opened time entry");
        Ok(id)
    }

    fn complete_time_entry(&mut self, completion: &EntryCompletion) -> Result<bool, DbError> {
        let duration = i64::try_from(completion.duration_secs)
            .map_err(|_| DbError::DurationOutOfRange(completion.duration_secs))?;
        let end_time = format_timestamp(completion.end_time);

        let tx = self.conn.transaction()?;
        let closed = tx.execute(
            "
            UPDATE time_entries
            SET end_time = ?, duration = ?
            WHERE id = ? AND task_id = ? AND end_time IS NULL
            ",
            params![
                end_time,
                duration,
                completion.entry_id.get(),
                completion.task_id.get()
            ],
        )?;
        if closed == 0 {
            return Ok(false);
        }

        let old_total: i64 = tx.query_row(
            "SELECT total_time FROM tasks WHERE id = ?",
            [completion.task_id.get()],
            |row| row.get(0),
        )?;
        let new_total = old_total
            .checked_add(duration)
            .ok_or(DbError::DurationOutOfRange(completion.duration_secs))?;
        tx.execute(
            "UPDATE tasks SET total_time = ? WHERE id = ?",
            params![new_total, completion.task_id.get()],
        )?;
        insert_history(
            &tx,
            completion.task_id,
            &HistoryChange::new(
                TOTAL_TIME_FIELD,
                Some(old_total.to_string()),
                Some(new_total.to_string()),
            ),
            completion.end_time,
        )?;
        tx.commit()?;
        tracing::debug!(
            entry_id = %completion.entry_id,
            task_id = %completion.task_id,
            duration,
            "closed time entry"
        );
        Ok(true)
    }

    fn discard_time_entry(&mut self, id: TimeEntryId) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM time_entries WHERE id = ? AND end_time IS NULL",
            [id.get()],
        )?;
        Ok(deleted > 0)
    }

    fn list_time_entries(&self, task_id: TaskId) -> Result<Vec<TimeEntry>, DbError> {
        self.query_entries(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE task_id = ? ORDER BY start_time DESC, id DESC"
            ),
            vec![Value::Integer(task_id.get())],
        )
    }

    fn open_time_entries(&self) -> Result<Vec<TimeEntry>, DbError> {
        self.query_entries(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE end_time IS NULL ORDER BY start_time ASC, id ASC"
            ),
            Vec::new(),
        )
    }
}

/// Raw task columns, decoded into a [`Task`] outside the row callback.
struct TaskRow {
    id: i64,
    name: String,
    description: Option<String>,
    category: Option<String>,
    created_at: String,
    deadline: Option<String>,
    completed: bool,
    priority: bool,
    total_time: i64,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            created_at: row.get(4)?,
            deadline: row.get(5)?,
            completed: row.get(6)?,
            priority: row.get(7)?,
            total_time: row.get(8)?,
        })
    }

    fn into_task(self) -> Result<Task, DbError> {
        let deadline = self
            .deadline
            .map(|value| {
                NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|source| {
                    DbError::TimestampParse {
                        table: "tasks",
                        column: "deadline",
                        id: self.id,
                        value,
                        source,
                    }
                })
            })
            .transpose()?;
        let total_time = u64::try_from(self.total_time).map_err(|_| DbError::InvalidRow {
            table: "tasks",
            id: self.id,
            message: format!("negative total_time {}", self.total_time),
        })?;

        Ok(Task {
            id: TaskId::new(self.id),
            created_at: parse_timestamp(&self.created_at, "tasks", "created_at", self.id)?,
            name: self.name,
            description: self.description,
            category: self.category,
            deadline,
            completed: self.completed,
            priority: self.priority,
            total_time,
        })
    }
}

/// Raw time entry columns.
struct EntryRow {
    id: i64,
    task_id: i64,
    start_time: String,
    end_time: Option<String>,
    duration: Option<i64>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            duration: row.get(4)?,
        })
    }

    fn into_entry(self) -> Result<TimeEntry, DbError> {
        let end_time = self
            .end_time
            .as_deref()
            .map(|value| parse_timestamp(value, "time_entries", "end_time", self.id))
            .transpose()?;
        let duration = self
            .duration
            .map(|secs| {
                u64::try_from(secs).map_err(|_| DbError::InvalidRow {
                    table: "time_entries",
                    id: self.id,
                    message: format!("negative duration {secs}"),
                })
            })
            .transpose()?;

        Ok(TimeEntry {
            id: TimeEntryId::new(self.id),
            task_id: TaskId::new(self.task_id),
            start_time: parse_timestamp(&self.start_time, "time_entries", "start_time", self.id)?,
            end_time,
            duration,
        })
    }
}

fn insert_history(
    conn: &Connection,
    task_id: TaskId,
    change: &HistoryChange,
    at: DateTime<Utc>,
) -> rusqlite::Result<HistoryEntryId> {
    conn.execute(
        "
        INSERT INTO task_history (task_id, changed_at, field_name, old_value, new_value)
        VALUES (?, ?, ?, ?, ?)
        ",
        params![
            task_id.get(),
            format_timestamp(at),
            change.field_name,
            change.old_value,
            change.new_value,
        ],
    )?;
    Ok(HistoryEntryId::new(conn.last_insert_rowid()))
}

/// Column value for a field present in `update`.
fn column_value(update: &TaskUpdate, field: TaskField) -> Value {
    match field {
        TaskField::Completed => Value::Integer(i64::from(update.completed.unwrap_or_default())),
        TaskField::Priority => Value::Integer(i64::from(update.priority.unwrap_or_default())),
        _ => update
            .new_value(field)
            .flatten()
            .map_or(Value::Null, Value::Text),
    }
}

const fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Name => "name ASC, id ASC",
        SortKey::Deadline => "deadline IS NULL, deadline ASC, name ASC, id ASC",
        SortKey::Priority => "priority DESC, name ASC, id ASC",
        SortKey::Category => "category ASC, name ASC, id ASC",
    }
}

fn parse_timestamp(
    value: &str,
    table: &'static str,
    column: &'static str,
    id: i64,
) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            column,
            id,
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
