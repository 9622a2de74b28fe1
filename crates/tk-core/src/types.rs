//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The task name was empty or whitespace only.
    #[error("task name cannot be empty")]
    EmptyName,

    /// A field value could not be parsed.
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: TaskField, value: String },
}

/// Generates a store-assigned integer ID newtype with common trait implementations.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row ID.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row ID.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_row_id!(
    /// Identifier of a task row.
    TaskId
);

define_row_id!(
    /// Identifier of a time entry row.
    TimeEntryId
);

define_row_id!(
    /// Identifier of a history row.
    HistoryEntryId
);

/// History field name recorded when a task is created.
pub const CREATION_FIELD: &str = "creation";

/// History field name recorded when a session adds to a task's total time.
pub const TOTAL_TIME_FIELD: &str = "total_time";

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub completed: bool,
    pub priority: bool,
    /// Accumulated tracked time in whole seconds.
    pub total_time: u64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Returns the stringified value of an updatable field, `None` when absent.
    pub fn field_value(&self, field: TaskField) -> Option<String> {
        match field {
            TaskField::Name => Some(self.name.clone()),
            TaskField::Description => self.description.clone(),
            TaskField::Category => self.category.clone(),
            TaskField::Deadline => self.deadline.map(format_date),
            TaskField::Completed => Some(self.completed.to_string()),
            TaskField::Priority => Some(self.priority.to_string()),
        }
    }
}

/// Fields for a task that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: bool,
}

impl NewTask {
    /// Creates a task with just a name; the remaining fields take their defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One timing session for a task. Open while `end_time` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Session duration in whole seconds.
    pub duration: Option<u64>,
}

impl TimeEntry {
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// An append-only audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub task_id: TaskId,
    pub changed_at: DateTime<Utc>,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// A history row waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryChange {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl HistoryChange {
    pub fn new(
        field_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            old_value,
            new_value,
        }
    }
}

/// Everything needed to close an open time entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCompletion {
    pub entry_id: TimeEntryId,
    pub task_id: TaskId,
    pub end_time: DateTime<Utc>,
    pub duration_secs: u64,
}

/// The closed set of task fields that can be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Name,
    Description,
    Category,
    Deadline,
    Completed,
    Priority,
}

impl TaskField {
    /// All updatable fields, in the order their history rows are written.
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::Description,
        Self::Category,
        Self::Deadline,
        Self::Completed,
        Self::Priority,
    ];

    /// Column and history field name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Category => "category",
            Self::Deadline => "deadline",
            Self::Completed => "completed",
            Self::Priority => "priority",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for field names outside the updatable set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task field: {0}")]
pub struct UnknownField(String);

impl FromStr for TaskField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A structured partial update: one optional slot per updatable field.
///
/// For the nullable fields the outer `Option` says whether the field is
/// being changed and the inner one carries the new value, so
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
    pub priority: Option<bool>,
}

impl TaskUpdate {
    /// Builds an update from textual `(field, value)` pairs.
    ///
    /// Unrecognized field names are skipped. An empty value clears a
    /// nullable field. Later pairs for the same field win.
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = Self::default();
        for (name, value) in fields {
            let Ok(field) = name.parse::<TaskField>() else {
                tracing::debug!(field = name, "ignoring unrecognized task field");
                continue;
            };
            let invalid = || ValidationError::InvalidValue {
                field,
                value: value.to_string(),
            };
            match field {
                TaskField::Name => update.name = Some(value.to_string()),
                TaskField::Description => update.description = Some(non_empty(value)),
                TaskField::Category => update.category = Some(non_empty(value)),
                TaskField::Deadline => {
                    let deadline = match non_empty(value) {
                        Some(text) => Some(parse_date(&text).ok_or_else(invalid)?),
                        None => None,
                    };
                    update.deadline = Some(deadline);
                }
                TaskField::Completed => update.completed = Some(parse_flag(value).ok_or_else(invalid)?),
                TaskField::Priority => update.priority = Some(parse_flag(value).ok_or_else(invalid)?),
            }
        }
        Ok(update)
    }

    /// Fields present in this update, in history order.
    pub fn fields(&self) -> Vec<TaskField> {
        TaskField::ALL
            .into_iter()
            .filter(|field| self.touches(*field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Returns the stringified new value for a present field.
    ///
    /// The outer `Option` is `None` when the field is not part of the update.
    pub fn new_value(&self, field: TaskField) -> Option<Option<String>> {
        match field {
            TaskField::Name => self.name.clone().map(Some),
            TaskField::Description => self.description.clone(),
            TaskField::Category => self.category.clone(),
            TaskField::Deadline => self.deadline.map(|d| d.map(format_date)),
            TaskField::Completed => self.completed.map(|v| Some(v.to_string())),
            TaskField::Priority => self.priority.map(|v| Some(v.to_string())),
        }
    }

    const fn touches(&self, field: TaskField) -> bool {
        match field {
            TaskField::Name => self.name.is_some(),
            TaskField::Description => self.description.is_some(),
            TaskField::Category => self.category.is_some(),
            TaskField::Deadline => self.deadline.is_some(),
            TaskField::Completed => self.completed.is_some(),
            TaskField::Priority => self.priority.is_some(),
        }
    }
}

/// Task list filter. Each criterion is optional and applied independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub priority: Option<bool>,
    pub category: Option<String>,
}

/// Task list ordering. Ties always resolve by name ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    /// Tasks without a deadline last, then by date.
    Deadline,
    /// Priority tasks first.
    Priority,
    /// Grouped by category text.
    Category,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Deadline => "deadline",
            Self::Priority => "priority",
            Self::Category => "category",
        }
    }

    /// Parses a sort key, falling back to [`SortKey::Name`] for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "deadline" => Self::Deadline,
            "priority" => Self::Priority,
            "category" => Self::Category,
            "name" => Self::Name,
            other => {
                tracing::debug!(sort = other, "unrecognized sort key, using name");
                Self::Name
            }
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a deadline the way it is stored and shown in history.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
