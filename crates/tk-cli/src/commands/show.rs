//! Show and history commands for inspecting a single task.

use std::io::Write;

use anyhow::{Context, Result};

use tk_core::{HistoryEntry, TaskId, TaskMutator, TimeEntry};
use tk_db::Database;

use super::util::{hms, or_dash, timestamp};

/// Prints the task fields, its time entries and its history.
pub fn run<W: Write>(writer: &mut W, id: i64, db: &Database) -> Result<()> {
    let id = TaskId::new(id);
    let tasks = TaskMutator::new();
    let task = tasks
        .get(db, id)?
        .ok_or(tk_core::Error::TaskNotFound(id))
        .with_context(|| format!("failed to show task {id}"))?;
    let entries = tasks.time_entries(db, id)?;
    let history = tasks.history(db, id)?;

    let deadline = task.deadline.map(tk_core::types::format_date);
    writeln!(writer, "Task #{} {}", task.id, task.name)?;
    writeln!(writer, "Description: {}", or_dash(task.description.as_deref()))?;
    writeln!(writer, "Category:    {}", or_dash(task.category.as_deref()))?;
    writeln!(writer, "Deadline:    {}", or_dash(deadline.as_deref()))?;
    writeln!(writer, "Completed:   {}", yes_no(task.completed))?;
    writeln!(writer, "Priority:    {}", yes_no(task.priority))?;
    writeln!(writer, "Total time:  {}", hms(task.total_time))?;
    writeln!(writer, "Created:     {}", timestamp(task.created_at))?;

    writeln!(writer)?;
    if entries.is_empty() {
        writeln!(writer, "No time entries.")?;
    } else {
        writeln!(writer, "Time entries:")?;
        for entry in &entries {
            write_entry(writer, entry)?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "History:")?;
    write_history(writer, &history)
}

/// Prints only the change history of a task, most recent first.
pub fn history<W: Write>(writer: &mut W, id: i64, db: &Database) -> Result<()> {
    let id = TaskId::new(id);
    let history = TaskMutator::new()
        .history(db, id)
        .with_context(|| format!("failed to read history of task {id}"))?;
    write_history(writer, &history)
}

fn write_entry<W: Write>(writer: &mut W, entry: &TimeEntry) -> Result<()> {
    match (entry.end_time, entry.duration) {
        (Some(end), Some(duration)) => writeln!(
            writer,
            "#{}  {} -> {}  {}",
            entry.id,
            timestamp(entry.start_time),
            timestamp(end),
            hms(duration)
        )?,
        _ => writeln!(
            writer,
            "#{}  {} -> (open)",
            entry.id,
            timestamp(entry.start_time)
        )?,
    }
    Ok(())
}

fn write_history<W: Write>(writer: &mut W, history: &[HistoryEntry]) -> Result<()> {
    for entry in history {
        writeln!(
            writer,
            "{}  {}: {} -> {}",
            timestamp(entry.changed_at),
            entry.field_name,
            or_dash(entry.old_value.as_deref()),
            or_dash(entry.new_value.as_deref())
        )?;
    }
    Ok(())
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
