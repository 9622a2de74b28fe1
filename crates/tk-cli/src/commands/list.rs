//! List command for filtered, sorted task listings.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use tk_core::{SortKey, Task, TaskFilter, TaskMutator};
use tk_db::Database;

use super::util::{hms, or_dash};

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Only completed (true) or open (false) tasks.
    #[arg(long)]
    pub completed: Option<bool>,
    /// Only priority (true) or non-priority (false) tasks.
    #[arg(long)]
    pub priority: Option<bool>,
    /// Only tasks in this category.
    #[arg(long)]
    pub category: Option<String>,
    /// Sort by name, deadline, priority or category.
    #[arg(long, default_value = "name")]
    pub sort: String,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ListArgs, db: &Database) -> Result<()> {
    let filter = TaskFilter {
        completed: args.completed,
        priority: args.priority,
        category: args.category.clone(),
    };
    let sort = SortKey::parse_lenient(&args.sort);
    let tasks = TaskMutator::new().list(db, &filter, sort)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&tasks)?)?;
        return Ok(());
    }

    if tasks.is_empty() {
        writeln!(writer, "No tasks.")?;
        return Ok(());
    }

    write_row(writer, ["ID", "DONE", "PRI", "DEADLINE", "CATEGORY", "TIME", "NAME"])?;
    for task in &tasks {
        write_task(writer, task)?;
    }
    Ok(())
}

fn write_task<W: Write>(writer: &mut W, task: &Task) -> Result<()> {
    let id = task.id.to_string();
    let deadline = task.deadline.map(tk_core::types::format_date);
    let time = hms(task.total_time);
    write_row(
        writer,
        [
            &id,
            if task.completed { "[x]" } else { "[ ]" },
            if task.priority { "!" } else { "" },
            or_dash(deadline.as_deref()),
            or_dash(task.category.as_deref()),
            &time,
            &task.name,
        ],
    )
}

fn write_row<W: Write>(
    writer: &mut W,
    [id, done, pri, deadline, category, time, name]: [&str; 7],
) -> Result<()> {
    writeln!(
        writer,
        "{id:<4}  {done:<4}  {pri:<3}  {deadline:<10}  {category:<12}  {time:<8}  {name}"
    )?;
    Ok(())
}
