//! Add command for creating tasks.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;

use tk_core::{NewTask, TaskMutator};
use tk_db::Database;

use super::util;

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Task name.
    pub name: String,
    /// Longer description.
    #[arg(long, short)]
    pub description: Option<String>,
    /// Category label.
    #[arg(long)]
    pub category: Option<String>,
    /// Deadline as YYYY-MM-DD.
    #[arg(long, value_parser = util::parse_deadline)]
    pub deadline: Option<NaiveDate>,
    /// Mark the task as priority.
    #[arg(long, short)]
    pub priority: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &AddArgs, db: &mut Database) -> Result<()> {
    let task = NewTask {
        name: args.name.clone(),
        description: args.description.clone(),
        category: args.category.clone(),
        deadline: args.deadline,
        priority: args.priority,
    };

    let mutator = TaskMutator::new();
    let id = mutator.create(db, task)?;
    let created = mutator
        .get(&*db, id)?
        .ok_or(tk_core::Error::TaskNotFound(id))?;
    writeln!(writer, "Created task {}", util::label(&created))?;
    Ok(())
}
