//! Edit command for audited task updates.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Args;

use tk_core::{TaskId, TaskMutator, TaskUpdate, UpdateOutcome};
use tk_db::Database;

use super::util;

#[derive(Debug, Default, Args)]
pub struct EditArgs {
    /// Task ID.
    pub id: i64,
    /// New name.
    #[arg(long)]
    pub name: Option<String>,
    /// New description.
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    /// Remove the description.
    #[arg(long)]
    pub clear_description: bool,
    /// New category.
    #[arg(long, conflicts_with = "clear_category")]
    pub category: Option<String>,
    /// Remove the category.
    #[arg(long)]
    pub clear_category: bool,
    /// New deadline as YYYY-MM-DD.
    #[arg(long, value_parser = util::parse_deadline, conflicts_with = "clear_deadline")]
    pub deadline: Option<NaiveDate>,
    /// Remove the deadline.
    #[arg(long)]
    pub clear_deadline: bool,
    /// Mark completed (true) or open (false).
    #[arg(long)]
    pub completed: Option<bool>,
    /// Set or unset priority.
    #[arg(long)]
    pub priority: Option<bool>,
    /// Raw `field=value` assignment; unknown fields are ignored.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,
}

impl EditArgs {
    /// Builds the update, applying typed flags over `--set` pairs.
    fn to_update(&self) -> Result<TaskUpdate> {
        let mut pairs = Vec::with_capacity(self.set.len());
        for assignment in &self.set {
            let Some((field, value)) = assignment.split_once('=') else {
                bail!("expected FIELD=VALUE, got: {assignment}");
            };
            pairs.push((field.trim(), value));
        }
        let mut update = TaskUpdate::from_fields(pairs)?;

        if let Some(name) = &self.name {
            update.name = Some(name.clone());
        }
        if self.clear_description {
            update.description = Some(None);
        } else if let Some(description) = &self.description {
            update.description = Some(Some(description.clone()));
        }
        if self.clear_category {
            update.category = Some(None);
        } else if let Some(category) = &self.category {
            update.category = Some(Some(category.clone()));
        }
        if self.clear_deadline {
            update.deadline = Some(None);
        } else if let Some(deadline) = self.deadline {
            update.deadline = Some(Some(deadline));
        }
        if let Some(completed) = self.completed {
            update.completed = Some(completed);
        }
        if let Some(priority) = self.priority {
            update.priority = Some(priority);
        }
        Ok(update)
    }
}

pub fn run<W: Write>(writer: &mut W, args: &EditArgs, db: &mut Database) -> Result<()> {
    let id = TaskId::new(args.id);
    let update = args.to_update()?;

    let outcome = TaskMutator::new()
        .update(db, id, &update)
        .with_context(|| format!("failed to update task {id}"))?;
    match outcome {
        UpdateOutcome::NoChanges => writeln!(writer, "No changes for task #{id}")?,
        UpdateOutcome::Applied { fields } => {
            let noun = if fields == 1 { "field" } else { "fields" };
            writeln!(writer, "Updated task #{id} ({fields} {noun})")?;
        }
    }
    Ok(())
}
