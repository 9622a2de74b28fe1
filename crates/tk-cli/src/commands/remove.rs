//! Remove command for deleting a task and everything attached to it.

use std::io::Write;

use anyhow::{Context, Result};

use tk_core::{TaskId, TaskMutator};
use tk_db::Database;

pub fn run<W: Write>(writer: &mut W, id: i64, db: &mut Database) -> Result<()> {
    let id = TaskId::new(id);
    TaskMutator::new()
        .delete(db, id)
        .with_context(|| format!("failed to delete task {id}"))?;
    writeln!(writer, "Deleted task #{id}")?;
    Ok(())
}
