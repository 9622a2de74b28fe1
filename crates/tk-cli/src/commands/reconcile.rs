//! Reconcile command for discarding time entries a crashed run left open.

use std::io::Write;

use anyhow::Result;

use tk_core::TimeEntryStore;
use tk_db::Database;

use super::util::timestamp;

/// Deletes every open entry. Task totals and history are untouched.
pub fn run<W: Write>(writer: &mut W, db: &mut Database) -> Result<()> {
    let open = db.open_time_entries()?;
    if open.is_empty() {
        writeln!(writer, "Nothing to reconcile.")?;
        return Ok(());
    }

    let mut discarded = 0_usize;
    for entry in open {
        if db.discard_time_entry(entry.id)? {
            tracing::info!(entry_id = %entry.id, task_id = %entry.task_id, "discarded open time entry");
            writeln!(
                writer,
                "Discarded entry #{} for task #{} (started {})",
                entry.id,
                entry.task_id,
                timestamp(entry.start_time)
            )?;
            discarded += 1;
        }
    }
    let noun = if discarded == 1 { "entry" } else { "entries" };
    writeln!(writer, "Discarded {discarded} {noun}.")?;
    Ok(())
}
