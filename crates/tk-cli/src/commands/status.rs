//! Status command for showing the database location and unfinished entries.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use tk_core::{TaskStore, TimeEntryStore};
use tk_db::Database;

use super::util::timestamp;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let open = db.open_time_entries()?;

    writeln!(writer, "Task timer status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if open.is_empty() {
        writeln!(writer, "No unfinished time entries.")?;
        return Ok(());
    }

    writeln!(writer, "Unfinished time entries (run `tk reconcile` to discard):")?;
    for entry in open {
        let name = db
            .get_task(entry.task_id)?
            .map_or_else(|| "?".to_string(), |task| task.name);
        writeln!(
            writer,
            "- entry #{} for task #{} {} since {}",
            entry.id,
            entry.task_id,
            name,
            timestamp(entry.start_time)
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;
    use tk_core::{ManualClock, NewTask, TaskMutator, TimerEngine};

    #[test]
    fn status_lists_entries_left_open() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("tk.db");
        let mut db = Database::open(&db_path).unwrap();

        let clock = ManualClock::new("2026-01-05T09:00:00Z".parse::<DateTime<Utc>>().unwrap());
        let id = TaskMutator::with_clock(&clock)
            .create(&mut db, NewTask::named("Crashed"))
            .unwrap();
        TimerEngine::with_clock(&clock).start(&mut db, id).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &db_path).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/tk.db");
        assert_snapshot!(output, @r"
        Task timer status
        Database: [TEMP]/tk.db
        Unfinished time entries (run `tk reconcile` to discard):
        - entry #1 for task #1 Crashed since 2026-01-05T09:00:00Z
        ");
    }

    #[test]
    fn status_with_clean_database() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();

        run(&mut output, &db, Path::new("/data/tk.db")).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Task timer status
        Database: /data/tk.db
        No unfinished time entries.
        ");
    }
}
