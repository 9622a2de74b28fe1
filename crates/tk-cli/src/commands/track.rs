//! Interactive timer loop.
//!
//! One [`TimerEngine`] lives for the whole loop, so a session can be paused,
//! resumed and stopped across lines. Reaching end of input or `quit` stops any
//! active session before returning.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use tk_core::{Clock, TaskId, TimeEntryStore, TimerEngine, TimerStatus, format_hms};
use tk_db::Database;

use super::util::{hms, timestamp};

const HELP: &str = "\
Commands:
  start <id>  start timing a task
  pause       pause the running timer
  resume      resume a paused timer
  stop        stop and record the session
  elapsed     show time counted in this session
  status      show the timer state
  help        show this message
  quit        stop any active session and exit";

/// Whether the loop keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run<R: BufRead, W: Write>(reader: R, writer: &mut W, db: &mut Database) -> Result<()> {
    let mut timer = TimerEngine::new();
    drive(reader, writer, db, &mut timer)
}

fn drive<C: Clock, R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    db: &mut Database,
    timer: &mut TimerEngine<C>,
) -> Result<()> {
    for entry in db.open_time_entries()? {
        tracing::warn!(entry_id = %entry.id, task_id = %entry.task_id, "found orphaned open time entry");
        writeln!(
            writer,
            "warning: entry #{} for task #{} has been open since {}; run `tk reconcile` to discard it",
            entry.id,
            entry.task_id,
            timestamp(entry.start_time)
        )?;
    }
    writeln!(writer, "Type `help` for commands.")?;

    let outcome = read_commands(reader, writer, db, timer);
    finish(writer, db, timer)?;
    outcome
}

fn read_commands<C: Clock, R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    db: &mut Database,
    timer: &mut TimerEngine<C>,
) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("failed to read command")?;
        if handle_line(writer, db, timer, &line)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

/// Stops the active session, if any. Runs however the loop ended.
fn finish<C: Clock, W: Write>(
    writer: &mut W,
    db: &mut Database,
    timer: &mut TimerEngine<C>,
) -> Result<()> {
    if timer.active().is_none() {
        return Ok(());
    }
    match timer.stop(db) {
        Ok(stopped) => writeln!(
            writer,
            "Stopped task #{} after {}",
            stopped.task_id,
            hms(stopped.duration_secs)
        )?,
        Err(err) => {
            tracing::warn!(error = %err, "could not stop session on exit");
            timer.abandon();
            writeln!(writer, "error: {err}")?;
        }
    }
    Ok(())
}

/// Executes one command line against the engine.
///
/// Timer and storage errors are reported on `writer` and the loop continues;
/// only write failures are returned.
pub fn handle_line<C: Clock, W: Write>(
    writer: &mut W,
    db: &mut Database,
    timer: &mut TimerEngine<C>,
    line: &str,
) -> Result<Flow> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Flow::Continue);
    };

    let outcome = match command {
        "start" => {
            let Some(id) = words.next() else {
                writeln!(writer, "usage: start <id>")?;
                return Ok(Flow::Continue);
            };
            let Ok(task_id) = id.parse::<TaskId>() else {
                writeln!(writer, "error: invalid task id: {id}")?;
                return Ok(Flow::Continue);
            };
            timer.start(db, task_id).map(|entry| {
                format!("Started task #{task_id} (entry #{entry})")
            })
        }
        "pause" => timer
            .pause()
            .map(|()| format!("Paused at {}", format_hms(timer.elapsed()))),
        "resume" => timer.resume().map(|()| "Resumed".to_string()),
        "stop" => timer.stop(db).map(|stopped| {
            format!(
                "Stopped task #{} after {}",
                stopped.task_id,
                hms(stopped.duration_secs)
            )
        }),
        "elapsed" => Ok(format_hms(timer.elapsed())),
        "status" => Ok(describe(timer)),
        "help" => Ok(HELP.to_string()),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => {
            writeln!(writer, "unknown command: {other} (try `help`)")?;
            return Ok(Flow::Continue);
        }
    };

    match outcome {
        Ok(message) => writeln!(writer, "{message}")?,
        Err(err) => writeln!(writer, "error: {err}")?,
    }
    Ok(Flow::Continue)
}

fn describe<C: Clock>(timer: &TimerEngine<C>) -> String {
    match (timer.status(), timer.active()) {
        (TimerStatus::Idle, _) | (_, None) => "idle".to_string(),
        (status, Some(session)) => format!(
            "{status}: task #{} for {}",
            session.task_id,
            format_hms(timer.elapsed())
        ),
    }
}
