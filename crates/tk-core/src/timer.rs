//! Single-session timer state machine.
//!
//! `Idle -> Running <-> Paused -> Idle`. The engine holds at most one open
//! time entry, which is what keeps the "one open entry system-wide" rule: a
//! second `start` is refused until the first session stops.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result, TimerStateError};
use crate::store::TimeEntryStore;
use crate::types::{EntryCompletion, TaskId, TimeEntryId};

/// Public view of the engine's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

impl TimerStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The task and open entry a session is timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub task_id: TaskId,
    pub entry_id: TimeEntryId,
    pub started_at: DateTime<Utc>,
}

/// Result of a successful `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoppedSession {
    pub task_id: TaskId,
    pub entry_id: TimeEntryId,
    /// Whole seconds recorded on the entry and added to the task.
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Idle,
    /// `carried` is time accumulated before the latest resume; the live
    /// interval is measured from `anchor`.
    Running {
        session: ActiveSession,
        anchor: Instant,
        carried: Duration,
    },
    Paused {
        session: ActiveSession,
        elapsed: Duration,
    },
}

/// Owns the single timing session.
///
/// Operations that fail leave the engine exactly as it was before the call.
#[derive(Debug)]
pub struct TimerEngine<C = SystemClock> {
    clock: C,
    mode: Mode,
}

impl TimerEngine<SystemClock> {
    pub const fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerEngine<C> {
    pub const fn with_clock(clock: C) -> Self {
        Self {
            clock,
            mode: Mode::Idle,
        }
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn status(&self) -> TimerStatus {
        match self.mode {
            Mode::Idle => TimerStatus::Idle,
            Mode::Running { .. } => TimerStatus::Running,
            Mode::Paused { .. } => TimerStatus::Paused,
        }
    }

    pub const fn active(&self) -> Option<ActiveSession> {
        match self.mode {
            Mode::Idle => None,
            Mode::Running { session, .. } | Mode::Paused { session, .. } => Some(session),
        }
    }

    /// Opens a time entry for `task_id` and starts counting.
    pub fn start<S: TimeEntryStore>(&mut self, store: &mut S, task_id: TaskId) -> Result<TimeEntryId> {
        if !matches!(self.mode, Mode::Idle) {
            return Err(TimerStateError::AlreadyRunning.into());
        }
        if !store.task_exists(task_id).map_err(Error::store)? {
            return Err(Error::TaskNotFound(task_id));
        }

        let started_at = self.clock.wall_clock();
        let entry_id = store
            .insert_time_entry(task_id, started_at)
            .map_err(Error::store)?;

        self.mode = Mode::Running {
            session: ActiveSession {
                task_id,
                entry_id,
                started_at,
            },
            anchor: self.clock.now(),
            carried: Duration::ZERO,
        };
        tracing::debug!(%task_id, %entry_id, "timer started");
        Ok(entry_id)
    }

    /// Suspends accounting. Storage is not touched.
    pub fn pause(&mut self) -> Result<()> {
        let Mode::Running {
            session,
            anchor,
            carried,
        } = self.mode
        else {
            return Err(TimerStateError::NotRunning.into());
        };

        let elapsed = carried + self.clock.now().saturating_duration_since(anchor);
        self.mode = Mode::Paused { session, elapsed };
        tracing::debug!(task_id = %session.task_id, elapsed_ms = elapsed.as_millis(), "timer paused");
        Ok(())
    }

    /// Continues a paused session; time spent paused is not counted.
    pub fn resume(&mut self) -> Result<()> {
        let Mode::Paused { session, elapsed } = self.mode else {
            return Err(TimerStateError::NotPaused.into());
        };

        self.mode = Mode::Running {
            session,
            anchor: self.clock.now(),
            carried: elapsed,
        };
        tracing::debug!(task_id = %session.task_id, "timer resumed");
        Ok(())
    }

    /// Ends the session, persisting the entry, the task total and its history row.
    ///
    /// The `total_time` history row records the old and new totals.
    pub fn stop<S: TimeEntryStore>(&mut self, store: &mut S) -> Result<StoppedSession> {
        let Some(session) = self.active() else {
            return Err(TimerStateError::NotActive.into());
        };

        let completion = EntryCompletion {
            entry_id: session.entry_id,
            task_id: session.task_id,
            end_time: self.clock.wall_clock(),
            duration_secs: self.elapsed().as_secs(),
        };
        if !store
            .complete_time_entry(&completion)
            .map_err(Error::store)?
        {
            return Err(Error::TimeEntryNotFound(session.entry_id));
        }

        self.mode = Mode::Idle;
        tracing::info!(
            task_id = %session.task_id,
            entry_id = %session.entry_id,
            duration_secs = completion.duration_secs,
            "timer stopped"
        );
        Ok(StoppedSession {
            task_id: session.task_id,
            entry_id: session.entry_id,
            duration_secs: completion.duration_secs,
        })
    }

    /// Time counted in the current session; zero when idle.
    pub fn elapsed(&self) -> Duration {
        match self.mode {
            Mode::Idle => Duration::ZERO,
            Mode::Running {
                anchor, carried, ..
            } => carried + self.clock.now().saturating_duration_since(anchor),
            Mode::Paused { elapsed, .. } => elapsed,
        }
    }

    /// Drops the in-memory session without writing anything.
    ///
    /// The open entry, if it still exists, is left for reconciliation.
    pub fn abandon(&mut self) -> Option<ActiveSession> {
        let session = self.active()?;
        self.mode = Mode::Idle;
        tracing::warn!(task_id = %session.task_id, entry_id = %session.entry_id, "timer session abandoned");
        Some(session)
    }
}
