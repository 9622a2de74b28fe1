//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::add::AddArgs;
use crate::commands::edit::EditArgs;
use crate::commands::list::ListArgs;

/// Personal task timer.
///
/// Create tasks, time work on them with a start/pause/resume/stop timer,
/// and keep an audit trail of every change.
#[derive(Debug, Parser)]
#[command(name = "tk", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a task.
    Add(AddArgs),

    /// Change fields of a task.
    Edit(EditArgs),

    /// Delete a task with its time entries and history.
    #[command(alias = "delete")]
    Rm {
        /// Task ID.
        id: i64,
    },

    /// List tasks.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a task with its time entries and history.
    Show {
        /// Task ID.
        id: i64,
    },

    /// Show the change history of a task.
    History {
        /// Task ID.
        id: i64,
    },

    /// Run the interactive timer, reading commands from stdin.
    Track,

    /// Show database location and unfinished time entries.
    Status,

    /// Discard time entries left open by an earlier run.
    Reconcile,
}
