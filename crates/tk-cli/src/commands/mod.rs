//! CLI subcommand implementations.

pub mod add;
pub mod edit;
pub mod list;
pub mod reconcile;
pub mod remove;
pub mod show;
pub mod status;
pub mod track;
pub mod util;
