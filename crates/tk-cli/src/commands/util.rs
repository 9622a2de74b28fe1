//! Shared utilities for CLI commands.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tk_core::{Task, format_hms};

/// Parses a `YYYY-MM-DD` deadline argument.
pub fn parse_deadline(s: &str) -> Result<NaiveDate, String> {
    tk_core::types::parse_date(s).ok_or_else(|| format!("invalid date: {s} (expected YYYY-MM-DD)"))
}

/// Formats whole seconds as `HH:MM:SS`.
pub fn hms(secs: u64) -> String {
    format_hms(Duration::from_secs(secs))
}

/// Formats a stored timestamp for display.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Renders an optional value, using `-` for absent.
pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// One-line summary: `#3 Write report`.
pub fn label(task: &Task) -> String {
    format!("#{} {}", task.id, task.name)
}
