//! Shared utilities for CLI commands

use chrono::{Local, TimeZone, Utc};
use journal::RunRecord;
use owo_colors::OwoColorize;

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: i64) -> String {
    let elapsed_ms = Utc::now().timestamp_millis() - ts_ms;
    if elapsed_ms < 0 {
        return "in the future".to_string();
    }

    let seconds = elapsed_ms / 1000;
    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: i64) -> String {
    match Local.timestamp_millis_opt(ts_ms).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{}ms", ts_ms),
    }
}

/// First 8 characters of a run ID
pub fn short_id(record: &RunRecord) -> String {
    record.id.to_string().chars().take(8).collect()
}

/// Display a run record on one line
pub fn display_run_compact(record: &RunRecord) {
    let counts = record.counts;
    let errors = if record.errors > 0 {
        format!("{} errors", record.errors).red().to_string()
    } else {
        "ok".green().to_string()
    };

    println!(
        "{} {} {} ~{} +{} -{} ={} {}",
        short_id(record).yellow(),
        format_relative_time(record.ts_unix_ms).dimmed(),
        record.mode.label().cyan(),
        counts.changed,
        counts.new,
        counts.deleted,
        counts.unchanged,
        errors
    );
}
