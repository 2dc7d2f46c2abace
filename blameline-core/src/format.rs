//! Formatting helpers shared by decorations, hovers and the CLI.

use chrono::{Local, TimeZone};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Format an epoch timestamp relative to `now` (e.g., "3 days ago").
pub fn format_relative_time(timestamp: i64, now: i64) -> String {
    let diff = now.saturating_sub(timestamp);

    if diff < MINUTE {
        "just now".to_string()
    } else if diff < HOUR {
        plural(diff / MINUTE, "minute")
    } else if diff < DAY {
        plural(diff / HOUR, "hour")
    } else if diff < MONTH {
        plural(diff / DAY, "day")
    } else if diff < YEAR {
        plural(diff / MONTH, "month")
    } else {
        plural(diff / YEAR, "year")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Truncate to at most `max_chars` characters, ending in `...` when shortened.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Format an epoch timestamp in the local time zone.
pub fn format_local_timestamp(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        None => "unknown date".to_string(),
    }
}
