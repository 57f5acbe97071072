//! Plain-text formatting of history entries.
//!
//! These helpers produce human-readable strings for terminal front ends,
//! logs and exports. Markup rendering belongs to the presentation layer.

use super::models::{Record, Source};
use super::projector::ProjectedItem;
use chrono::{DateTime, Local, Utc};

/// Formats projected items as list lines, marking the active one.
///
/// Example: `"> What is Rust?"` for the active item, `"  Hello"` otherwise.
pub fn format_history_list(items: &[ProjectedItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let marker = if item.is_active { '>' } else { ' ' };
            format!("{} {}", marker, item.display_label)
        })
        .collect()
}

/// Formats a record with prompt, response and numbered citations.
pub fn format_record_details(record: &Record) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════\n");
    output.push_str(&format!("Entry ID: {}\n", record.id));
    output.push_str(&format!(
        "Created: {}\n",
        format_timestamp_detailed(&record.created_at)
    ));
    output.push_str("═══════════════════════════════════════════════════════════\n\n");

    output.push_str("PROMPT\n");
    output.push_str("───────────────────────────────────────────────────────────\n");
    output.push_str(record.prompt.trim());
    output.push_str("\n\n");

    output.push_str("RESPONSE\n");
    output.push_str("───────────────────────────────────────────────────────────\n");
    if record.response.trim().is_empty() {
        output.push_str("[Empty response]\n");
    } else {
        output.push_str(record.response.trim());
        output.push('\n');
    }

    if record.has_sources() {
        output.push_str("\nSOURCES\n");
        output.push_str("───────────────────────────────────────────────────────────\n");
        output.push_str(&format_sources(&record.sources));
    }

    output.push_str("\n═══════════════════════════════════════════════════════════\n");
    output
}

/// Formats citations as a numbered list, one per line.
///
/// Example: `"[1] Rust Book - https://doc.rust-lang.org/book/"`.
pub fn format_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            if source.title.trim().is_empty() {
                format!("[{}] {}\n", index + 1, source.uri)
            } else {
                format!("[{}] {} - {}\n", index + 1, source.title.trim(), source.uri)
            }
        })
        .collect()
}

/// Formats a timestamp in local time: `"YYYY-MM-DD HH:MM:SS"`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    let local_time: DateTime<Local> = timestamp.with_timezone(&Local);
    local_time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Formats a timestamp in local time with the zone: `"YYYY-MM-DD HH:MM:SS TZ"`.
pub fn format_timestamp_detailed(timestamp: &DateTime<Utc>) -> String {
    let local_time: DateTime<Local> = timestamp.with_timezone(&Local);
    local_time.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// Describes how long before `now` a timestamp was ("2 hours ago", "yesterday").
///
/// Timestamps in the future are reported as "just now".
pub fn format_relative_time(timestamp: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(*timestamp);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        let minutes = duration.num_minutes();
        format!("{} minute{} ago", minutes, plural(minutes))
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        format!("{} hour{} ago", hours, plural(hours))
    } else if duration.num_days() < 7 {
        let days = duration.num_days();
        if days == 1 {
            "yesterday".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else if duration.num_weeks() < 4 {
        let weeks = duration.num_weeks();
        format!("{} week{} ago", weeks, plural(weeks))
    } else if duration.num_days() < 365 {
        let months = duration.num_days() / 30;
        format!("{} month{} ago", months, plural(months))
    } else {
        let years = duration.num_days() / 365;
        format!("{} year{} ago", years, plural(years))
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Summarizes a history: entry count, how many carry citations, time span.
pub fn format_history_stats(records: &[Record]) -> String {
    let total = records.len();
    let cited = records.iter().filter(|r| r.has_sources()).count();
    let percent = if total > 0 {
        (cited as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let mut summary = format!(
        "Total: {} | With sources: {} ({:.1}%)",
        total, cited, percent
    );

    let oldest = records.iter().map(|r| r.created_at).min();
    let newest = records.iter().map(|r| r.created_at).max();
    if let (Some(oldest), Some(newest)) = (oldest, newest) {
        summary.push_str(&format!(
            " | From: {} | To: {}",
            format_timestamp(&oldest),
            format_timestamp(&newest)
        ));
    }

    summary
}
