//! Tab-separated event report.
//!
//! The report starts with a header row followed by one row per event:
//!
//! ```text
//! Start	End	Diff	Summary
//! 06/01/2024 10:00:00	06/01/2024 11:30:00	1:30	Standup
//! ```
//!
//! A blank line precedes the first event of each new month. The month
//! tracker starts at January, so a report whose first event is in January
//! has no leading blank line while one starting in any later month does.

use std::io::{self, Write};

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use tracing::debug;

use crate::event::EventRecord;

/// Header row columns.
pub const HEADER: [&str; 4] = ["Start", "End", "Diff", "Summary"];

/// Timestamp layout used for the start and end columns.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Counts collected while writing a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Event rows written (header excluded).
    pub rows: usize,
    /// Blank separator lines written.
    pub month_breaks: usize,
}

/// Formats an elapsed span as `H:MM`.
///
/// Hours are the floor of total seconds over 3600 and are not wrapped at a
/// day; minutes come from the non-negative remainder, so an end one minute
/// before its start renders as `-1:59`.
pub fn format_duration(span: Duration) -> String {
    let total = span.num_seconds();
    let hours = total.div_euclid(3600);
    let minutes = total.rem_euclid(3600) / 60;
    format!("{hours}:{minutes:02}")
}

/// Formats an instant in its own offset as `MM/DD/YYYY HH:MM:SS`.
pub fn format_timestamp(instant: &DateTime<FixedOffset>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats one report row without the trailing newline.
pub fn format_row(event: &EventRecord) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        format_timestamp(&event.start),
        format_timestamp(&event.end),
        format_duration(event.duration()),
        event.summary
    )
}

/// Writes the report for `events` in the order given.
pub fn write_report<W, I>(out: &mut W, events: I) -> io::Result<ReportStats>
where
    W: Write,
    I: IntoIterator<Item = EventRecord>,
{
    let mut stats = ReportStats::default();
    let mut month = 1;

    writeln!(out, "{}", HEADER.join("\t"))?;

    for event in events {
        let event_month = event.start.month();
        if event_month != month {
            month = event_month;
            writeln!(out)?;
            stats.month_breaks += 1;
        }
        writeln!(out, "{}", format_row(&event))?;
        stats.rows += 1;
    }

    debug!(
        rows = stats.rows,
        month_breaks = stats.month_breaks,
        "report written"
    );
    Ok(stats)
}
