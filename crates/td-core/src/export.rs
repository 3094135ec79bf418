//! CSV export of time entries.
//!
//! Fields are written as-is with no quoting or escaping, so the output is
//! byte-for-byte the established format. A category name containing a comma
//! will therefore shift the columns of its row.

use std::fmt::Write as _;

use crate::calendar::Calendar;
use crate::entry::TimeEntry;

pub const CSV_HEADER: &str = "Date,Category,Start Time,End Time,Duration (minutes)";

/// Renders `entries` as CSV, one row per entry in the given order.
///
/// Dates and times are in the calendar's zone; durations are whole minutes,
/// truncated.
pub fn export_csv(entries: &[TimeEntry], calendar: &Calendar) -> String {
    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + entries.len() * 48);
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for entry in entries {
        // Writing to a String cannot fail.
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            calendar.format(entry.start_time(), "%Y-%m-%d"),
            entry.category_name,
            calendar.format(entry.start_time(), "%H:%M:%S"),
            calendar.format(entry.end_time(), "%H:%M:%S"),
            entry.duration().num_minutes(),
        );
    }
    csv
}
