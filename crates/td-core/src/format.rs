//! Human-readable renderings of durations, ratios and times.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::calendar::Calendar;

/// Formats a duration as `"Xh Ym"`, or `"Ym"` under an hour.
///
/// Seconds are truncated. Negative durations render as `"0m"`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.num_milliseconds();
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats a running clock as `HH:MM:SS`. Hours are not capped at 24.
pub fn format_clock(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats a fraction (`0.0..=1.0`) as a percentage with one decimal.
pub fn format_percentage(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Formats a work/rest ratio as `"N.N:1"`, or `"N/A"` when there is no ratio.
pub fn format_ratio(ratio: f64) -> String {
    if ratio > 0.0 {
        format!("{ratio:.1}:1")
    } else {
        "N/A".to_string()
    }
}

/// Formats a time of day in the calendar's zone.
pub fn format_time(t: DateTime<Utc>, calendar: &Calendar, use_24_hour: bool) -> String {
    if use_24_hour {
        calendar.format(t, "%H:%M")
    } else {
        calendar.format(t, "%-I:%M %p")
    }
}

pub fn format_time_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    calendar: &Calendar,
    use_24_hour: bool,
) -> String {
    format!(
        "{} - {}",
        format_time(start, calendar, use_24_hour),
        format_time(end, calendar, use_24_hour)
    )
}

/// Coarse reading of the work/rest ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceIndicator {
    NoData,
    WellRested,
    Balanced,
    WorkFocused,
    NeedRest,
}

impl BalanceIndicator {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio.is_nan() || ratio <= 0.0 {
            Self::NoData
        } else if ratio < 0.5 {
            Self::WellRested
        } else if ratio < 1.5 {
            Self::Balanced
        } else if ratio < 2.5 {
            Self::WorkFocused
        } else {
            Self::NeedRest
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NoData => "No data",
            Self::WellRested => "Well rested",
            Self::Balanced => "Balanced",
            Self::WorkFocused => "Work focused",
            Self::NeedRest => "Need rest",
        }
    }
}

impl fmt::Display for BalanceIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
