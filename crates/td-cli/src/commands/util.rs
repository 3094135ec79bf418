//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use td_core::{Calendar, CategoryId, EntryId, Tracker};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Length of the entry ID prefix shown in listings.
pub const SHORT_ID_LEN: usize = 8;

/// Parse a datetime string as ISO 8601, local wall-clock time, or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Local: "2026-01-15 10:30", interpreted in the calendar's zone
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(
    s: &str,
    now: DateTime<Utc>,
    calendar: &Calendar,
) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();

    // Try ISO 8601 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Ok(calendar.from_local(naive));
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), local (e.g., '2026-01-15 10:30') or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Parse a `YYYY-MM-DD` date as local midnight.
pub fn parse_day(s: &str, calendar: &Calendar) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {s}. Use YYYY-MM-DD"))?;
    Ok(calendar.midnight(date))
}

/// Resolve a category by ID or case-insensitive name.
pub fn resolve_category(tracker: &Tracker, query: &str) -> anyhow::Result<CategoryId> {
    let by_id = query
        .parse::<CategoryId>()
        .ok()
        .filter(|id| tracker.categories().get(*id).is_some());
    if let Some(id) = by_id {
        return Ok(id);
    }
    tracker
        .categories()
        .find_by_name(query)
        .map(|c| c.id)
        .with_context(|| format!("no category named '{query}'"))
}

/// Resolve an entry by full ID or unique ID prefix.
pub fn resolve_entry(tracker: &Tracker, query: &str) -> anyhow::Result<EntryId> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        anyhow::bail!("entry id must not be empty");
    }
    let mut matches = tracker
        .entries()
        .all()
        .iter()
        .map(|e| e.id)
        .filter(|id| id.to_string().starts_with(&query));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => anyhow::bail!("no entry with id '{query}'"),
        (Some(_), Some(_)) => anyhow::bail!("entry id '{query}' is ambiguous"),
    }
}

/// First characters of an entry ID, as shown in listings.
pub fn short_id(id: EntryId) -> String {
    id.to_string().chars().take(SHORT_ID_LEN).collect()
}
