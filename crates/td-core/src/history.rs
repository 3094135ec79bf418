//! Grouping and summaries for the entry history.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::calendar::Calendar;
use crate::entry::TimeEntry;
use crate::types::duration_ms;

const TODAY: &str = "Today";
const YESTERDAY: &str = "Yesterday";
const THIS_WEEK: &str = "This Week";
const PINNED: [&str; 3] = [TODAY, YESTERDAY, THIS_WEEK];

/// Entries that share a history label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryGroup {
    pub label: String,
    pub entries: Vec<TimeEntry>,
}

/// Headline numbers for a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total_entries: usize,
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    #[serde(with = "duration_ms")]
    pub average_duration: Duration,
}

/// Label for an entry starting at `start`, relative to `now`.
///
/// "Today", "Yesterday", "This Week", or the month and year.
pub fn label_for(start: DateTime<Utc>, now: DateTime<Utc>, calendar: &Calendar) -> String {
    if calendar.is_same_day(start, now) {
        TODAY.to_string()
    } else if calendar.is_yesterday(start, now) {
        YESTERDAY.to_string()
    } else if calendar.is_same_week(start, now) {
        THIS_WEEK.to_string()
    } else {
        calendar.format(start, "%B %Y")
    }
}

/// Buckets entries by [`label_for`].
///
/// Groups come out as Today, Yesterday, This Week, then the remaining labels
/// in descending string order. Entries keep their input order within a group.
pub fn group_entries<'a>(
    entries: impl IntoIterator<Item = &'a TimeEntry>,
    now: DateTime<Utc>,
    calendar: &Calendar,
) -> Vec<HistoryGroup> {
    let mut groups: HashMap<String, Vec<TimeEntry>> = HashMap::new();
    for entry in entries {
        groups
            .entry(label_for(entry.start_time(), now, calendar))
            .or_default()
            .push(entry.clone());
    }

    let mut groups: Vec<HistoryGroup> = groups
        .into_iter()
        .map(|(label, entries)| HistoryGroup { label, entries })
        .collect();
    groups.sort_by(|a, b| {
        let pinned = |label: &str| PINNED.iter().position(|p| *p == label);
        match (pinned(&a.label), pinned(&b.label)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.label.cmp(&a.label),
        }
    });
    groups
}

pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a TimeEntry>) -> HistorySummary {
    let (count, total) = entries
        .into_iter()
        .fold((0_usize, Duration::zero()), |(n, total), e| {
            (n + 1, total + e.duration())
        });
    let average = match i64::try_from(count) {
        Ok(n) if n > 0 => Duration::milliseconds(total.num_milliseconds() / n),
        _ => Duration::zero(),
    };
    HistorySummary {
        total_entries: count,
        total_time: total,
        average_duration: average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::types::CategoryId;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn entry(start: &str, minutes: i64) -> TimeEntry {
        let start = at(start);
        let end = start + Duration::minutes(minutes);
        TimeEntry::new(CategoryId::new(), "Work", start, end, end).unwrap()
    }

    #[test]
    fn labels() {
        let calendar = Calendar::utc();
        // Thursday.
        let now = at("2024-03-14T12:00:00Z");
        assert_eq!(label_for(at("2024-03-14T08:00:00Z"), now, &calendar), "Today");
        assert_eq!(label_for(at("2024-03-13T23:00:00Z"), now, &calendar), "Yesterday");
        assert_eq!(label_for(at("2024-03-11T09:00:00Z"), now, &calendar), "This Week");
        assert_eq!(label_for(at("2024-03-10T09:00:00Z"), now, &calendar), "March 2024");
        assert_eq!(label_for(at("2023-12-01T09:00:00Z"), now, &calendar), "December 2023");
    }

    #[test]
    fn group_order() {
        let calendar = Calendar::utc();
        let now = at("2024-03-14T12:00:00Z");
        let entries = vec![
            entry("2024-03-14T09:00:00Z", 10),
            entry("2024-03-14T08:00:00Z", 10),
            entry("2024-03-13T09:00:00Z", 10),
            entry("2024-03-12T09:00:00Z", 10),
            entry("2024-03-01T09:00:00Z", 10),
            entry("2024-02-01T09:00:00Z", 10),
            entry("2024-01-15T09:00:00Z", 10),
        ];
        let groups = group_entries(&entries, now, &calendar);
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        // Remaining labels sort as strings, not chronologically.
        assert_eq!(
            labels,
            [
                "Today",
                "Yesterday",
                "This Week",
                "March 2024",
                "January 2024",
                "February 2024"
            ]
        );
        assert_eq!(groups[0].entries, entries[..2]);
    }

    #[test]
    fn summary() {
        let entries = vec![entry("2024-03-14T09:00:00Z", 30), entry("2024-03-14T10:00:00Z", 60)];
        let summary = summarize(&entries);
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_time, Duration::minutes(90));
        assert_eq!(summary.average_duration, Duration::minutes(45));

        let empty = summarize(&Vec::<TimeEntry>::new());
        assert_eq!(empty.total_entries, 0);
        assert_eq!(empty.average_duration, Duration::zero());
    }
}
