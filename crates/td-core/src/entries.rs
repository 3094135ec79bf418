//! The store of completed time entries.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::calendar::Calendar;
use crate::entry::TimeEntry;
use crate::store::{Gateway, keys, log_failure};
use crate::types::{CategoryId, EntryId};

/// Number of entries shown as "recent" by default.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry not found: {0}")]
    NotFound(EntryId),
}

/// Criteria for narrowing the entry list.
///
/// Applied in order: category set, then search text, then day.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Keep only these categories. Empty means all.
    pub categories: HashSet<CategoryId>,
    /// Case-insensitive substring of the category name. Empty means all.
    pub search: String,
    /// Keep only entries starting on the same local day as this instant.
    pub day: Option<DateTime<Utc>>,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.search.trim().is_empty() && self.day.is_none()
    }
}

/// Completed entries, newest first, plus the running aggregates.
///
/// The whole list lives in memory and is written back on every change.
/// `totalTimeTracked` (seconds) and `firstEntryDate` are persisted alongside.
#[derive(Debug)]
pub struct EntryStore {
    entries: Vec<TimeEntry>,
    total: Duration,
    first_entry: Option<DateTime<Utc>>,
    gateway: Gateway,
    calendar: Calendar,
}

impl EntryStore {
    /// Loads entries and aggregates from the gateway.
    pub fn load(gateway: Gateway, calendar: Calendar) -> Self {
        let mut entries: Vec<TimeEntry> = gateway.load(keys::TIME_ENTRIES).unwrap_or_default();
        sort_newest_first(&mut entries);

        let sum: Duration = entries.iter().map(TimeEntry::duration).sum();
        let total = match gateway.load_f64(keys::TOTAL_TIME_TRACKED).map(seconds_to_duration) {
            Some(stored) if stored.num_milliseconds() == sum.num_milliseconds() => stored,
            Some(stored) => {
                tracing::warn!(
                    stored_ms = stored.num_milliseconds(),
                    entries_ms = sum.num_milliseconds(),
                    "stored total disagrees with entries, recomputing"
                );
                sum
            }
            None => sum,
        };
        let earliest = entries.iter().map(TimeEntry::start_time).min();
        let first_entry = match (gateway.load_date(keys::FIRST_ENTRY_DATE), earliest) {
            (Some(stored), Some(earliest)) => Some(stored.min(earliest)),
            (stored, earliest) => stored.or(earliest),
        };

        tracing::debug!(count = entries.len(), "loaded time entries");
        Self {
            entries,
            total,
            first_entry,
            gateway,
            calendar,
        }
    }

    pub fn all(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries whose start lies in `start..=end`. Both ends are inclusive.
    pub fn by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&TimeEntry> {
        self.entries
            .iter()
            .filter(|e| start <= e.start_time() && e.start_time() <= end)
            .collect()
    }

    /// Entries starting on the same local day as `day`.
    pub fn by_day(&self, day: DateTime<Utc>) -> Vec<&TimeEntry> {
        self.entries
            .iter()
            .filter(|e| self.calendar.is_same_day(e.start_time(), day))
            .collect()
    }

    pub fn by_category(&self, id: CategoryId) -> Vec<&TimeEntry> {
        self.entries.iter().filter(|e| e.category_id == id).collect()
    }

    /// Case-insensitive substring match on the cached category name.
    pub fn search(&self, query: &str) -> Vec<&TimeEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.category_name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn filter(&self, filter: &EntryFilter) -> Vec<&TimeEntry> {
        let needle = filter.search.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| filter.categories.is_empty() || filter.categories.contains(&e.category_id))
            .filter(|e| needle.is_empty() || e.category_name.to_lowercase().contains(&needle))
            .filter(|e| {
                filter
                    .day
                    .is_none_or(|day| self.calendar.is_same_day(e.start_time(), day))
            })
            .collect()
    }

    pub fn today(&self, now: DateTime<Utc>) -> Vec<&TimeEntry> {
        self.by_day(now)
    }

    pub fn today_total(&self, now: DateTime<Utc>) -> Duration {
        self.by_day(now).into_iter().map(TimeEntry::duration).sum()
    }

    /// Total of entries in the current week (week start plus seven days).
    pub fn week_total(&self, now: DateTime<Utc>) -> Duration {
        let start = self.calendar.start_of_week(now);
        let end = self.calendar.add_days(start, 7);
        self.by_date_range(start, end)
            .into_iter()
            .map(TimeEntry::duration)
            .sum()
    }

    /// The newest `limit` entries.
    pub fn recent(&self, limit: usize) -> &[TimeEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    pub const fn total_time_tracked(&self) -> Duration {
        self.total
    }

    pub const fn first_entry_date(&self) -> Option<DateTime<Utc>> {
        self.first_entry
    }

    /// Adds an entry and updates the aggregates.
    ///
    /// Returns whether the entry list reached storage. The in-memory store
    /// keeps the entry either way.
    pub fn create(&mut self, entry: TimeEntry) -> bool {
        tracing::debug!(
            entry = %entry.id,
            category = %entry.category_name,
            duration_ms = entry.duration().num_milliseconds(),
            "creating time entry"
        );
        self.lower_first_entry(entry.start_time());
        self.add_to_total(entry.duration());
        self.entries.push(entry);
        sort_newest_first(&mut self.entries);
        self.persist()
    }

    /// Replaces the entry with the same ID, applying the duration delta.
    pub fn update(&mut self, entry: TimeEntry) -> Result<(), EntryError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or(EntryError::NotFound(entry.id))?;
        let delta = entry.duration() - slot.duration();
        let start = entry.start_time();
        *slot = entry;

        self.lower_first_entry(start);
        self.add_to_total(delta);
        sort_newest_first(&mut self.entries);
        self.persist();
        Ok(())
    }

    /// Removes an entry and subtracts its duration from the total.
    pub fn delete(&mut self, id: EntryId) -> Result<TimeEntry, EntryError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(EntryError::NotFound(id))?;
        let removed = self.entries.remove(index);
        self.add_to_total(-removed.duration());
        self.persist();
        tracing::debug!(entry = %id, "deleted time entry");
        Ok(removed)
    }

    /// Sets or clears the notes of an entry.
    pub fn set_notes(&mut self, id: EntryId, notes: Option<&str>) -> Result<(), EntryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(EntryError::NotFound(id))?;
        entry.set_notes(notes);
        self.persist();
        Ok(())
    }

    /// Forgets every entry in memory. Storage is cleared by the caller.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.total = Duration::zero();
        self.first_entry = None;
    }

    fn lower_first_entry(&mut self, start: DateTime<Utc>) {
        if self.first_entry.is_none_or(|first| start < first) {
            self.first_entry = Some(start);
        }
    }

    fn add_to_total(&mut self, delta: Duration) {
        self.total = (self.total + delta).max(Duration::zero());
    }

    /// Writes the entry list, then the aggregates derived from it.
    ///
    /// The aggregates are only written once the list is stored, so a failed
    /// write never leaves them ahead of the entries.
    fn persist(&self) -> bool {
        if let Err(err) = self.gateway.save(keys::TIME_ENTRIES, &self.entries) {
            log_failure(Err(err));
            return false;
        }
        log_failure(
            self.gateway
                .save_f64(keys::TOTAL_TIME_TRACKED, duration_to_seconds(self.total)),
        );
        if let Some(first) = self.first_entry {
            log_failure(self.gateway.save_date(keys::FIRST_ENTRY_DATE, first));
        }
        true
    }
}

fn sort_newest_first(entries: &mut [TimeEntry]) {
    entries.sort_by(|a, b| b.start_time().cmp(&a.start_time()));
}

#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond totals stay far below 2^52"
)]
fn duration_to_seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "stored totals are bounded by the sum of entry durations"
)]
fn seconds_to_duration(seconds: f64) -> Duration {
    let millis = (seconds * 1000.0).round();
    if millis.is_finite() && millis > 0.0 {
        Duration::try_milliseconds(millis as i64).unwrap_or(Duration::zero())
    } else {
        Duration::zero()
    }
}
