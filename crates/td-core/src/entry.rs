//! Completed time entries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, EntryId, ValidationError, duration_ms};

/// A finished span of tracked time.
///
/// `category_name` is cached when the entry is created and is not updated
/// if the category is later renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntryId,
    pub category_id: CategoryId,
    pub category_name: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    duration: Duration,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TimeEntry {
    /// Creates an entry covering `start..end`; its duration is `end - start`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EndBeforeStart`] if `end < start`.
    pub fn new(
        category_id: CategoryId,
        category_name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        check_order(start, end)?;
        Ok(Self {
            id: EntryId::new(),
            category_id,
            category_name: category_name.into(),
            start_time: start,
            end_time: end,
            duration: end - start,
            created_at,
            notes: None,
        })
    }

    /// Creates an entry for a timer session that may have been paused.
    ///
    /// The entry spans `start..end` but carries only the `active` time. A
    /// `start` later than `end` is clamped to `end`.
    pub(crate) fn from_session(
        category_id: CategoryId,
        category_name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        active: Duration,
    ) -> Self {
        Self {
            id: EntryId::new(),
            category_id,
            category_name: category_name.into(),
            start_time: start.min(end),
            end_time: end,
            duration: active.max(Duration::zero()),
            created_at: end,
            notes: None,
        }
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Replaces both endpoints and recomputes the duration as `end - start`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EndBeforeStart`] if `end < start`; the entry
    /// is left unchanged.
    pub fn set_times(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        check_order(start, end)?;
        self.start_time = start;
        self.end_time = end;
        self.duration = end - start;
        Ok(())
    }

    /// Sets or clears the notes. Blank notes are stored as `None`.
    pub fn set_notes(&mut self, notes: Option<&str>) {
        self.notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string);
    }

    /// True when no time was tracked.
    pub fn is_zero_length(&self) -> bool {
        self.duration.is_zero()
    }
}

fn check_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::EndBeforeStart {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(())
}
