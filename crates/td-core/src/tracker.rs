//! The composition root.
//!
//! [`Tracker`] owns every component and performs the operations that span
//! more than one of them: stopping the timer files an entry, starting it
//! touches the category, and deleting a category first stops a timer that
//! is running against it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::analytics::{self, AnalyticsData, CategoryStatistic, Period};
use crate::calendar::Calendar;
use crate::categories::{CategoryError, CategoryRegistry, RECENT_CATEGORY_LIMIT};
use crate::category::Category;
use crate::clock::Clock;
use crate::entries::{DEFAULT_RECENT_LIMIT, EntryError, EntryFilter, EntryStore};
use crate::entry::TimeEntry;
use crate::export;
use crate::history::{self, HistoryGroup, HistorySummary};
use crate::settings::{NoopReminders, Reminder, ReminderError, ReminderScheduler, ReminderTime, Settings};
use crate::store::{Gateway, PersistError};
use crate::tick::TickConfig;
use crate::timer::{TimerEngine, TimerError, TimerState, TimerStatus};
use crate::types::{CategoryId, EntryId, ValidationError};

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The argument names a category that does not exist.
    #[error("invalid argument: unknown category {0}")]
    UnknownCategory(CategoryId),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Reminder(#[from] ReminderError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Result of deleting a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDeletion {
    pub category: Category,
    /// The entry filed because a timer was running against the category.
    pub stopped_entry: Option<TimeEntry>,
}

/// Owns the clock, calendar, storage and every store.
pub struct Tracker {
    clock: Arc<dyn Clock>,
    calendar: Calendar,
    gateway: Gateway,
    timer: TimerEngine,
    entries: EntryStore,
    categories: CategoryRegistry,
    reminders: Box<dyn ReminderScheduler>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("calendar", &self.calendar)
            .field("timer", &self.timer)
            .field("entries", &self.entries.count())
            .field("categories", &self.categories.all().len())
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Loads every component from `gateway`.
    pub fn open(gateway: Gateway, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        let now = clock.now();
        let categories = CategoryRegistry::load(gateway.clone(), now);
        let entries = EntryStore::load(gateway.clone(), calendar);
        let timer = TimerEngine::restore(Arc::clone(&clock), gateway.clone());
        Self {
            clock,
            calendar,
            gateway,
            timer,
            entries,
            categories,
            reminders: Box::new(NoopReminders),
        }
    }

    #[must_use]
    pub fn with_reminders(mut self, reminders: Box<dyn ReminderScheduler>) -> Self {
        self.reminders = reminders;
        self
    }

    /// Enables the periodic tick on the timer.
    #[must_use]
    pub fn with_tick(mut self, config: TickConfig) -> Self {
        self.timer.set_tick(config);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub const fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub const fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub const fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Mutable access for subscribing to category changes.
    pub const fn categories_mut(&mut self) -> &mut CategoryRegistry {
        &mut self.categories
    }

    // ========== Timer ==========

    pub const fn timer_state(&self) -> &TimerState {
        self.timer.state()
    }

    pub fn current_elapsed(&self) -> Duration {
        self.timer.current_elapsed()
    }

    /// Starts the timer against an existing category and marks it used.
    pub fn start(&mut self, category_id: CategoryId) -> Result<(), TrackerError> {
        let category = self
            .categories
            .get(category_id)
            .ok_or(TrackerError::UnknownCategory(category_id))?;
        let name = category.name.clone();
        self.timer.start(category_id, name)?;
        self.categories.touch_last_used(category_id, self.clock.now());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TrackerError> {
        Ok(self.timer.pause()?)
    }

    pub fn resume(&mut self) -> Result<(), TrackerError> {
        Ok(self.timer.resume()?)
    }

    /// Stops the timer and files the resulting entry.
    ///
    /// The idle timer is stored only after the entry is. If the entry cannot
    /// be written, the stored session stays running so a restart recovers it.
    pub fn stop(&mut self) -> Result<TimeEntry, TrackerError> {
        let entry = self.timer.finish()?;
        if self.entries.create(entry.clone()) {
            self.timer.save_state();
        } else {
            tracing::warn!(entry = %entry.id, "entry not stored, keeping stored session");
        }
        Ok(entry)
    }

    // ========== Entries ==========

    /// Files a manually timed entry against an existing category.
    pub fn add_entry(
        &mut self,
        category_id: CategoryId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<TimeEntry, TrackerError> {
        let category = self
            .categories
            .get(category_id)
            .ok_or(TrackerError::UnknownCategory(category_id))?;
        let mut entry = TimeEntry::new(category_id, category.name.clone(), start, end, self.clock.now())?;
        entry.set_notes(notes);
        self.entries.create(entry.clone());
        Ok(entry)
    }

    /// Moves an entry to new times; its duration becomes `end - start`.
    pub fn retime_entry(
        &mut self,
        id: EntryId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry, TrackerError> {
        let mut entry = self
            .entries
            .get(id)
            .cloned()
            .ok_or(EntryError::NotFound(id))?;
        entry.set_times(start, end)?;
        self.entries.update(entry.clone())?;
        Ok(entry)
    }

    pub fn update_entry(&mut self, entry: TimeEntry) -> Result<(), TrackerError> {
        Ok(self.entries.update(entry)?)
    }

    pub fn set_entry_notes(&mut self, id: EntryId, notes: Option<&str>) -> Result<(), TrackerError> {
        Ok(self.entries.set_notes(id, notes)?)
    }

    pub fn delete_entry(&mut self, id: EntryId) -> Result<TimeEntry, TrackerError> {
        Ok(self.entries.delete(id)?)
    }

    pub fn today_entries(&self) -> Vec<&TimeEntry> {
        self.entries.today(self.clock.now())
    }

    pub fn today_total(&self) -> Duration {
        self.entries.today_total(self.clock.now())
    }

    pub fn week_total(&self) -> Duration {
        self.entries.week_total(self.clock.now())
    }

    pub fn recent_entries(&self) -> &[TimeEntry] {
        self.entries.recent(DEFAULT_RECENT_LIMIT)
    }

    /// Filtered entries, grouped for display.
    pub fn history(&self, filter: &EntryFilter) -> Vec<HistoryGroup> {
        history::group_entries(self.entries.filter(filter), self.clock.now(), &self.calendar)
    }

    pub fn history_summary(&self, filter: &EntryFilter) -> HistorySummary {
        history::summarize(self.entries.filter(filter))
    }

    // ========== Categories ==========

    pub fn create_category(&mut self, category: Category) -> Result<(), TrackerError> {
        Ok(self.categories.create(category)?)
    }

    /// Replaces a category. Returns `Ok(false)` if it does not exist.
    pub fn update_category(&mut self, category: Category) -> Result<bool, TrackerError> {
        Ok(self.categories.update(category)?)
    }

    /// Deletes a user category, stopping a timer that runs against it.
    ///
    /// Returns `Ok(None)` if the category does not exist. Default categories
    /// are refused before the timer is touched.
    pub fn delete_category(
        &mut self,
        id: CategoryId,
    ) -> Result<Option<CategoryDeletion>, TrackerError> {
        let Some(category) = self.categories.get(id) else {
            return Ok(None);
        };
        if !category.can_delete() {
            return Err(CategoryError::ProtectedDefault {
                id,
                name: category.name.clone(),
            }
            .into());
        }

        let state = self.timer.state();
        let stopped_entry = if state.status != TimerStatus::Idle && state.category_id == Some(id) {
            tracing::debug!(category = %id, "stopping timer before deleting its category");
            Some(self.stop()?)
        } else {
            None
        };

        Ok(self
            .categories
            .delete(id)?
            .map(|category| CategoryDeletion {
                category,
                stopped_entry,
            }))
    }

    pub fn recent_categories(&self) -> Vec<&Category> {
        self.categories.recently_used(RECENT_CATEGORY_LIMIT)
    }

    /// Statistics for one category over every entry.
    pub fn category_statistic(&self, id: CategoryId) -> Option<CategoryStatistic> {
        let category = self.categories.get(id)?;
        analytics::category_statistic(category, self.entries.all())
    }

    pub fn categories_by_tracked_time(&self) -> Vec<&Category> {
        analytics::sort_by_tracked_time(self.categories.all(), self.entries.all())
    }

    // ========== Analytics & export ==========

    pub fn analytics(&self, period: Period) -> AnalyticsData {
        let range = period.range(self.clock.now(), &self.calendar);
        analytics::compute(
            range,
            self.entries.all(),
            self.categories.all(),
            &self.calendar,
        )
    }

    /// Every entry as CSV, newest first.
    pub fn export_csv(&self) -> String {
        export::export_csv(self.entries.all(), &self.calendar)
    }

    // ========== Settings ==========

    pub fn settings(&self) -> Settings {
        Settings::load(&self.gateway)
    }

    pub fn set_use_24_hour_format(&mut self, enabled: bool) {
        let mut settings = self.settings();
        settings.use_24_hour_format = enabled;
        settings.save(&self.gateway);
    }

    /// Asks for permission and, if granted, turns on the daily reminder.
    ///
    /// Returns whether permission was granted.
    pub fn enable_reminders(&mut self) -> Result<bool, TrackerError> {
        if !self.reminders.request_permission() {
            tracing::debug!("reminder permission denied");
            return Ok(false);
        }
        let mut settings = self.settings();
        settings.enable_notifications = true;
        settings.save(&self.gateway);
        self.reminders
            .schedule_daily(&Reminder::daily(settings.notification_time))?;
        Ok(true)
    }

    pub fn disable_reminders(&mut self) {
        let mut settings = self.settings();
        settings.enable_notifications = false;
        settings.save(&self.gateway);
        self.reminders.cancel();
    }

    /// Stores a new reminder time, rescheduling if reminders are on.
    pub fn set_reminder_time(&mut self, time: ReminderTime) -> Result<(), TrackerError> {
        let mut settings = self.settings();
        settings.notification_time = time;
        settings.save(&self.gateway);
        if settings.enable_notifications {
            self.reminders.schedule_daily(&Reminder::daily(time))?;
        }
        Ok(())
    }

    /// Brings the scheduler in line with the stored preference.
    pub fn sync_reminders(&mut self) -> Result<(), TrackerError> {
        let settings = self.settings();
        if settings.enable_notifications {
            self.reminders
                .schedule_daily(&Reminder::daily(settings.notification_time))?;
        } else {
            self.reminders.cancel();
        }
        Ok(())
    }

    // ========== Reset ==========

    /// Wipes every stored key and returns to a fresh state.
    ///
    /// Any running session is discarded without filing an entry, and the
    /// default categories are seeded again.
    pub fn clear_all_data(&mut self) -> Result<(), TrackerError> {
        self.gateway.clear_all()?;
        self.timer.reset();
        self.entries.reset();
        self.reminders.cancel();
        self.categories.reseed(self.clock.now());
        tracing::debug!("cleared all data");
        Ok(())
    }
}
