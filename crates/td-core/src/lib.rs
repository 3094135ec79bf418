//! Core domain logic for the time diary.
//!
//! This crate contains the fundamental types and logic for:
//! - Timing: a start/pause/resume/stop timer that survives restarts
//! - Storage: time entries, categories and preferences over a key-value store
//! - Analytics: per-period breakdowns, daily totals and the work/rest balance
//! - Export: CSV rendering of the entry list
//!
//! [`Tracker`] wires the pieces together for hosts.

pub mod analytics;
pub mod calendar;
pub mod categories;
pub mod category;
pub mod clock;
pub mod entries;
pub mod entry;
mod export;
pub mod format;
pub mod history;
pub mod settings;
pub mod store;
pub mod tick;
pub mod timer;
mod tracker;
pub mod types;

pub use analytics::{AnalyticsData, CategoryStatistic, DailyStatistic, DateRange, Period};
pub use calendar::{Calendar, Zone};
pub use categories::{CategoryChange, CategoryError, CategoryRegistry};
pub use category::Category;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entries::{EntryError, EntryFilter, EntryStore};
pub use entry::TimeEntry;
pub use export::{CSV_HEADER, export_csv};
pub use settings::{
    NoopReminders, Reminder, ReminderError, ReminderScheduler, ReminderTime, Settings,
};
pub use store::{Gateway, KeyValueStore, MemoryStore, PersistError, StoreError};
pub use tick::{TickConfig, TickSink};
pub use timer::{TimerAction, TimerEngine, TimerError, TimerState, TimerStatus};
pub use tracker::{CategoryDeletion, Tracker, TrackerError};
pub use types::{CategoryId, EntryId, ValidationError};
