//! Time diary CLI library.
//!
//! This crate provides the CLI interface for the time diary.

mod cli;
pub mod commands;
mod config;
mod reminders;

pub use cli::{CategoriesAction, Cli, Commands, EntriesAction, ReminderAction, ReportPeriod};
pub use config::{Config, WeekStart};
pub use reminders::LogReminders;
