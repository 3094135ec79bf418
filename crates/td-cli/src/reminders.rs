//! Reminder collaborator for the terminal.
//!
//! A CLI has no notification center to post to, so scheduling only records
//! the request in the log. Desktop integrations plug in their own
//! [`ReminderScheduler`].

use td_core::{Reminder, ReminderError, ReminderScheduler};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogReminders;

impl ReminderScheduler for LogReminders {
    fn request_permission(&mut self) -> bool {
        true
    }

    fn schedule_daily(&mut self, reminder: &Reminder) -> Result<(), ReminderError> {
        tracing::info!(
            time = %reminder.time,
            title = reminder.title,
            body = reminder.body,
            "scheduled daily reminder"
        );
        Ok(())
    }

    fn cancel(&mut self) {
        tracing::info!("cancelled daily reminder");
    }
}
