//! User preferences and the daily reminder collaborator.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::store::{Gateway, keys, log_failure};

pub const REMINDER_TITLE: &str = "Time Diary Reminder";
pub const REMINDER_BODY: &str = "Don't forget to track your time today!";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    #[error("invalid reminder time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("failed to schedule reminder: {0}")]
    Schedule(String),
}

/// Hour and minute of the daily reminder, local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self {
            hour: 20,
            minute: 0,
        }
    }
}

impl ReminderTime {
    /// Returns `None` unless `hour < 24` and `minute < 60`.
    pub const fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u32 {
        self.hour
    }

    pub const fn minute(self) -> u32 {
        self.minute
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ReminderTime {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReminderError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

/// A repeating daily reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub time: ReminderTime,
    pub title: &'static str,
    pub body: &'static str,
}

impl Reminder {
    pub const fn daily(time: ReminderTime) -> Self {
        Self {
            time,
            title: REMINDER_TITLE,
            body: REMINDER_BODY,
        }
    }
}

/// Delivers the daily reminder. The core never fires reminders itself.
pub trait ReminderScheduler: Send {
    /// Asks the host for permission to deliver reminders.
    fn request_permission(&mut self) -> bool;

    /// Replaces any pending reminder with `reminder`, repeating daily.
    fn schedule_daily(&mut self, reminder: &Reminder) -> Result<(), ReminderError>;

    /// Removes any pending reminder.
    fn cancel(&mut self);
}

/// A scheduler for hosts that cannot deliver reminders.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReminders;

impl ReminderScheduler for NoopReminders {
    fn request_permission(&mut self) -> bool {
        false
    }

    fn schedule_daily(&mut self, _reminder: &Reminder) -> Result<(), ReminderError> {
        Ok(())
    }

    fn cancel(&mut self) {}
}

/// Persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub use_24_hour_format: bool,
    pub enable_notifications: bool,
    pub notification_time: ReminderTime,
}

impl Settings {
    /// Reads every preference, falling back to defaults.
    pub fn load(gateway: &Gateway) -> Self {
        let notification_time = gateway
            .load_string(keys::NOTIFICATION_TIME)
            .and_then(|raw| match raw.parse::<ReminderTime>() {
                Ok(time) => Some(time),
                Err(err) => {
                    tracing::warn!(value = %raw, error = %err, "ignoring stored reminder time");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            use_24_hour_format: gateway.load_bool(keys::USE_24_HOUR_FORMAT, false),
            enable_notifications: gateway.load_bool(keys::ENABLE_NOTIFICATIONS, false),
            notification_time,
        }
    }

    /// Writes every preference. Failures are logged.
    pub fn save(&self, gateway: &Gateway) {
        log_failure(gateway.save_bool(keys::USE_24_HOUR_FORMAT, self.use_24_hour_format));
        log_failure(gateway.save_bool(keys::ENABLE_NOTIFICATIONS, self.enable_notifications));
        log_failure(gateway.save_string(
            keys::NOTIFICATION_TIME,
            &self.notification_time.to_string(),
        ));
    }
}
