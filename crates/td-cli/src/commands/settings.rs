//! Settings, reminder and reset commands.

use std::io::Write;

use anyhow::Result;

use td_core::{ReminderTime, Tracker};

pub fn settings<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    use_24_hour: Option<bool>,
) -> Result<()> {
    if let Some(enabled) = use_24_hour {
        tracker.set_use_24_hour_format(enabled);
    }
    let settings = tracker.settings();
    let entries = tracker.entries();

    writeln!(
        writer,
        "24-hour time:    {}",
        on_off(settings.use_24_hour_format)
    )?;
    writeln!(
        writer,
        "Reminder:        {} at {}",
        on_off(settings.enable_notifications),
        settings.notification_time
    )?;
    writeln!(writer, "Entries:         {}", entries.count())?;
    writeln!(
        writer,
        "Total tracked:   {}",
        td_core::format::format_duration(entries.total_time_tracked())
    )?;
    if let Some(first) = entries.first_entry_date() {
        writeln!(
            writer,
            "Tracking since:  {}",
            tracker.calendar().format(first, "%Y-%m-%d")
        )?;
    }
    Ok(())
}

pub fn reminder_show<W: Write>(writer: &mut W, tracker: &Tracker) -> Result<()> {
    let settings = tracker.settings();
    writeln!(
        writer,
        "Daily reminder is {} at {}",
        on_off(settings.enable_notifications),
        settings.notification_time
    )?;
    Ok(())
}

pub fn reminder_on<W: Write>(writer: &mut W, tracker: &mut Tracker) -> Result<()> {
    if tracker.enable_reminders()? {
        writeln!(
            writer,
            "Daily reminder on at {}",
            tracker.settings().notification_time
        )?;
    } else {
        writeln!(writer, "Reminder permission was denied; reminder stays off.")?;
    }
    Ok(())
}

pub fn reminder_off<W: Write>(writer: &mut W, tracker: &mut Tracker) -> Result<()> {
    tracker.disable_reminders();
    writeln!(writer, "Daily reminder off")?;
    Ok(())
}

pub fn reminder_set<W: Write>(writer: &mut W, tracker: &mut Tracker, time: &str) -> Result<()> {
    let time: ReminderTime = time.parse()?;
    tracker.set_reminder_time(time)?;
    writeln!(writer, "Reminder time set to {time}")?;
    Ok(())
}

pub fn reset<W: Write>(writer: &mut W, tracker: &mut Tracker, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("this deletes every entry, category and setting; rerun with --yes");
    }
    tracker.clear_all_data()?;
    writeln!(writer, "All data cleared")?;
    Ok(())
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use insta::assert_snapshot;
    use td_core::{Calendar, Gateway, ManualClock};

    use crate::reminders::LogReminders;

    fn tracker() -> Tracker {
        let t0 = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(t0));
        let mut tracker = Tracker::open(Gateway::in_memory(), clock, Calendar::utc())
            .with_reminders(Box::new(LogReminders));
        let work = tracker.categories().find_by_name("Work").unwrap().id;
        tracker
            .add_entry(work, t0, t0 + Duration::minutes(90), None)
            .unwrap();
        tracker
    }

    fn capture(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn settings_summary() {
        let mut tracker = tracker();
        let output = capture(|w| settings(w, &mut tracker, Some(true)));
        assert_snapshot!(output, @r"
        24-hour time:    on
        Reminder:        off at 20:00
        Entries:         1
        Total tracked:   1h 30m
        Tracking since:  2024-01-01
        ");
    }

    #[test]
    fn reminder_lifecycle() {
        let mut tracker = tracker();
        assert_eq!(
            capture(|w| reminder_on(w, &mut tracker)),
            "Daily reminder on at 20:00\n"
        );
        assert_eq!(
            capture(|w| reminder_set(w, &mut tracker, "7:45")),
            "Reminder time set to 07:45\n"
        );
        assert_eq!(
            capture(|w| reminder_show(w, &tracker)),
            "Daily reminder is on at 07:45\n"
        );
        assert_eq!(
            capture(|w| reminder_off(w, &mut tracker)),
            "Daily reminder off\n"
        );
        assert!(!tracker.settings().enable_notifications);

        let err = reminder_set(&mut Vec::new(), &mut tracker, "25:00").unwrap_err();
        assert_eq!(err.to_string(), "invalid reminder time '25:00', expected HH:MM");
    }

    #[test]
    fn reset_requires_confirmation() {
        let mut tracker = tracker();
        assert!(reset(&mut Vec::new(), &mut tracker, false).is_err());
        assert_eq!(tracker.entries().count(), 1);

        assert_eq!(
            capture(|w| reset(w, &mut tracker, true)),
            "All data cleared\n"
        );
        assert_eq!(tracker.entries().count(), 0);
        assert_eq!(tracker.categories().all().len(), 8);
    }
}
