//! Local calendar arithmetic.
//!
//! Instants are stored as `DateTime<Utc>`; everything that depends on the
//! user's notion of a "day" (analytics periods, same-day lookups, CSV
//! formatting) goes through a [`Calendar`], which pairs a zone with the
//! locale's first weekday.
//!
//! Local times that do not exist (DST spring-forward gaps) resolve to the
//! first valid instant after the gap; ambiguous times (fall-back) resolve to
//! the earlier instant.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, LocalResult, Months, NaiveDate,
    NaiveDateTime, NaiveTime, Offset, TimeZone, Utc, Weekday,
};

/// The zone used to interpret instants as calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The process's local zone, including DST rules.
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

/// Calendar rules: a zone plus the first day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    zone: Zone,
    week_start: Weekday,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::local(Weekday::Mon)
    }
}

impl Calendar {
    pub const fn new(zone: Zone, week_start: Weekday) -> Self {
        Self { zone, week_start }
    }

    /// Calendar in the process's local zone.
    pub const fn local(week_start: Weekday) -> Self {
        Self::new(Zone::Local, week_start)
    }

    /// Calendar pinned to UTC with Monday-first weeks.
    pub fn utc() -> Self {
        Self::new(Zone::Fixed(Utc.fix()), Weekday::Mon)
    }

    pub const fn zone(&self) -> Zone {
        self.zone
    }

    pub const fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Wall-clock date and time of `t` in this calendar's zone.
    pub fn naive_local(&self, t: DateTime<Utc>) -> NaiveDateTime {
        match self.zone {
            Zone::Local => t.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => t.with_timezone(&offset).naive_local(),
        }
    }

    /// Calendar date of `t` in this calendar's zone.
    pub fn date_of(&self, t: DateTime<Utc>) -> NaiveDate {
        self.naive_local(t).date()
    }

    /// Converts a wall-clock time in this zone back to an instant.
    pub fn from_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self.zone {
            Zone::Local => resolve_local(&Local, naive),
            Zone::Fixed(offset) => resolve_local(&offset, naive),
        }
    }

    /// Local midnight at the start of `date`.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        self.from_local(date.and_time(NaiveTime::MIN))
    }

    pub fn start_of_day(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight(self.date_of(t))
    }

    /// Adds calendar days, keeping the wall-clock time of day.
    pub fn add_days(&self, t: DateTime<Utc>, days: i64) -> DateTime<Utc> {
        self.from_local(self.naive_local(t) + Duration::days(days))
    }

    /// Start of the week containing `t`, honouring the configured first weekday.
    pub fn start_of_week(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.date_of(t);
        let offset = (7 + date.weekday().num_days_from_monday()
            - self.week_start.num_days_from_monday())
            % 7;
        self.midnight(date - Duration::days(i64::from(offset)))
    }

    pub fn start_of_month(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.date_of(t);
        self.midnight(date.with_day(1).unwrap_or(date))
    }

    /// Start of the month after the one containing `t`.
    pub fn start_of_next_month(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.date_of(t);
        let first = date.with_day(1).unwrap_or(date);
        let next = first
            .checked_add_months(Months::new(1))
            .unwrap_or(first + Duration::days(31));
        self.midnight(next)
    }

    pub fn is_same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.date_of(a) == self.date_of(b)
    }

    pub fn is_same_week(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.start_of_week(a) == self.start_of_week(b)
    }

    pub fn is_yesterday(&self, t: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.date_of(now)
            .pred_opt()
            .is_some_and(|yesterday| self.date_of(t) == yesterday)
    }

    /// Whole calendar days from `start` to `end`, truncated toward zero.
    pub fn days_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        (self.naive_local(end) - self.naive_local(start)).num_days()
    }

    /// Formats `t` in this calendar's zone with a `strftime` pattern.
    pub fn format(&self, t: DateTime<Utc>, pattern: &str) -> String {
        match self.zone {
            Zone::Local => t.with_timezone(&Local).format(pattern).to_string(),
            Zone::Fixed(offset) => t.with_timezone(&offset).format(pattern).to_string(),
        }
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a DST gap: the next whole hour always exists.
            let later = naive + Duration::hours(1);
            match tz.from_local_datetime(&later) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn start_of_day_in_fixed_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let calendar = Calendar::new(Zone::Fixed(offset), Weekday::Mon);
        // 23:30 UTC on Jan 1 is 01:30 local on Jan 2.
        let start = calendar.start_of_day(at("2024-01-01T23:30:00Z"));
        assert_eq!(start, at("2024-01-01T22:00:00Z"));
    }

    #[test]
    fn week_start_respects_first_weekday() {
        // 2024-01-03 is a Wednesday.
        let t = at("2024-01-03T12:00:00Z");
        let monday_first = Calendar::utc();
        assert_eq!(monday_first.start_of_week(t), at("2024-01-01T00:00:00Z"));

        let sunday_first = Calendar::new(monday_first.zone(), Weekday::Sun);
        assert_eq!(sunday_first.start_of_week(t), at("2023-12-31T00:00:00Z"));
    }

    #[test]
    fn week_start_on_the_first_weekday_itself() {
        let calendar = Calendar::utc();
        let monday = at("2024-01-08T00:00:00Z");
        assert_eq!(calendar.start_of_week(monday), monday);
    }

    #[test]
    fn month_boundaries() {
        let calendar = Calendar::utc();
        let t = at("2024-02-15T08:00:00Z");
        assert_eq!(calendar.start_of_month(t), at("2024-02-01T00:00:00Z"));
        assert_eq!(calendar.start_of_next_month(t), at("2024-03-01T00:00:00Z"));

        let december = at("2023-12-31T23:59:59Z");
        assert_eq!(
            calendar.start_of_next_month(december),
            at("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn days_between_truncates() {
        let calendar = Calendar::utc();
        assert_eq!(
            calendar.days_between(at("2024-01-01T00:00:00Z"), at("2024-01-08T00:00:00Z")),
            7
        );
        assert_eq!(
            calendar.days_between(at("2024-01-01T10:00:00Z"), at("2024-01-02T09:00:00Z")),
            0
        );
    }

    #[test]
    fn yesterday_and_same_week() {
        let calendar = Calendar::utc();
        let now = at("2024-01-03T10:00:00Z");
        assert!(calendar.is_yesterday(at("2024-01-02T23:59:00Z"), now));
        assert!(!calendar.is_yesterday(at("2024-01-01T12:00:00Z"), now));
        assert!(calendar.is_same_week(at("2024-01-01T00:00:00Z"), now));
        assert!(!calendar.is_same_week(at("2023-12-31T23:00:00Z"), now));
    }

    #[test]
    fn format_uses_zone() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let calendar = Calendar::new(Zone::Fixed(offset), Weekday::Mon);
        assert_eq!(
            calendar.format(at("2024-01-01T14:00:00Z"), "%Y-%m-%d %H:%M"),
            "2024-01-01 09:00"
        );
    }
}
