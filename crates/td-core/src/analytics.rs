//! Aggregation of time entries into summaries.
//!
//! Everything here is a pure function of (entries, categories, range,
//! calendar). Results are recomputed on demand and never persisted.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar::Calendar;
use crate::category::Category;
use crate::entry::TimeEntry;
use crate::format::BalanceIndicator;
use crate::types::{CategoryId, duration_ms};

/// Category names counted as work in the work/rest ratio.
pub const WORK_CATEGORIES: [&str; 2] = ["Work", "Learning"];
/// Category names counted as rest in the work/rest ratio.
pub const REST_CATEGORIES: [&str; 4] = ["Rest", "Sleep", "Hobby", "Social"];
/// How many categories [`AnalyticsData::top_categories`] returns.
pub const TOP_CATEGORY_LIMIT: usize = 5;

/// A reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Local midnight to the next midnight.
    Today,
    /// Start of the week to seven days later.
    ThisWeek,
    /// Start of the month to the start of the next month.
    ThisMonth,
    /// Taken verbatim.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Period {
    /// Resolves the period around `now`.
    pub fn range(self, now: DateTime<Utc>, calendar: &Calendar) -> DateRange {
        match self {
            Self::Today => {
                let start = calendar.start_of_day(now);
                DateRange {
                    start,
                    end: calendar.add_days(start, 1),
                }
            }
            Self::ThisWeek => {
                let start = calendar.start_of_week(now);
                DateRange {
                    start,
                    end: calendar.add_days(start, 7),
                }
            }
            Self::ThisMonth => DateRange {
                start: calendar.start_of_month(now),
                end: calendar.start_of_next_month(now),
            },
            Self::Custom { start, end } => DateRange { start, end },
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::ThisWeek => "This Week",
            Self::ThisMonth => "This Month",
            Self::Custom { .. } => "Custom Range",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A resolved time range. Both ends are inclusive when filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Totals for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatistic {
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_color_hex: String,
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    pub number_of_entries: usize,
    /// Share of the total, as a fraction in `0.0..=1.0`.
    pub percentage: f64,
    #[serde(with = "duration_ms")]
    pub average_duration: Duration,
}

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistic {
    pub date: NaiveDate,
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    pub number_of_entries: usize,
}

/// Summary of a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    #[serde(with = "duration_ms")]
    pub average_time_per_day: Duration,
    pub number_of_days: i64,
    pub number_of_entries: usize,
    pub most_active_category: Option<CategoryStatistic>,
    /// Sorted by total time, largest first.
    pub category_breakdown: Vec<CategoryStatistic>,
    pub daily_breakdown: Vec<DailyStatistic>,
    pub work_rest_ratio: f64,
}

impl Default for AnalyticsData {
    fn default() -> Self {
        Self {
            total_time: Duration::zero(),
            average_time_per_day: Duration::zero(),
            number_of_days: 0,
            number_of_entries: 0,
            most_active_category: None,
            category_breakdown: Vec::new(),
            daily_breakdown: Vec::new(),
            work_rest_ratio: 0.0,
        }
    }
}

impl AnalyticsData {
    pub const fn has_data(&self) -> bool {
        self.number_of_entries > 0
    }

    /// The largest categories, at most [`TOP_CATEGORY_LIMIT`].
    pub fn top_categories(&self) -> &[CategoryStatistic] {
        let n = TOP_CATEGORY_LIMIT.min(self.category_breakdown.len());
        &self.category_breakdown[..n]
    }

    pub fn balance(&self) -> BalanceIndicator {
        BalanceIndicator::from_ratio(self.work_rest_ratio)
    }
}

/// Summarizes `entries` whose start falls in `range` (inclusive).
///
/// Categories drive the breakdown: entries whose category no longer exists
/// count toward the totals but get no breakdown row.
pub fn compute(
    range: DateRange,
    entries: &[TimeEntry],
    categories: &[Category],
    calendar: &Calendar,
) -> AnalyticsData {
    let in_range: Vec<&TimeEntry> = entries
        .iter()
        .filter(|e| range.contains(e.start_time()))
        .collect();
    if in_range.is_empty() {
        return AnalyticsData::default();
    }

    let total_time = sum(&in_range);
    let number_of_days = calendar.days_between(range.start, range.end).max(1);
    let average_time_per_day = divide(total_time, number_of_days);

    let category_breakdown = breakdown(&in_range, total_time, categories);
    let most_active_category = most_active(&category_breakdown).cloned();
    let daily_breakdown = daily(&in_range, range, calendar);
    let work_rest_ratio = work_rest_ratio(&category_breakdown);

    AnalyticsData {
        total_time,
        average_time_per_day,
        number_of_days,
        number_of_entries: in_range.len(),
        most_active_category,
        category_breakdown,
        daily_breakdown,
        work_rest_ratio,
    }
}

/// Statistics for one category over `entries`; `None` if it has none.
///
/// The percentage is relative to all of `entries`.
pub fn category_statistic(category: &Category, entries: &[TimeEntry]) -> Option<CategoryStatistic> {
    let all: Vec<&TimeEntry> = entries.iter().collect();
    let total = sum(&all);
    statistic(category, &all, total)
}

/// Categories ordered by total tracked time, largest first. Ties keep
/// registry order.
pub fn sort_by_tracked_time<'a>(
    categories: &'a [Category],
    entries: &[TimeEntry],
) -> Vec<&'a Category> {
    let mut with_totals: Vec<(&Category, Duration)> = categories
        .iter()
        .map(|c| {
            let total = entries
                .iter()
                .filter(|e| e.category_id == c.id)
                .map(TimeEntry::duration)
                .sum();
            (c, total)
        })
        .collect();
    with_totals.sort_by(|a, b| b.1.cmp(&a.1));
    with_totals.into_iter().map(|(c, _)| c).collect()
}

/// Work time over rest time, by category name. Zero when there is no rest.
///
/// Renamed defaults and custom categories count as neither.
pub fn work_rest_ratio(breakdown: &[CategoryStatistic]) -> f64 {
    let total_for = |names: &[&str]| -> Duration {
        breakdown
            .iter()
            .filter(|s| names.contains(&s.category_name.as_str()))
            .map(|s| s.total_time)
            .sum()
    };
    let work = total_for(&WORK_CATEGORIES[..]);
    let rest = total_for(&REST_CATEGORIES[..]);
    if rest > Duration::zero() {
        ratio(work, rest)
    } else {
        0.0
    }
}

fn breakdown(
    entries: &[&TimeEntry],
    total: Duration,
    categories: &[Category],
) -> Vec<CategoryStatistic> {
    let mut stats: Vec<CategoryStatistic> = categories
        .iter()
        .filter_map(|c| statistic(c, entries, total))
        .collect();
    // Stable, so equal totals keep registry order.
    stats.sort_by(|a, b| b.total_time.cmp(&a.total_time));
    stats
}

fn statistic(
    category: &Category,
    entries: &[&TimeEntry],
    total: Duration,
) -> Option<CategoryStatistic> {
    let mine: Vec<&TimeEntry> = entries
        .iter()
        .copied()
        .filter(|e| e.category_id == category.id)
        .collect();
    if mine.is_empty() {
        return None;
    }
    let total_time = sum(&mine);
    let count = mine.len();
    Some(CategoryStatistic {
        category_id: category.id,
        category_name: category.name.clone(),
        category_color_hex: category.color_hex.clone(),
        total_time,
        number_of_entries: count,
        percentage: if total > Duration::zero() {
            ratio(total_time, total)
        } else {
            0.0
        },
        average_duration: divide(total_time, i64::try_from(count).unwrap_or(i64::MAX)),
    })
}

/// The first statistic with the largest total.
fn most_active(breakdown: &[CategoryStatistic]) -> Option<&CategoryStatistic> {
    breakdown.iter().fold(None, |best, s| match best {
        Some(b) if b.total_time >= s.total_time => Some(b),
        _ => Some(s),
    })
}

/// One row per day from `range.start` through `range.end`, including
/// days without entries.
fn daily(entries: &[&TimeEntry], range: DateRange, calendar: &Calendar) -> Vec<DailyStatistic> {
    let mut days = Vec::new();
    let mut current = range.start;
    while current <= range.end {
        let mine: Vec<&TimeEntry> = entries
            .iter()
            .copied()
            .filter(|e| calendar.is_same_day(e.start_time(), current))
            .collect();
        days.push(DailyStatistic {
            date: calendar.date_of(current),
            total_time: sum(&mine),
            number_of_entries: mine.len(),
        });
        let next = calendar.add_days(current, 1);
        if next <= current {
            break;
        }
        current = next;
    }
    days
}

fn sum(entries: &[&TimeEntry]) -> Duration {
    entries.iter().map(|e| e.duration()).sum()
}

fn divide(duration: Duration, by: i64) -> Duration {
    if by <= 0 {
        return Duration::zero();
    }
    Duration::milliseconds(duration.num_milliseconds() / by)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond totals stay far below 2^52"
)]
fn ratio(numerator: Duration, denominator: Duration) -> f64 {
    numerator.num_milliseconds() as f64 / denominator.num_milliseconds() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Weekday;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn categories() -> Vec<Category> {
        Category::defaults(at("2024-01-01T00:00:00Z"))
    }

    fn named<'a>(categories: &'a [Category], name: &str) -> &'a Category {
        categories.iter().find(|c| c.name == name).unwrap()
    }

    fn entry(category: &Category, start: &str, minutes: i64) -> TimeEntry {
        let start = at(start);
        let end = start + Duration::minutes(minutes);
        TimeEntry::new(category.id, category.name.clone(), start, end, end).unwrap()
    }

    #[test]
    fn empty_input_is_all_zero() {
        let range = Period::Today.range(at("2024-01-03T12:00:00Z"), &Calendar::utc());
        let data = compute(range, &[], &categories(), &Calendar::utc());
        assert_eq!(data, AnalyticsData::default());
        assert_eq!(data.most_active_category, None);
        assert!(!data.has_data());
        assert_eq!(data.balance(), BalanceIndicator::NoData);
    }

    #[test]
    fn period_ranges() {
        let calendar = Calendar::utc();
        let now = at("2024-01-03T12:00:00Z");

        let today = Period::Today.range(now, &calendar);
        assert_eq!(today.start, at("2024-01-03T00:00:00Z"));
        assert_eq!(today.end, at("2024-01-04T00:00:00Z"));

        let week = Period::ThisWeek.range(now, &calendar);
        assert_eq!(week.start, at("2024-01-01T00:00:00Z"));
        assert_eq!(week.end, at("2024-01-08T00:00:00Z"));

        let sunday_week = Period::ThisWeek.range(now, &Calendar::new(calendar.zone(), Weekday::Sun));
        assert_eq!(sunday_week.start, at("2023-12-31T00:00:00Z"));

        let month = Period::ThisMonth.range(now, &calendar);
        assert_eq!(month.start, at("2024-01-01T00:00:00Z"));
        assert_eq!(month.end, at("2024-02-01T00:00:00Z"));

        let custom = Period::Custom {
            start: at("2024-01-01T10:00:00Z"),
            end: at("2024-01-01T11:00:00Z"),
        };
        assert_eq!(custom.range(now, &calendar).end, at("2024-01-01T11:00:00Z"));
        assert_eq!(custom.to_string(), "Custom Range");
    }

    #[test]
    fn breakdown_totals_and_percentages() {
        let cats = categories();
        let work = named(&cats, "Work");
        let rest = named(&cats, "Rest");
        let entries = vec![
            entry(work, "2024-01-02T09:00:00Z", 60),
            entry(work, "2024-01-02T11:00:00Z", 30),
            entry(rest, "2024-01-02T13:00:00Z", 30),
        ];
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());

        assert_eq!(data.total_time, Duration::minutes(120));
        assert_eq!(data.number_of_entries, 3);
        assert_eq!(data.number_of_days, 1);
        assert_eq!(data.average_time_per_day, Duration::minutes(120));

        let names: Vec<_> = data
            .category_breakdown
            .iter()
            .map(|s| s.category_name.as_str())
            .collect();
        assert_eq!(names, ["Work", "Rest"]);
        let work_stat = &data.category_breakdown[0];
        assert_eq!(work_stat.number_of_entries, 2);
        assert_eq!(work_stat.average_duration, Duration::minutes(45));
        assert!((work_stat.percentage - 0.75).abs() < 1e-9);

        let sum: f64 = data.category_breakdown.iter().map(|s| s.percentage).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        assert_eq!(
            data.most_active_category.as_ref().unwrap().category_name,
            "Work"
        );
        assert!((data.work_rest_ratio - 3.0).abs() < 1e-9);
        assert_eq!(data.balance(), BalanceIndicator::NeedRest);
    }

    #[test]
    fn ties_keep_registry_order() {
        let cats = categories();
        // Registry order: Work, Rest, Sport, ...
        let sport = named(&cats, "Sport");
        let rest = named(&cats, "Rest");
        let entries = vec![
            entry(sport, "2024-01-02T09:00:00Z", 30),
            entry(rest, "2024-01-02T10:00:00Z", 30),
        ];
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert_eq!(data.category_breakdown[0].category_name, "Rest");
        assert_eq!(data.most_active_category.unwrap().category_name, "Rest");
    }

    #[test]
    fn range_filter_is_inclusive_at_the_end() {
        let cats = categories();
        let work = named(&cats, "Work");
        // Starts exactly at the next midnight: still counted in "today".
        let entries = vec![entry(work, "2024-01-04T00:00:00Z", 10)];
        let range = Period::Today.range(at("2024-01-03T12:00:00Z"), &Calendar::utc());
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert_eq!(data.number_of_entries, 1);
    }

    #[test]
    fn this_week_scenario() {
        let calendar = Calendar::utc();
        let cats = categories();
        let work = named(&cats, "Work");
        let now = at("2024-01-03T12:00:00Z");
        let entries = vec![
            entry(work, "2024-01-03T09:00:00Z", 30), // today
            entry(work, "2024-01-02T09:00:00Z", 20), // yesterday
            entry(work, "2023-12-27T09:00:00Z", 40), // last week
        ];
        let data = compute(Period::ThisWeek.range(now, &calendar), &entries, &cats, &calendar);

        assert_eq!(data.number_of_entries, 2);
        assert_eq!(data.total_time, Duration::minutes(50));
        assert_eq!(data.number_of_days, 7);

        // Walks start..=end, so the closing midnight gets its own row.
        assert_eq!(data.daily_breakdown.len(), 8);
        let first = &data.daily_breakdown[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.number_of_entries, 0);
        assert_eq!(data.daily_breakdown[1].total_time, Duration::minutes(20));
        assert_eq!(data.daily_breakdown[2].total_time, Duration::minutes(30));
        let dates: Vec<_> = data.daily_breakdown.iter().map(|d| d.date).collect();
        assert!(dates.windows(2).all(|w| w[1] == w[0].succ_opt().unwrap()));
    }

    #[test]
    fn ratio_is_name_based() {
        let mut cats = categories();
        let work_id = named(&cats, "Work").id;
        let rest = named(&cats, "Rest").clone();
        let work = cats.iter_mut().find(|c| c.id == work_id).unwrap();
        work.rename("Job").unwrap();
        let job = work.clone();

        let entries = vec![
            entry(&job, "2024-01-02T09:00:00Z", 60),
            entry(&rest, "2024-01-02T11:00:00Z", 60),
        ];
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert!(data.work_rest_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_without_rest_is_zero() {
        let cats = categories();
        let work = named(&cats, "Work");
        let entries = vec![entry(work, "2024-01-02T09:00:00Z", 60)];
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert!(data.work_rest_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn entries_of_deleted_categories_count_toward_totals_only() {
        let cats = categories();
        let gone = Category::new("Gone", "x", "000000", at("2024-01-01T00:00:00Z")).unwrap();
        let entries = vec![
            entry(&gone, "2024-01-02T09:00:00Z", 60),
            entry(named(&cats, "Work"), "2024-01-02T11:00:00Z", 60),
        ];
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert_eq!(data.total_time, Duration::minutes(120));
        assert_eq!(data.category_breakdown.len(), 1);
        assert!((data.category_breakdown[0].percentage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn per_category_statistics_and_sorting() {
        let cats = categories();
        let work = named(&cats, "Work");
        let sleep = named(&cats, "Sleep");
        let entries = vec![
            entry(work, "2024-01-02T09:00:00Z", 30),
            entry(sleep, "2024-01-02T22:00:00Z", 90),
        ];

        let stat = category_statistic(sleep, &entries).unwrap();
        assert_eq!(stat.total_time, Duration::minutes(90));
        assert!((stat.percentage - 0.75).abs() < 1e-9);
        assert_eq!(category_statistic(named(&cats, "Hobby"), &entries), None);

        let sorted = sort_by_tracked_time(&cats, &entries);
        assert_eq!(sorted[0].name, "Sleep");
        assert_eq!(sorted[1].name, "Work");
        assert_eq!(sorted[2].name, "Rest");
    }

    #[test]
    fn top_categories_are_capped() {
        let cats = categories();
        let entries: Vec<_> = cats
            .iter()
            .zip(1..)
            .map(|(c, minutes)| entry(c, "2024-01-02T09:00:00Z", minutes))
            .collect();
        let range = DateRange {
            start: at("2024-01-02T00:00:00Z"),
            end: at("2024-01-03T00:00:00Z"),
        };
        let data = compute(range, &entries, &cats, &Calendar::utc());
        assert_eq!(data.category_breakdown.len(), 8);
        let top: Vec<_> = data
            .top_categories()
            .iter()
            .map(|s| s.category_name.as_str())
            .collect();
        assert_eq!(top, ["Other", "Hobby", "Sleep", "Social", "Learning"]);
    }
}
