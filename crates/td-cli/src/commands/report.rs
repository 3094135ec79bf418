//! Report command for period analytics.
//!
//! This module implements `td report` for today, this week, this month or a
//! custom range, with human-readable and JSON output.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use td_core::format::{BalanceIndicator, format_duration, format_percentage, format_ratio};
use td_core::{AnalyticsData, Calendar, DateRange, Period, Tracker, Zone};

use super::util::parse_datetime;
use crate::cli::ReportPeriod;

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub range: DateRange,
    pub timezone: String,
    pub analytics: AnalyticsData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    timezone: &'a str,
    period: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    balance: BalanceIndicator,
    #[serde(flatten)]
    analytics: &'a AnalyticsData,
}

// ========== Period Resolution ==========

/// Maps the CLI period onto an analytics period. Defaults to today.
pub fn resolve_period(period: Option<&ReportPeriod>, tracker: &Tracker) -> Result<Period> {
    Ok(match period {
        None | Some(ReportPeriod::Today) => Period::Today,
        Some(ReportPeriod::Week) => Period::ThisWeek,
        Some(ReportPeriod::Month) => Period::ThisMonth,
        Some(ReportPeriod::Custom { from, to }) => {
            let now = tracker.now();
            let start = parse_datetime(from, now, tracker.calendar())?;
            let end = parse_datetime(to, now, tracker.calendar())?;
            if end < start {
                anyhow::bail!("--to must not be before --from");
            }
            Period::Custom { start, end }
        }
    })
}

/// Name of the calendar's zone for the report header.
pub fn timezone_name(calendar: &Calendar) -> String {
    match calendar.zone() {
        Zone::Local => iana_time_zone::get_timezone().unwrap_or_else(|_| "Local".to_string()),
        Zone::Fixed(offset) if offset.local_minus_utc() == 0 => "UTC".to_string(),
        Zone::Fixed(offset) => offset.to_string(),
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "ratio is clamped to 0..=10 before the cast"
)]
pub fn progress_bar(value: Duration, max: Duration) -> String {
    let (value, max) = (value.num_milliseconds(), max.num_milliseconds());
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

pub fn generate_report_data(tracker: &Tracker, period: Period, timezone: String) -> ReportData {
    let generated_at = tracker.now();
    ReportData {
        generated_at,
        period,
        range: period.range(generated_at, tracker.calendar()),
        timezone,
        analytics: tracker.analytics(period),
    }
}

/// Writes the human-readable report.
pub fn format_report<W: Write>(
    writer: &mut W,
    data: &ReportData,
    calendar: &Calendar,
) -> std::io::Result<()> {
    let stats = &data.analytics;
    writeln!(
        writer,
        "REPORT: {} ({} to {})",
        data.period,
        calendar.format(data.range.start, "%Y-%m-%d %H:%M"),
        calendar.format(data.range.end, "%Y-%m-%d %H:%M"),
    )?;
    writeln!(writer, "Timezone: {}", data.timezone)?;

    if !stats.has_data() {
        writeln!(writer)?;
        writeln!(writer, "No entries recorded for this period.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'td start <category>' to begin tracking.")?;
        return Ok(());
    }

    writeln!(writer)?;
    writeln!(writer, "SUMMARY")?;
    writeln!(writer, "───────")?;
    writeln!(writer, "Total tracked:  {}", format_duration(stats.total_time))?;
    writeln!(writer, "Entries:        {}", stats.number_of_entries)?;
    writeln!(writer, "Days:           {}", stats.number_of_days)?;
    writeln!(
        writer,
        "Daily average:  {}",
        format_duration(stats.average_time_per_day)
    )?;
    if let Some(top) = &stats.most_active_category {
        writeln!(
            writer,
            "Most active:    {} ({})",
            top.category_name,
            format_duration(top.total_time)
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "BY CATEGORY")?;
    writeln!(writer, "───────────")?;
    let max = stats
        .category_breakdown
        .first()
        .map_or_else(Duration::zero, |s| s.total_time);
    for stat in &stats.category_breakdown {
        writeln!(
            writer,
            "  {:<12} {}  {:>7}  {:>6}  {} entries, avg {}",
            stat.category_name,
            progress_bar(stat.total_time, max),
            format_duration(stat.total_time),
            format_percentage(stat.percentage),
            stat.number_of_entries,
            format_duration(stat.average_duration),
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "DAILY")?;
    writeln!(writer, "─────")?;
    let max = stats
        .daily_breakdown
        .iter()
        .map(|d| d.total_time)
        .max()
        .unwrap_or_else(Duration::zero);
    for day in &stats.daily_breakdown {
        writeln!(
            writer,
            "  {}  {}  {}",
            day.date.format("%a %Y-%m-%d"),
            progress_bar(day.total_time, max),
            format_duration(day.total_time),
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "BALANCE")?;
    writeln!(writer, "───────")?;
    writeln!(
        writer,
        "Work/rest ratio: {} ({})",
        format_ratio(stats.work_rest_ratio),
        stats.balance()
    )?;
    Ok(())
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        generated_at: data.generated_at,
        timezone: &data.timezone,
        period: data.period.display_name(),
        start: data.range.start,
        end: data.range.end,
        balance: data.analytics.balance(),
        analytics: &data.analytics,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    period: Option<&ReportPeriod>,
    json: bool,
) -> Result<()> {
    let period = resolve_period(period, tracker)?;
    let data = generate_report_data(tracker, period, timezone_name(tracker.calendar()));
    tracing::debug!(%period, entries = data.analytics.number_of_entries, "generated report");

    if json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        format_report(writer, &data, tracker.calendar())?;
    }
    Ok(())
}
