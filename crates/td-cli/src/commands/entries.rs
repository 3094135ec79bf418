//! Entry commands: add, list, edit, note and delete.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use td_core::format::{format_duration, format_time_range};
use td_core::history::{HistoryGroup, HistorySummary};
use td_core::{EntryFilter, TimeEntry, Tracker};

use super::util::{parse_datetime, parse_day, resolve_category, resolve_entry, short_id};

/// Filters accepted by `td entries list`.
#[derive(Debug, Default)]
pub struct ListArgs<'a> {
    pub categories: &'a [String],
    pub search: Option<&'a str>,
    pub day: Option<&'a str>,
    pub json: bool,
}

#[derive(Serialize)]
struct JsonHistory<'a> {
    groups: &'a [HistoryGroup],
    summary: HistorySummary,
}

pub fn add<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    category: &str,
    start: &str,
    end: &str,
    note: Option<&str>,
) -> Result<()> {
    let category = resolve_category(tracker, category)?;
    let now = tracker.now();
    let start = parse_datetime(start, now, tracker.calendar()).context("invalid --start")?;
    let end = parse_datetime(end, now, tracker.calendar()).context("invalid --end")?;

    let entry = tracker.add_entry(category, start, end, note)?;
    writeln!(writer, "Added {}", describe(tracker, &entry))?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, tracker: &Tracker, args: &ListArgs<'_>) -> Result<()> {
    let filter = EntryFilter {
        categories: args
            .categories
            .iter()
            .map(|c| resolve_category(tracker, c))
            .collect::<Result<_>>()?,
        search: args.search.unwrap_or_default().to_string(),
        day: args
            .day
            .map(|d| parse_day(d, tracker.calendar()))
            .transpose()?,
    };

    let groups = tracker.history(&filter);
    let summary = tracker.history_summary(&filter);

    if args.json {
        let report = JsonHistory {
            groups: &groups,
            summary,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    if groups.is_empty() {
        if filter.is_empty() {
            writeln!(writer, "No entries yet. Start one with 'td start <category>'.")?;
        } else {
            writeln!(writer, "No entries match.")?;
        }
        return Ok(());
    }

    let use_24h = tracker.settings().use_24_hour_format;
    for group in &groups {
        writeln!(writer, "{}", group.label.to_uppercase())?;
        writeln!(writer, "{}", "─".repeat(group.label.chars().count()))?;
        for entry in &group.entries {
            let range = format_time_range(
                entry.start_time(),
                entry.end_time(),
                tracker.calendar(),
                use_24h,
            );
            write!(
                writer,
                "  {}  {}  {:<20} {:>7}",
                short_id(entry.id),
                tracker.calendar().format(entry.start_time(), "%Y-%m-%d"),
                range,
                format_duration(entry.duration()),
            )?;
            writeln!(writer, "  {}", entry.category_name)?;
            if let Some(notes) = &entry.notes {
                writeln!(writer, "            {notes}")?;
            }
        }
        writeln!(writer)?;
    }

    writeln!(
        writer,
        "{} entries, {} total, {} average",
        summary.total_entries,
        format_duration(summary.total_time),
        format_duration(summary.average_duration),
    )?;
    Ok(())
}

pub fn edit<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    id: &str,
    start: &str,
    end: &str,
) -> Result<()> {
    let id = resolve_entry(tracker, id)?;
    let now = tracker.now();
    let start = parse_datetime(start, now, tracker.calendar()).context("invalid --start")?;
    let end = parse_datetime(end, now, tracker.calendar()).context("invalid --end")?;

    let entry = tracker.retime_entry(id, start, end)?;
    writeln!(writer, "Updated {}", describe(tracker, &entry))?;
    Ok(())
}

pub fn note<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    id: &str,
    text: Option<&str>,
) -> Result<()> {
    let id = resolve_entry(tracker, id)?;
    tracker.set_entry_notes(id, text)?;
    match tracker.entries().get(id).and_then(|e| e.notes.as_deref()) {
        Some(notes) => writeln!(writer, "Notes for {}: {notes}", short_id(id))?,
        None => writeln!(writer, "Cleared notes for {}", short_id(id))?,
    }
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, tracker: &mut Tracker, id: &str) -> Result<()> {
    let id = resolve_entry(tracker, id)?;
    let entry = tracker.delete_entry(id)?;
    writeln!(writer, "Deleted {}", describe(tracker, &entry))?;
    Ok(())
}

fn describe(tracker: &Tracker, entry: &TimeEntry) -> String {
    let use_24h = tracker.settings().use_24_hour_format;
    format!(
        "{} {} on {} ({}, {})",
        entry.category_name,
        short_id(entry.id),
        tracker.calendar().format(entry.start_time(), "%Y-%m-%d"),
        format_time_range(
            entry.start_time(),
            entry.end_time(),
            tracker.calendar(),
            use_24h
        ),
        format_duration(entry.duration()),
    )
}
