//! Category commands.

use std::io::Write;

use anyhow::{Context, Result};

use td_core::format::{format_duration, format_percentage, format_time};
use td_core::{Category, Tracker};

use super::util::resolve_category;

pub fn list<W: Write>(writer: &mut W, tracker: &Tracker) -> Result<()> {
    for category in tracker.categories().all() {
        write!(
            writer,
            "{:<12} {:<22} #{}",
            category.name, category.icon_name, category.color_hex
        )?;
        if category.is_default {
            write!(writer, "  default")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn add<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    name: &str,
    icon: &str,
    color: &str,
) -> Result<()> {
    if tracker.categories().find_by_name(name).is_some() {
        anyhow::bail!("a category named '{}' already exists", name.trim());
    }
    let category = Category::new(name, icon, color.trim_start_matches('#'), tracker.now())?;
    let name = category.name.clone();
    tracker.create_category(category)?;
    writeln!(writer, "Created category {name}")?;
    Ok(())
}

pub fn edit<W: Write>(
    writer: &mut W,
    tracker: &mut Tracker,
    query: &str,
    name: Option<&str>,
    icon: Option<&str>,
    color: Option<&str>,
) -> Result<()> {
    let id = resolve_category(tracker, query)?;
    let mut category = tracker
        .categories()
        .get(id)
        .cloned()
        .context("category disappeared")?;

    if let Some(name) = name {
        if tracker
            .categories()
            .find_by_name(name)
            .is_some_and(|other| other.id != id)
        {
            anyhow::bail!("a category named '{}' already exists", name.trim());
        }
        category.rename(name)?;
    }
    if let Some(icon) = icon {
        category.icon_name = icon.to_string();
    }
    if let Some(color) = color {
        category.color_hex = color.trim_start_matches('#').to_string();
    }

    let name = category.name.clone();
    if !tracker.update_category(category)? {
        anyhow::bail!("no category named '{query}'");
    }
    writeln!(writer, "Updated category {name}")?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, tracker: &mut Tracker, query: &str) -> Result<()> {
    let id = resolve_category(tracker, query)?;
    let Some(deletion) = tracker.delete_category(id)? else {
        anyhow::bail!("no category named '{query}'");
    };
    if let Some(entry) = deletion.stopped_entry {
        writeln!(
            writer,
            "Stopped the running timer and recorded {} of {}",
            format_duration(entry.duration()),
            entry.category_name
        )?;
    }
    writeln!(writer, "Deleted category {}", deletion.category.name)?;
    Ok(())
}

pub fn recent<W: Write>(writer: &mut W, tracker: &Tracker) -> Result<()> {
    let recent = tracker.recent_categories();
    if recent.is_empty() {
        writeln!(writer, "No categories used yet.")?;
        return Ok(());
    }
    let use_24h = tracker.settings().use_24_hour_format;
    for category in recent {
        let last_used = category
            .last_used_at
            .map(|t| {
                format!(
                    "{} {}",
                    tracker.calendar().format(t, "%Y-%m-%d"),
                    format_time(t, tracker.calendar(), use_24h)
                )
            })
            .unwrap_or_default();
        writeln!(writer, "  {:<12} {last_used}", category.name)?;
    }
    Ok(())
}

/// Per-category totals over every entry, largest first.
pub fn stats<W: Write>(writer: &mut W, tracker: &Tracker) -> Result<()> {
    for category in tracker.categories_by_tracked_time() {
        match tracker.category_statistic(category.id) {
            Some(stat) => writeln!(
                writer,
                "  {:<12} {:>8}  {:>6}  {} entries, avg {}",
                category.name,
                format_duration(stat.total_time),
                format_percentage(stat.percentage),
                stat.number_of_entries,
                format_duration(stat.average_duration),
            )?,
            None => writeln!(writer, "  {:<12} {:>8}", category.name, "-")?,
        }
    }
    Ok(())
}
