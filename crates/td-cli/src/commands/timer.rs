//! Timer commands: start, pause, resume, stop, status and watch.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use td_core::format::{format_clock, format_duration, format_time, format_time_range};
use td_core::{TickConfig, TickSink, TimerStatus, Tracker};

use super::util::{resolve_category, short_id};

pub fn start<W: Write>(writer: &mut W, tracker: &mut Tracker, category: &str) -> Result<()> {
    let id = resolve_category(tracker, category)?;
    tracker.start(id)?;

    let use_24h = tracker.settings().use_24_hour_format;
    let name = tracker.timer_state().category_name.clone().unwrap_or_default();
    let at = format_time(tracker.now(), tracker.calendar(), use_24h);
    writeln!(writer, "Started {name} at {at}")?;
    Ok(())
}

pub fn pause<W: Write>(writer: &mut W, tracker: &mut Tracker) -> Result<()> {
    tracker.pause()?;
    let name = tracker.timer_state().category_name.clone().unwrap_or_default();
    writeln!(
        writer,
        "Paused {name} at {}",
        format_clock(tracker.current_elapsed())
    )?;
    Ok(())
}

pub fn resume<W: Write>(writer: &mut W, tracker: &mut Tracker) -> Result<()> {
    tracker.resume()?;
    let name = tracker.timer_state().category_name.clone().unwrap_or_default();
    writeln!(
        writer,
        "Resumed {name} at {}",
        format_clock(tracker.current_elapsed())
    )?;
    Ok(())
}

pub fn stop<W: Write>(writer: &mut W, tracker: &mut Tracker) -> Result<()> {
    let entry = tracker.stop()?;
    let use_24h = tracker.settings().use_24_hour_format;
    writeln!(
        writer,
        "Stopped {} after {} ({})",
        entry.category_name,
        format_duration(entry.duration()),
        format_time_range(
            entry.start_time(),
            entry.end_time(),
            tracker.calendar(),
            use_24h
        ),
    )?;
    writeln!(writer, "Entry: {}", short_id(entry.id))?;
    if entry.is_zero_length() {
        writeln!(writer, "Note: the entry has zero length.")?;
    }
    Ok(())
}

pub fn status<W: Write>(writer: &mut W, tracker: &Tracker) -> Result<()> {
    let state = tracker.timer_state();
    let use_24h = tracker.settings().use_24_hour_format;

    writeln!(writer, "Timer:     {}", state.status)?;
    if state.status != TimerStatus::Idle {
        writeln!(
            writer,
            "Category:  {}",
            state.category_name.as_deref().unwrap_or_default()
        )?;
        writeln!(writer, "Elapsed:   {}", format_clock(tracker.current_elapsed()))?;
        if let Some(started) = state.session_start {
            writeln!(
                writer,
                "Started:   {}",
                format_time(started, tracker.calendar(), use_24h)
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Today:     {}", format_duration(tracker.today_total()))?;
    writeln!(writer, "This week: {}", format_duration(tracker.week_total()))?;

    let recent = tracker.recent_entries();
    if !recent.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Recent entries:")?;
        for entry in recent {
            writeln!(
                writer,
                "  {}  {:<12} {}",
                format_time_range(
                    entry.start_time(),
                    entry.end_time(),
                    tracker.calendar(),
                    use_24h
                ),
                entry.category_name,
                format_duration(entry.duration()),
            )?;
        }
    }
    Ok(())
}

/// Sink that redraws the running clock in place on stdout.
pub fn stdout_clock() -> TickSink {
    Arc::new(|elapsed| {
        let mut out = std::io::stdout().lock();
        if let Err(err) = write!(out, "\r{}", format_clock(elapsed)).and_then(|()| out.flush()) {
            tracing::debug!(error = %err, "failed to draw clock");
        }
    })
}

/// Follows the running timer.
///
/// Without a tick config the elapsed time is printed once. Otherwise ticks
/// flow to the config's sink until `limit` passes, or forever.
pub fn watch<W: Write>(
    writer: &mut W,
    tracker: Tracker,
    tick: Option<TickConfig>,
    limit: Option<std::time::Duration>,
) -> Result<()> {
    let status = tracker.timer_state().status;
    if status != TimerStatus::Running {
        writeln!(writer, "Timer is {status}; nothing to watch.")?;
        return Ok(());
    }

    let Some(config) = tick else {
        writeln!(writer, "{}", format_clock(tracker.current_elapsed()))?;
        return Ok(());
    };

    let tracker = tracker.with_tick(config);
    tracing::debug!(?limit, "watching timer");
    match limit {
        Some(limit) => std::thread::sleep(limit),
        None => loop {
            std::thread::park();
        },
    }
    drop(tracker);
    writeln!(writer)?;
    Ok(())
}
