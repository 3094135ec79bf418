//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Personal time diary.
///
/// Start a timer against a category, pause and resume it, and review where
/// the time went.
#[derive(Debug, Parser)]
#[command(name = "td", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the timer against a category (name or id).
    Start { category: String },

    /// Pause the running timer.
    Pause,

    /// Resume the paused timer.
    Resume,

    /// Stop the timer and record the entry.
    Stop,

    /// Show the timer and today's totals.
    Status,

    /// Print the running clock every second.
    Watch {
        /// Stop watching after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Record a finished entry by hand.
    Add {
        /// Category name or id.
        category: String,

        /// Start time (RFC 3339, "YYYY-MM-DD HH:MM", or "2 hours ago").
        #[arg(long)]
        start: String,

        /// End time, same formats as --start.
        #[arg(long)]
        end: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// Browse and edit time entries.
    #[command(subcommand)]
    Entries(EntriesAction),

    /// Manage categories.
    #[command(subcommand)]
    Categories(CategoriesAction),

    /// Show analytics for a period.
    Report {
        #[command(subcommand)]
        period: Option<ReportPeriod>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export every entry as CSV.
    Export {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change display settings.
    Settings {
        /// Use 24-hour times.
        #[arg(long = "24h")]
        use_24_hour: Option<bool>,
    },

    /// Manage the daily reminder.
    #[command(subcommand)]
    Reminder(ReminderAction),

    /// Delete every entry, category and setting.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum EntriesAction {
    /// List entries grouped by day.
    List {
        /// Only these categories (name or id). Repeatable.
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Case-insensitive category name search.
        #[arg(long)]
        search: Option<String>,

        /// Only entries on this day (YYYY-MM-DD).
        #[arg(long)]
        day: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Change the start and end of an entry.
    Edit {
        id: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,
    },

    /// Set the notes of an entry. Omit the text to clear them.
    Note { id: String, text: Option<String> },

    /// Delete an entry.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoriesAction {
    /// List all categories.
    List,

    /// Create a category.
    Add {
        name: String,

        #[arg(long, default_value = "tag.fill")]
        icon: String,

        /// Hex color without '#'.
        #[arg(long, default_value = "546E7A")]
        color: String,
    },

    /// Rename or restyle a category.
    Edit {
        /// Category name or id.
        category: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a custom category. A timer running on it is stopped first.
    Delete { category: String },

    /// Show recently used categories.
    Recent,

    /// Show per-category totals over all entries.
    Stats,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ReportPeriod {
    /// Today (default).
    Today,
    /// The current week.
    Week,
    /// The current month.
    Month,
    /// An explicit range.
    Custom {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReminderAction {
    /// Show the reminder settings.
    Show,
    /// Turn the daily reminder on.
    On,
    /// Turn the daily reminder off.
    Off,
    /// Change the reminder time (HH:MM).
    Set { time: String },
}
