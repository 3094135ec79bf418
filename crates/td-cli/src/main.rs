use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use td_cli::commands::{categories, entries, export, report, settings, timer};
use td_cli::{
    CategoriesAction, Cli, Commands, Config, EntriesAction, LogReminders, ReminderAction,
};
use td_core::{Gateway, SystemClock, TickConfig, Tracker};

/// Load config, open the database and assemble the tracker.
fn open_tracker(config_path: Option<&Path>) -> Result<(Tracker, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let db = td_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    let mut tracker = Tracker::open(
        Gateway::new(Arc::new(db)),
        Arc::new(SystemClock),
        config.calendar(),
    )
    .with_reminders(Box::new(LogReminders));
    tracker
        .sync_reminders()
        .context("failed to sync reminder schedule")?;
    Ok((tracker, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut tracker, config) = open_tracker(cli.config.as_deref())?;
    // Unlocked: the watch tick writes to stdout from its own thread.
    let out = &mut std::io::stdout();

    match command {
        Commands::Start { category } => timer::start(out, &mut tracker, category)?,
        Commands::Pause => timer::pause(out, &mut tracker)?,
        Commands::Resume => timer::resume(out, &mut tracker)?,
        Commands::Stop => timer::stop(out, &mut tracker)?,
        Commands::Status => timer::status(out, &tracker)?,
        Commands::Watch { seconds } => {
            let tick = config.tick.then(|| TickConfig::new(timer::stdout_clock()));
            let limit = seconds.map(std::time::Duration::from_secs);
            timer::watch(out, tracker, tick, limit)?;
        }
        Commands::Add {
            category,
            start,
            end,
            note,
        } => entries::add(out, &mut tracker, category, start, end, note.as_deref())?,
        Commands::Entries(action) => match action {
            EntriesAction::List {
                categories,
                search,
                day,
                json,
            } => {
                let args = entries::ListArgs {
                    categories,
                    search: search.as_deref(),
                    day: day.as_deref(),
                    json: *json,
                };
                entries::list(out, &tracker, &args)?;
            }
            EntriesAction::Edit { id, start, end } => {
                entries::edit(out, &mut tracker, id, start, end)?;
            }
            EntriesAction::Note { id, text } => {
                entries::note(out, &mut tracker, id, text.as_deref())?;
            }
            EntriesAction::Delete { id } => entries::delete(out, &mut tracker, id)?,
        },
        Commands::Categories(action) => match action {
            CategoriesAction::List => categories::list(out, &tracker)?,
            CategoriesAction::Add { name, icon, color } => {
                categories::add(out, &mut tracker, name, icon, color)?;
            }
            CategoriesAction::Edit {
                category,
                name,
                icon,
                color,
            } => categories::edit(
                out,
                &mut tracker,
                category,
                name.as_deref(),
                icon.as_deref(),
                color.as_deref(),
            )?,
            CategoriesAction::Delete { category } => {
                categories::delete(out, &mut tracker, category)?;
            }
            CategoriesAction::Recent => categories::recent(out, &tracker)?,
            CategoriesAction::Stats => categories::stats(out, &tracker)?,
        },
        Commands::Report { period, json } => {
            report::run(out, &tracker, period.as_ref(), *json)?;
        }
        Commands::Export { output } => export::run(out, &tracker, output.as_deref())?,
        Commands::Settings { use_24_hour } => {
            settings::settings(out, &mut tracker, *use_24_hour)?;
        }
        Commands::Reminder(action) => match action {
            ReminderAction::Show => settings::reminder_show(out, &tracker)?,
            ReminderAction::On => settings::reminder_on(out, &mut tracker)?,
            ReminderAction::Off => settings::reminder_off(out, &mut tracker)?,
            ReminderAction::Set { time } => settings::reminder_set(out, &mut tracker, time)?,
        },
        Commands::Reset { yes } => settings::reset(out, &mut tracker, *yes)?,
    }

    Ok(())
}
