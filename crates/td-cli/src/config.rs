//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::Weekday;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use td_core::Calendar;

/// First day of the week for "this week" ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl From<WeekStart> for Weekday {
    fn from(start: WeekStart) -> Self {
        match start {
            WeekStart::Monday => Self::Mon,
            WeekStart::Sunday => Self::Sun,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    pub week_starts_on: WeekStart,
    /// Whether `td watch` prints the running clock every second.
    pub tick: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("td.db"),
            week_starts_on: WeekStart::default(),
            tick: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TD_*)
        figment = figment.merge(Env::prefixed("TD_"));

        figment.extract()
    }

    /// Calendar in the local zone with the configured first weekday.
    pub fn calendar(&self) -> Calendar {
        Calendar::local(self.week_starts_on.into())
    }
}

/// Returns the platform-specific config directory for td.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("td"))
}

/// Returns the platform-specific data directory for td.
///
/// On Linux: `~/.local/share/td`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("td"))
}
