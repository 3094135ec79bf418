//! CLI subcommand implementations.

pub mod categories;
pub mod entries;
pub mod export;
pub mod report;
pub mod settings;
pub mod timer;
pub mod util;
