//! Export command: every entry as CSV.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use td_core::Tracker;

/// Writes the CSV to `output`, or to `writer` when no path is given.
pub fn run<W: Write>(writer: &mut W, tracker: &Tracker, output: Option<&Path>) -> Result<()> {
    let csv = tracker.export_csv();
    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(
                writer,
                "Exported {} entries to {}",
                tracker.entries().count(),
                path.display()
            )?;
        }
        None => writer.write_all(csv.as_bytes())?,
    }
    tracing::debug!(entries = tracker.entries().count(), "exported entries");
    Ok(())
}
