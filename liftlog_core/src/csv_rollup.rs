//! CSV rollup for archiving the workout log WAL.
//!
//! Live entries are appended to a CSV archive and the WAL is renamed out of
//! the way, so the archive and the live log never lose an entry between them.

use crate::{LogEntry, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub timestamp: String,
    pub workout_group: String,
    pub exercise_name: String,
    pub sets_performed: u32,
    pub reps_performed: u32,
    pub weight_used: f64,
    pub rpe: f64,
    /// Blank for non-cycle exercises
    pub cycle_step: Option<u32>,
}

impl From<&LogEntry> for CsvRow {
    fn from(entry: &LogEntry) -> Self {
        CsvRow {
            id: entry.id.to_string(),
            timestamp: entry.timestamp.to_rfc3339(),
            workout_group: entry.workout_group.to_string(),
            exercise_name: entry.exercise_name.clone(),
            sets_performed: entry.sets_performed,
            reps_performed: entry.reps_performed,
            weight_used: entry.weight_used,
            rpe: entry.rpe,
            cycle_step: entry.cycle_step_at_logging,
        }
    }
}

/// Roll up WAL entries into CSV and archive the WAL
///
/// This function:
/// 1. Reads all entries from the WAL
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of entries processed
///
/// The CSV is fsynced before the WAL is renamed, and the WAL is renamed
/// rather than deleted so it can be recovered by hand.
pub fn rollup_log(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let entries = crate::wal::read_log_entries(wal_path)?;

    if entries.is_empty() {
        tracing::info!("No log entries in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Headers only when starting a new archive
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for entry in &entries {
        writer.serialize(CsvRow::from(entry))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} log entries to CSV", entries.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(entries.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
