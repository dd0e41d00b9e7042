//! Workout log history across the live WAL and the CSV archive.

use crate::csv_rollup::CsvRow;
use crate::{normalize_name, Error, LogEntry, Result, WorkoutGroup};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

impl TryFrom<CsvRow> for LogEntry {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Store(format!("Invalid UUID in log archive: {}", e)))?;

        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Store(format!("Invalid timestamp in log archive: {}", e)))?
            .with_timezone(&Utc);

        let workout_group = row.workout_group.parse::<WorkoutGroup>().map_err(|_| {
            Error::Store(format!(
                "Invalid workout letter '{}' in log archive",
                row.workout_group
            ))
        })?;

        Ok(LogEntry {
            id,
            timestamp,
            workout_group,
            exercise_name: row.exercise_name,
            sets_performed: row.sets_performed,
            reps_performed: row.reps_performed,
            weight_used: row.weight_used,
            rpe: row.rpe,
            cycle_step_at_logging: row.cycle_step,
        })
    }
}

/// Load log entries from both the WAL and the CSV archive
///
/// Returns entries sorted by timestamp (newest first), de-duplicated by id.
/// With `exercise` set, only that exercise's entries (case-insensitive) are kept.
pub fn load_log_history(
    wal_path: &Path,
    csv_path: &Path,
    exercise: Option<&str>,
) -> Result<Vec<LogEntry>> {
    let wanted = exercise.map(normalize_name);
    let keep = |entry: &LogEntry| {
        wanted
            .as_deref()
            .map_or(true, |name| normalize_name(&entry.exercise_name) == name)
    };

    let mut entries = Vec::new();
    let mut seen_ids = HashSet::new();

    // WAL first (most recent)
    for entry in crate::wal::read_log_entries(wal_path)? {
        if keep(&entry) && seen_ids.insert(entry.id) {
            entries.push(entry);
        }
    }
    let wal_count = entries.len();

    if csv_path.exists() {
        for entry in load_entries_from_csv(csv_path)? {
            if keep(&entry) && seen_ids.insert(entry.id) {
                entries.push(entry);
            }
        }
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    tracing::debug!(
        "Loaded {} log entries ({} live, {} archived)",
        entries.len(),
        wal_count,
        entries.len() - wal_count
    );

    Ok(entries)
}

fn load_entries_from_csv(path: &Path) -> Result<Vec<LogEntry>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result.map_err(Error::from).and_then(LogEntry::try_from) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!("Skipping archived log row: {}", e),
        }
    }

    Ok(entries)
}
