//! Write-Ahead Log (WAL) for workout log entries.
//!
//! Entries are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access.

use crate::store::LogSink;
use crate::{LogEntry, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// JSONL-based log sink with file locking
pub struct JsonlLogSink {
    path: PathBuf,
}

impl JsonlLogSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlLogSink {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One line per entry, written in a single call
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        let written = writer.write_all(line.as_bytes()).and_then(|_| writer.flush());
        drop(writer);

        file.unlock()?;
        written?;

        tracing::debug!(
            "Appended log entry {} ({}) to WAL",
            entry.id,
            entry.exercise_name
        );
        Ok(())
    }
}

/// Read all log entries from a WAL file
///
/// Unparseable lines (e.g. a torn final write) are skipped with a warning.
pub fn read_log_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse log entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} log entries from WAL", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkoutGroup;
    use chrono::Utc;
    use uuid::Uuid;

    fn create_test_entry(name: &str) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            workout_group: WorkoutGroup::A,
            exercise_name: name.into(),
            sets_performed: 3,
            reps_performed: 5,
            weight_used: 135.0,
            rpe: 7.0,
            cycle_step_at_logging: Some(2),
        }
    }

    #[test]
    fn test_append_and_read_single_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("wal").join("workout_log.wal");

        let entry = create_test_entry("Back Squat");
        let sink = JsonlLogSink::new(&wal_path);
        sink.append(&entry).unwrap();

        let entries = read_log_entries(&wal_path).unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[test]
    fn test_append_preserves_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workout_log.wal");

        let sink = JsonlLogSink::new(&wal_path);
        for name in ["Squat", "Bench", "Row"] {
            sink.append(&create_test_entry(name)).unwrap();
        }

        let names: Vec<_> = read_log_entries(&wal_path)
            .unwrap()
            .into_iter()
            .map(|e| e.exercise_name)
            .collect();
        assert_eq!(names, vec!["Squat", "Bench", "Row"]);
    }

    #[test]
    fn test_read_missing_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = read_log_entries(&temp_dir.path().join("nonexistent.wal")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workout_log.wal");

        let sink = JsonlLogSink::new(&wal_path);
        sink.append(&create_test_entry("Squat")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(br#"{"id":"00000000-0000-0000"#).unwrap();

        let entries = read_log_entries(&wal_path).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
