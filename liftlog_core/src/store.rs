//! Store interfaces consumed by the workout orchestrator.
//!
//! The exercise store holds one definition per exercise; the log sink is an
//! append-only record of completed exercises. Both take `&self` and must be
//! `Send + Sync` so one orchestrator can serve concurrent requests.

use crate::{
    normalize_name, Error, ExerciseDefinition, FieldUpdate, LogEntry, Result, WorkoutGroup,
};
use std::sync::{Arc, Mutex};

/// Exercise record store
pub trait ExerciseStore: Send + Sync {
    /// Find an exercise by trimmed, case-insensitive name
    fn find_exercise(&self, name: &str) -> Result<Option<ExerciseDefinition>>;

    /// Write a single field of an existing exercise
    fn write_field(&self, name: &str, update: FieldUpdate) -> Result<()>;

    /// All exercises belonging to a workout group, in store order
    fn list_by_group(&self, group: WorkoutGroup) -> Result<Vec<ExerciseDefinition>>;
}

/// Append-only log of completed exercises
pub trait LogSink: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;
}

impl<T: ExerciseStore + ?Sized> ExerciseStore for &T {
    fn find_exercise(&self, name: &str) -> Result<Option<ExerciseDefinition>> {
        (**self).find_exercise(name)
    }

    fn write_field(&self, name: &str, update: FieldUpdate) -> Result<()> {
        (**self).write_field(name, update)
    }

    fn list_by_group(&self, group: WorkoutGroup) -> Result<Vec<ExerciseDefinition>> {
        (**self).list_by_group(group)
    }
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        (**self).append(entry)
    }
}

impl<T: ExerciseStore + ?Sized> ExerciseStore for Arc<T> {
    fn find_exercise(&self, name: &str) -> Result<Option<ExerciseDefinition>> {
        (**self).find_exercise(name)
    }

    fn write_field(&self, name: &str, update: FieldUpdate) -> Result<()> {
        (**self).write_field(name, update)
    }

    fn list_by_group(&self, group: WorkoutGroup) -> Result<Vec<ExerciseDefinition>> {
        (**self).list_by_group(group)
    }
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        (**self).append(entry)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    exercises: Vec<ExerciseDefinition>,
    log: Vec<LogEntry>,
    writes: Vec<(String, FieldUpdate)>,
    fail_write_after: Option<usize>,
    fail_next_append: bool,
}

/// In-memory exercise store and log sink
///
/// Records every field write and can be primed to fail, which makes the
/// orchestrator's partial-failure handling testable without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new(exercises: Vec<ExerciseDefinition>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                exercises,
                ..MemoryInner::default()
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))
    }

    /// Current snapshot of an exercise, if present
    pub fn exercise(&self, name: &str) -> Option<ExerciseDefinition> {
        self.find_exercise(name).ok().flatten()
    }

    /// Every log entry appended so far
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.lock().map(|inner| inner.log.clone()).unwrap_or_default()
    }

    /// Every successful field write, in order
    pub fn writes(&self) -> Vec<(String, FieldUpdate)> {
        self.lock()
            .map(|inner| inner.writes.clone())
            .unwrap_or_default()
    }

    /// Let `successes` more field writes through, then fail the next one
    pub fn fail_write_after(&self, successes: usize) {
        if let Ok(mut inner) = self.lock() {
            inner.fail_write_after = Some(successes);
        }
    }

    /// Fail the next log append
    pub fn fail_next_append(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.fail_next_append = true;
        }
    }
}

impl ExerciseStore for MemoryStore {
    fn find_exercise(&self, name: &str) -> Result<Option<ExerciseDefinition>> {
        let inner = self.lock()?;
        Ok(inner
            .exercises
            .iter()
            .find(|def| def.matches_name(name))
            .cloned())
    }

    fn write_field(&self, name: &str, update: FieldUpdate) -> Result<()> {
        let mut inner = self.lock()?;

        match inner.fail_write_after {
            Some(0) => {
                inner.fail_write_after = None;
                return Err(Error::Store(format!(
                    "simulated failure writing '{}' for {}",
                    update.column(),
                    name
                )));
            }
            Some(n) => inner.fail_write_after = Some(n - 1),
            None => {}
        }

        let def = inner
            .exercises
            .iter_mut()
            .find(|def| def.matches_name(name))
            .ok_or_else(|| Error::NotFound(format!("Exercise {} not found.", name)))?;
        update.apply(def);
        inner.writes.push((normalize_name(name), update));
        Ok(())
    }

    fn list_by_group(&self, group: WorkoutGroup) -> Result<Vec<ExerciseDefinition>> {
        let inner = self.lock()?;
        Ok(inner
            .exercises
            .iter()
            .filter(|def| def.workout_group == group)
            .cloned()
            .collect())
    }
}

impl LogSink for MemoryStore {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.fail_next_append {
            inner.fail_next_append = false;
            return Err(Error::Store("simulated log append failure".into()));
        }
        inner.log.push(entry.clone());
        Ok(())
    }
}
