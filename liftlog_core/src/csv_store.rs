//! File-backed exercise store over a header-addressed CSV table.
//!
//! Columns are located by header name, so the table may carry extra columns
//! in any order. Reads take a shared lock; every field write is a
//! read-modify-write under an exclusive lock that replaces the table
//! atomically through a temp file.

use crate::store::ExerciseStore;
use crate::{
    Error, ExerciseDefinition, FieldUpdate, ProgressionType, Result, WorkoutGroup,
};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub const COL_GROUP: &str = "Workout Letter";
pub const COL_NAME: &str = "Exercise Name";
pub const COL_PROGRESSION: &str = "Progression Type";
pub const COL_CYCLE_STEP: &str = "Current Cycle Step";
pub const COL_BASE_WEIGHT: &str = "Cycle Base Weight";
pub const COL_CURRENT_WEIGHT: &str = "Current Weight";
pub const COL_REPS_MIN: &str = "Target Reps Min";
pub const COL_SETS_MIN: &str = "Target Sets Min";

const REQUIRED_COLUMNS: [&str; 7] = [
    COL_GROUP,
    COL_NAME,
    COL_PROGRESSION,
    COL_CYCLE_STEP,
    COL_BASE_WEIGHT,
    COL_CURRENT_WEIGHT,
    COL_REPS_MIN,
];

/// Column order used when creating a new table
const SEED_COLUMNS: [&str; 8] = [
    COL_GROUP,
    COL_NAME,
    COL_PROGRESSION,
    COL_CYCLE_STEP,
    COL_BASE_WEIGHT,
    COL_CURRENT_WEIGHT,
    COL_REPS_MIN,
    COL_SETS_MIN,
];

/// Parsed contents of the definitions table
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: HashMap<String, usize>,
}

impl Table {
    fn parse(contents: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(contents.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.trim().to_string(), idx))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        let table = Table {
            headers,
            rows,
            columns,
        };
        for column in REQUIRED_COLUMNS {
            table.column(column)?;
        }
        Ok(table)
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.columns.get(name).copied().ok_or_else(|| {
            Error::Schema(format!(
                "Missing required header column '{}' in workout definitions.",
                name
            ))
        })
    }

    fn cell<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|&idx| row.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn row_index(&self, name: &str) -> Option<usize> {
        let wanted = crate::normalize_name(name);
        self.rows
            .iter()
            .position(|row| crate::normalize_name(self.cell(row, COL_NAME)) == wanted)
    }

    fn definition(&self, row: &[String]) -> Result<ExerciseDefinition> {
        let name = self.cell(row, COL_NAME).to_string();
        let letter = self.cell(row, COL_GROUP);
        let workout_group = letter.parse::<WorkoutGroup>().map_err(|_| {
            Error::InvalidState(format!("Invalid workout letter '{}' for {}", letter, name))
        })?;

        Ok(ExerciseDefinition {
            workout_group,
            progression_type: ProgressionType::parse(self.cell(row, COL_PROGRESSION)),
            current_cycle_step: parse_whole(self.cell(row, COL_CYCLE_STEP)),
            cycle_base_weight: parse_weight(self.cell(row, COL_BASE_WEIGHT)),
            current_weight: parse_weight(self.cell(row, COL_CURRENT_WEIGHT)),
            target_reps_min: parse_whole(self.cell(row, COL_REPS_MIN)),
            target_sets_min: parse_whole(self.cell(row, COL_SETS_MIN)),
            name,
        })
    }

    fn set_cell(&mut self, row_idx: usize, column: usize, value: String) {
        let row = &mut self.rows[row_idx];
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = value;
    }

    fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Store(format!("Failed to encode workout definitions: {}", e)))
    }
}

fn parse_weight(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|w| w.is_finite() && *w >= 0.0)
}

/// Whole numbers, tolerating spreadsheet-style "3.0"
fn parse_whole(cell: &str) -> Option<u32> {
    if let Ok(n) = cell.parse::<u32>() {
        return Some(n);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
}

fn optional_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Exercise store backed by `workout_definitions.csv`
pub struct CsvExerciseStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl CsvExerciseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a fresh definitions table, replacing any existing one
    pub fn create(path: &Path, exercises: &[ExerciseDefinition]) -> Result<Self> {
        let rows = exercises
            .iter()
            .map(|def| {
                vec![
                    def.workout_group.to_string(),
                    def.name.clone(),
                    def.progression_type.to_string(),
                    optional_cell(def.current_cycle_step),
                    optional_cell(def.cycle_base_weight),
                    optional_cell(def.current_weight),
                    optional_cell(def.target_reps_min),
                    optional_cell(def.target_sets_min),
                ]
            })
            .collect();
        let table = Table {
            headers: SEED_COLUMNS.iter().map(|h| h.to_string()).collect(),
            rows,
            columns: SEED_COLUMNS
                .iter()
                .enumerate()
                .map(|(idx, h)| (h.to_string(), idx))
                .collect(),
        };

        let store = Self::new(path);
        store.persist(&table)?;
        tracing::info!(
            "Created workout definitions at {:?} with {} exercises",
            path,
            exercises.len()
        );
        Ok(store)
    }

    /// Every exercise in the table, skipping rows that cannot be interpreted
    pub fn load_all(&self) -> Result<Vec<ExerciseDefinition>> {
        let table = self.read_table()?;
        Ok(table
            .rows
            .iter()
            .filter(|row| !table.cell(row, COL_NAME).is_empty())
            .filter_map(|row| match table.definition(row) {
                Ok(def) => Some(def),
                Err(e) => {
                    tracing::warn!("Skipping unreadable definition row: {}", e);
                    None
                }
            })
            .collect())
    }

    fn read_table(&self) -> Result<Table> {
        let file = File::open(&self.path).map_err(|e| {
            Error::Store(format!(
                "Unable to open workout definitions {:?}: {}",
                self.path, e
            ))
        })?;

        // Acquire shared lock for reading
        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Table::parse(&contents)
    }

    /// Atomically replace the table: temp file, fsync, rename
    fn persist(&self, table: &Table) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let temp = NamedTempFile::new_in(&parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(&table.to_csv()?)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

impl ExerciseStore for CsvExerciseStore {
    fn find_exercise(&self, name: &str) -> Result<Option<ExerciseDefinition>> {
        let table = self.read_table()?;
        match table.row_index(name) {
            Some(idx) => table.definition(&table.rows[idx]).map(Some),
            None => Ok(None),
        }
    }

    fn write_field(&self, name: &str, update: FieldUpdate) -> Result<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| Error::Store("definitions write lock poisoned".into()))?;

        // Serialize writers across processes for the whole read-modify-write
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let result = (|| {
            let mut table = self.read_table()?;
            let column = table.column(update.column())?;
            let row = table
                .row_index(name)
                .ok_or_else(|| Error::NotFound(format!("Exercise {} not found.", name)))?;
            table.set_cell(row, column, update.value_string());
            self.persist(&table)
        })();

        lock_file.unlock()?;

        if result.is_ok() {
            tracing::debug!(
                "Wrote '{}' = {} for {}",
                update.column(),
                update.value_string(),
                name
            );
        }
        result
    }

    fn list_by_group(&self, group: WorkoutGroup) -> Result<Vec<ExerciseDefinition>> {
        let table = self.read_table()?;
        if let Err(e) = table.column(COL_SETS_MIN) {
            tracing::debug!("{} Assuming no failure-type set targets.", e);
        }

        let mut exercises = Vec::new();
        for row in &table.rows {
            let letter = table.cell(row, COL_GROUP);
            if !letter.eq_ignore_ascii_case(group.letter()) || table.cell(row, COL_NAME).is_empty()
            {
                continue;
            }
            exercises.push(table.definition(row)?);
        }
        Ok(exercises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Exercise Name,Workout Letter,Progression Type,Current Cycle Step,Cycle Base Weight,Current Weight,Target Reps Min,Target Sets Min,Notes
Back Squat,A,Cycle,3,100,105,5,,keep knees out
Pull-up,a,Failure,,,0,,3,
Bench Press,B,cycle,seven,100,110,5,,
";

    fn write_table(contents: &str) -> (tempfile::TempDir, CsvExerciseStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workout_definitions.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, CsvExerciseStore::new(path))
    }

    #[test]
    fn test_find_parses_columns_by_header() {
        let (_dir, store) = write_table(TABLE);
        let squat = store.find_exercise("  back SQUAT ").unwrap().unwrap();

        assert_eq!(squat.name, "Back Squat");
        assert_eq!(squat.workout_group, WorkoutGroup::A);
        assert_eq!(squat.progression_type, ProgressionType::Cycle);
        assert_eq!(squat.current_cycle_step, Some(3));
        assert_eq!(squat.cycle_base_weight, Some(100.0));
        assert_eq!(squat.current_weight, Some(105.0));
        assert_eq!(squat.target_reps_min, Some(5));
        assert_eq!(squat.target_sets_min, None);

        assert!(store.find_exercise("Deadlift").unwrap().is_none());
    }

    #[test]
    fn test_unparseable_cells_load_as_absent() {
        let (_dir, store) = write_table(TABLE);
        let bench = store.find_exercise("Bench Press").unwrap().unwrap();
        assert_eq!(bench.current_cycle_step, None);
        assert_eq!(bench.progression_type, ProgressionType::Cycle);
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let (_dir, store) = write_table("Exercise Name,Workout Letter\nBack Squat,A\n");
        assert!(matches!(
            store.find_exercise("Back Squat"),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_list_by_group_matches_letter_case_insensitively() {
        let (_dir, store) = write_table(TABLE);
        let group_a = store.list_by_group(WorkoutGroup::A).unwrap();
        let names: Vec<_> = group_a.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Back Squat", "Pull-up"]);
        assert_eq!(group_a[1].target_sets_min, Some(3));
    }

    #[test]
    fn test_write_field_preserves_other_columns() {
        let (_dir, store) = write_table(TABLE);
        store
            .write_field("back squat", FieldUpdate::CurrentCycleStep(4))
            .unwrap();
        store
            .write_field("Back Squat", FieldUpdate::CurrentWeight(112.5))
            .unwrap();

        let squat = store.find_exercise("Back Squat").unwrap().unwrap();
        assert_eq!(squat.current_cycle_step, Some(4));
        assert_eq!(squat.current_weight, Some(112.5));
        assert_eq!(squat.cycle_base_weight, Some(100.0));

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("keep knees out"));
        assert!(contents.starts_with("Exercise Name,Workout Letter"));
    }

    #[test]
    fn test_write_field_unknown_exercise_is_not_found() {
        let (_dir, store) = write_table(TABLE);
        assert!(matches!(
            store.write_field("Deadlift", FieldUpdate::CurrentWeight(200.0)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvExerciseStore::new(dir.path().join("missing.csv"));
        let err = store.find_exercise("Back Squat").unwrap_err();
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_create_then_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs").join("workout_definitions.csv");
        let exercises = crate::catalog::build_default_catalog();

        let store = CsvExerciseStore::create(&path, &exercises).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, exercises);

        // No stray temp files next to the table
        let extras: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "workout_definitions.csv")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_parse_whole_accepts_integral_floats() {
        assert_eq!(parse_whole("3"), Some(3));
        assert_eq!(parse_whole("3.0"), Some(3));
        assert_eq!(parse_whole("3.5"), None);
        assert_eq!(parse_whole("-1"), None);
        assert_eq!(parse_whole(""), None);
    }
}
