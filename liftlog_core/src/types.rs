//! Core domain types for the liftlog system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout groups and progression types
//! - Exercise definitions (the stored progression state)
//! - Log entries for completed exercises
//! - Prescriptions (sets/reps/weight targets)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Workout Groups
// ============================================================================

/// Session an exercise belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkoutGroup {
    A,
    B,
    C,
}

impl WorkoutGroup {
    pub const ALL: [WorkoutGroup; 3] = [WorkoutGroup::A, WorkoutGroup::B, WorkoutGroup::C];

    pub fn letter(&self) -> &'static str {
        match self {
            WorkoutGroup::A => "A",
            WorkoutGroup::B => "B",
            WorkoutGroup::C => "C",
        }
    }
}

impl fmt::Display for WorkoutGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for WorkoutGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(WorkoutGroup::A),
            "B" => Ok(WorkoutGroup::B),
            "C" => Ok(WorkoutGroup::C),
            _ => Err(Error::Validation(
                "Workout Letter is missing or invalid.".into(),
            )),
        }
    }
}

// ============================================================================
// Progression Types
// ============================================================================

/// How an exercise advances between sessions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionType {
    /// Table-driven 8-step cycle keyed on RPE
    Cycle,
    /// Fixed sets taken to failure, no automatic weight change
    Failure,
    /// Anything else; passed through untouched
    Other(String),
}

impl ProgressionType {
    /// Parse a stored progression label (case-insensitive)
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "cycle" => ProgressionType::Cycle,
            "failure" => ProgressionType::Failure,
            _ => ProgressionType::Other(trimmed.to_string()),
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, ProgressionType::Cycle)
    }
}

impl fmt::Display for ProgressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressionType::Cycle => f.write_str("Cycle"),
            ProgressionType::Failure => f.write_str("Failure"),
            ProgressionType::Other(label) => f.write_str(label),
        }
    }
}

// ============================================================================
// Exercise Definitions and Log Entries
// ============================================================================

/// Stored progression state for one exercise
///
/// Numeric fields are optional because the store tolerates blank or
/// unparseable cells; the engine decides whether a missing value is fatal
/// for the exercise's progression type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDefinition {
    pub name: String,
    pub workout_group: WorkoutGroup,
    pub progression_type: ProgressionType,
    pub current_cycle_step: Option<u32>,
    pub cycle_base_weight: Option<f64>,
    /// Weight prescribed for the *next* occurrence, never a historical value
    pub current_weight: Option<f64>,
    pub target_reps_min: Option<u32>,
    pub target_sets_min: Option<u32>,
}

impl ExerciseDefinition {
    /// Case-insensitive, whitespace-trimmed name comparison used for lookups
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

/// Key used for exercise lookups and per-exercise locking
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One completed exercise, appended to the log and never mutated
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub workout_group: WorkoutGroup,
    pub exercise_name: String,
    pub sets_performed: u32,
    pub reps_performed: u32,
    pub weight_used: f64,
    pub rpe: f64,
    /// Step that was current before the transition; `None` for non-cycle exercises
    pub cycle_step_at_logging: Option<u32>,
}

/// What the lifter actually did, as seen by the engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Performed {
    pub weight_used: f64,
    pub rpe: f64,
}

// ============================================================================
// Store Writes
// ============================================================================

/// A single-field write against the exercise store
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldUpdate {
    CurrentCycleStep(u32),
    CurrentWeight(f64),
    CycleBaseWeight(f64),
}

impl FieldUpdate {
    /// Column header of the field in the definitions table
    pub fn column(&self) -> &'static str {
        match self {
            FieldUpdate::CurrentCycleStep(_) => crate::csv_store::COL_CYCLE_STEP,
            FieldUpdate::CurrentWeight(_) => crate::csv_store::COL_CURRENT_WEIGHT,
            FieldUpdate::CycleBaseWeight(_) => crate::csv_store::COL_BASE_WEIGHT,
        }
    }

    /// Cell text written to the store
    pub fn value_string(&self) -> String {
        match self {
            FieldUpdate::CurrentCycleStep(step) => step.to_string(),
            FieldUpdate::CurrentWeight(w) | FieldUpdate::CycleBaseWeight(w) => w.to_string(),
        }
    }

    /// Apply the write to an in-memory definition
    pub fn apply(&self, def: &mut ExerciseDefinition) {
        match *self {
            FieldUpdate::CurrentCycleStep(step) => def.current_cycle_step = Some(step),
            FieldUpdate::CurrentWeight(w) => def.current_weight = Some(w),
            FieldUpdate::CycleBaseWeight(w) => def.cycle_base_weight = Some(w),
        }
    }
}

// ============================================================================
// Prescriptions
// ============================================================================

/// Prescribed number of sets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetTarget {
    Count(u32),
    /// Shown as "-"
    Unspecified,
}

/// Prescribed reps per set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepTarget {
    Count(u32),
    /// As many reps as possible (step-8 test set)
    Amrap,
    /// Taken to failure
    Failure,
    /// Shown as "-"
    Unspecified,
}

impl fmt::Display for SetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetTarget::Count(n) => write!(f, "{}", n),
            SetTarget::Unspecified => f.write_str("-"),
        }
    }
}

impl fmt::Display for RepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepTarget::Count(n) => write!(f, "{}", n),
            RepTarget::Amrap => f.write_str("AMRAP"),
            RepTarget::Failure => f.write_str("Failure"),
            RepTarget::Unspecified => f.write_str("-"),
        }
    }
}

// Counts serialize as numbers, labels as strings ("AMRAP", "Failure", "-")
impl Serialize for SetTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SetTarget::Count(n) => serializer.serialize_u32(*n),
            SetTarget::Unspecified => serializer.serialize_str("-"),
        }
    }
}

impl Serialize for RepTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RepTarget::Count(n) => serializer.serialize_u32(*n),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// Sets/reps/weight for the next occurrence of an exercise
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct Prescription {
    pub sets: SetTarget,
    pub reps: RepTarget,
    pub weight: Option<f64>,
}

/// What is currently scheduled for an exercise, as shown before logging
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct CurrentPrescription {
    pub sets: SetTarget,
    pub reps: RepTarget,
    pub weight: Option<f64>,
    pub base_weight: Option<f64>,
}

/// Format an optional weight for display ("-" when absent)
pub fn display_weight(weight: Option<f64>) -> String {
    match weight {
        Some(w) => w.to_string(),
        None => "-".into(),
    }
}
