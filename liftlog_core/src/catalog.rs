//! Default training program used to seed `workout_definitions.csv`.
//!
//! Three rotating workouts (A, B, C). Main lifts progress on the cycle;
//! bodyweight accessories are trained to failure.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Vec<ExerciseDefinition>> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static [ExerciseDefinition] {
    &DEFAULT_CATALOG
}

fn cycle(group: WorkoutGroup, name: &str, base_weight: f64, min_reps: u32) -> ExerciseDefinition {
    ExerciseDefinition {
        name: name.into(),
        workout_group: group,
        progression_type: ProgressionType::Cycle,
        current_cycle_step: Some(1),
        cycle_base_weight: Some(base_weight),
        current_weight: Some(base_weight),
        target_reps_min: Some(min_reps),
        target_sets_min: None,
    }
}

fn failure(group: WorkoutGroup, name: &str, weight: f64, sets: u32) -> ExerciseDefinition {
    ExerciseDefinition {
        name: name.into(),
        workout_group: group,
        progression_type: ProgressionType::Failure,
        current_cycle_step: None,
        cycle_base_weight: None,
        current_weight: Some(weight),
        target_reps_min: None,
        target_sets_min: Some(sets),
    }
}

/// Builds the default program, every cycle lift starting at step 1
///
/// Prefer `get_default_catalog()` outside of tests.
pub fn build_default_catalog() -> Vec<ExerciseDefinition> {
    use WorkoutGroup::*;

    vec![
        // Workout A
        cycle(A, "Back Squat", 135.0, 5),
        cycle(A, "Bench Press", 115.0, 5),
        cycle(A, "Barbell Row", 95.0, 6),
        failure(A, "Dips", 0.0, 2),
        // Workout B
        cycle(B, "Deadlift", 185.0, 4),
        cycle(B, "Overhead Press", 75.0, 5),
        failure(B, "Pull-up", 0.0, 3),
        // Workout C
        cycle(C, "Front Squat", 95.0, 5),
        cycle(C, "Incline Bench Press", 95.0, 6),
        cycle(C, "Romanian Deadlift", 135.0, 6),
        failure(C, "Chin-up", 0.0, 3),
    ]
}

/// Validate a set of exercise definitions
///
/// Returns every problem found; an empty list means the definitions are
/// usable as a seed.
pub fn validate(exercises: &[ExerciseDefinition]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for def in exercises {
        let key = normalize_name(&def.name);
        if key.is_empty() {
            errors.push(format!(
                "Exercise in workout {} has empty name",
                def.workout_group
            ));
            continue;
        }
        if !seen.insert(key) {
            errors.push(format!("Duplicate exercise name '{}'", def.name));
        }

        for (label, weight) in [
            ("current weight", def.current_weight),
            ("cycle base weight", def.cycle_base_weight),
        ] {
            if let Some(w) = weight {
                if !w.is_finite() || w < 0.0 {
                    errors.push(format!("'{}' has invalid {} {}", def.name, label, w));
                }
            }
        }

        if def.progression_type.is_cycle() {
            match def.current_cycle_step {
                Some(step) if (1..=8).contains(&step) => {}
                Some(step) => errors.push(format!(
                    "'{}' has cycle step {} outside 1-8",
                    def.name, step
                )),
                None => errors.push(format!("'{}' has no cycle step", def.name)),
            }
            if def.cycle_base_weight.is_none() {
                errors.push(format!("'{}' has no cycle base weight", def.name));
            }
            if def.current_weight.is_none() {
                errors.push(format!("'{}' has no current weight", def.name));
            }
            if def.target_reps_min.is_none() {
                errors.push(format!("'{}' has no minimum target reps", def.name));
            }
        }
    }

    errors
}
