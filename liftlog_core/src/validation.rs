//! Request boundary validation.
//!
//! Every entry point (CLI, JSON requests, tests) funnels raw input through
//! these functions, so the rules live in exactly one place.

use crate::{Error, Result, WorkoutGroup};
use serde::Deserialize;

/// Lowest accepted RPE
pub const RPE_MIN: f64 = 1.0;
/// Highest accepted RPE
pub const RPE_MAX: f64 = 10.0;

/// Raw log-performance request as submitted (every field still text)
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogForm {
    pub workout_group: String,
    pub exercise_name: String,
    pub sets_performed: String,
    pub reps_performed: String,
    pub weight_used: String,
    pub rpe: String,
}

/// A log-performance request that passed validation
#[derive(Clone, Debug, PartialEq)]
pub struct LogRequest {
    pub workout_group: WorkoutGroup,
    pub exercise_name: String,
    pub sets_performed: u32,
    pub reps_performed: u32,
    pub weight_used: f64,
    pub rpe: f64,
}

/// Validate every field of a log-performance request
pub fn validate_log_form(form: &LogForm) -> Result<LogRequest> {
    let workout_group = form.workout_group.parse::<WorkoutGroup>()?;

    let exercise_name = form.exercise_name.trim();
    if exercise_name.is_empty() {
        return Err(Error::Validation("Exercise name is missing.".into()));
    }

    let sets_performed = parse_count(&form.sets_performed)
        .filter(|sets| *sets > 0)
        .ok_or_else(|| {
            Error::Validation("Invalid 'Sets Performed'. Must be a positive whole number.".into())
        })?;

    let reps_performed = parse_count(&form.reps_performed).ok_or_else(|| {
        Error::Validation("Invalid 'Reps Performed'. Must be a non-negative whole number.".into())
    })?;

    let weight_used = parse_weight(&form.weight_used).ok_or_else(|| {
        Error::Validation("Invalid 'Weight Used'. Must be a non-negative number.".into())
    })?;

    let rpe = parse_number(&form.rpe)
        .filter(|rpe| (RPE_MIN..=RPE_MAX).contains(rpe))
        .ok_or_else(|| {
            Error::Validation("Invalid 'RPE'. Must be a number between 1 and 10.".into())
        })?;

    Ok(LogRequest {
        workout_group,
        exercise_name: exercise_name.to_string(),
        sets_performed,
        reps_performed,
        weight_used,
        rpe,
    })
}

/// Validate a manual base-weight override
pub fn validate_base_weight(exercise_name: &str, raw_weight: &str) -> Result<(String, f64)> {
    let name = exercise_name.trim();
    let weight = parse_weight(raw_weight);
    match (name.is_empty(), weight) {
        (false, Some(weight)) => Ok((name.to_string(), weight)),
        _ => Err(Error::Validation(
            "Invalid exercise name or new base weight provided.".into(),
        )),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_weight(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|w| *w >= 0.0)
}

fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}
