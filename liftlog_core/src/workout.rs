//! Workout orchestrator.
//!
//! Validates requests, loads exercise state from the store, runs the cycle
//! engine and persists the result together with a log entry. Read-modify-write
//! on an exercise is serialized per exercise name.

use crate::cycle::{self, Advance};
use crate::prescription::{self, WorkoutDetail};
use crate::store::{ExerciseStore, LogSink};
use crate::validation::{self, LogForm, LogRequest};
use crate::{
    normalize_name, CurrentPrescription, Error, ExerciseDefinition, FieldUpdate, LogEntry,
    Performed, Prescription, Result, WorkoutGroup,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// What was logged, echoed back to the caller
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LoggedData {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub rpe: f64,
}

/// Response to a successful log-performance request
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogOutcome {
    pub message: String,
    pub logged_data: LoggedData,
    /// Prescription for the exercise's next occurrence
    pub next: Prescription,
    #[serde(skip)]
    pub entry: LogEntry,
}

/// One mutex per existing exercise, created on first use
#[derive(Default)]
struct ExerciseLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExerciseLocks {
    fn for_exercise(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| Error::Store("exercise lock table poisoned".into()))?;
        Ok(locks.entry(normalize_name(name)).or_default().clone())
    }
}

/// Orchestrates logging and manual overrides against injected stores
pub struct Workout<S, L> {
    store: S,
    log: L,
    locks: ExerciseLocks,
}

impl<S: ExerciseStore, L: LogSink> Workout<S, L> {
    pub fn new(store: S, log: L) -> Self {
        Self {
            store,
            log,
            locks: ExerciseLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and log a completed exercise, then advance its progression
    pub fn log_performance(&self, form: &LogForm) -> Result<LogOutcome> {
        let request = validation::validate_log_form(form).map_err(|e| {
            tracing::warn!("Rejected log request: {}", e);
            e
        })?;
        self.log_request_at(&request, Utc::now())
    }

    /// Log an already-validated request with an explicit timestamp
    pub fn log_request_at(&self, request: &LogRequest, now: DateTime<Utc>) -> Result<LogOutcome> {
        let name = &request.exercise_name;
        tracing::info!(
            "Logging {} (workout {}): sets={}, reps={}, weight={}, rpe={}",
            name,
            request.workout_group,
            request.sets_performed,
            request.reps_performed,
            request.weight_used,
            request.rpe
        );

        let lock = self.lock_for(name)?;
        let _held = lock
            .lock()
            .map_err(|_| Error::Store(format!("lock for {} poisoned", name)))?;

        let state = self.load(name)?;
        let step_before = if state.progression_type.is_cycle() {
            state.current_cycle_step
        } else {
            None
        };

        let advance = cycle::advance(
            &state,
            Performed {
                weight_used: request.weight_used,
                rpe: request.rpe,
            },
        )
        .map_err(|e| {
            tracing::error!("Cycle progression failed for {}: {}", state.name, e);
            e
        })?;

        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: now,
            workout_group: request.workout_group,
            exercise_name: state.name.clone(),
            sets_performed: request.sets_performed,
            reps_performed: request.reps_performed,
            weight_used: request.weight_used,
            rpe: request.rpe,
            cycle_step_at_logging: step_before,
        };

        self.commit(&state, &advance, &entry)?;

        tracing::info!(
            "Logged {}: next step {:?}, next weight {:?}, progressed={}",
            state.name,
            advance.next_state.current_cycle_step,
            advance.next_state.current_weight,
            advance.progressed
        );

        Ok(LogOutcome {
            message: format!(
                "{} logged successfully for Workout {}!",
                request.exercise_name, request.workout_group
            ),
            logged_data: LoggedData {
                name: request.exercise_name.clone(),
                sets: request.sets_performed,
                reps: request.reps_performed,
                weight: request.weight_used,
                rpe: request.rpe,
            },
            next: advance.prescription,
            entry,
        })
    }

    /// Manually override an exercise's cycle base weight
    ///
    /// At step 1 the current weight follows the base, since step 1 is
    /// prescribed at exactly the base weight.
    pub fn set_cycle_base_weight(&self, exercise_name: &str, raw_weight: &str) -> Result<String> {
        let (name, new_base) = validation::validate_base_weight(exercise_name, raw_weight)?;
        tracing::info!("Updating base weight for {} to {}", name, new_base);

        let lock = self.lock_for(&name)?;
        let _held = lock
            .lock()
            .map_err(|_| Error::Store(format!("lock for {} poisoned", name)))?;

        let state = self.load(&name)?;
        let step = state.current_cycle_step.ok_or_else(|| {
            Error::InvalidState(format!("Could not read current cycle step for {}.", name))
        })?;

        let mut updates = vec![FieldUpdate::CycleBaseWeight(new_base)];
        if step == 1 {
            updates.push(FieldUpdate::CurrentWeight(new_base));
        }
        self.write_fields(&state, &updates)?;

        if step == 1 {
            tracing::info!(
                "Next workout is step 1; current weight for {} set to {}",
                name,
                new_base
            );
        } else {
            tracing::debug!(
                "Next workout is step {}; current weight for {} unchanged",
                step,
                name
            );
        }

        Ok(format!(
            "Base weight for {} updated to {} lbs.",
            state.name, new_base
        ))
    }

    /// Scheduled prescription for one exercise
    pub fn current_prescription(&self, exercise_name: &str) -> Result<CurrentPrescription> {
        let state = self.load(exercise_name.trim())?;
        prescription::current_prescription(&state)
    }

    /// Scheduled prescriptions for every exercise in a workout group
    pub fn workout_details(&self, group: WorkoutGroup) -> Result<Vec<WorkoutDetail>> {
        prescription::workout_details(&self.store, group)
    }

    /// Lock for an exercise that exists in the store, keyed by its stored name
    fn lock_for(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let state = self.load(name)?;
        self.locks.for_exercise(&state.name)
    }

    fn load(&self, name: &str) -> Result<ExerciseDefinition> {
        self.store.find_exercise(name)?.ok_or_else(|| {
            tracing::warn!("Exercise {} not found", name);
            Error::NotFound(format!("Exercise {} not found.", name))
        })
    }

    /// Persist state, then the log entry; undo the state writes if either fails
    fn commit(
        &self,
        before: &ExerciseDefinition,
        advance: &Advance,
        entry: &LogEntry,
    ) -> Result<()> {
        let written = self.write_fields(before, &advance.changes(before))?;

        if let Err(e) = self.log.append(entry) {
            tracing::error!("Failed to append log entry for {}: {}", before.name, e);
            return Err(self.restore(before, &written, e));
        }

        Ok(())
    }

    /// Write every update in order; on the first failure undo the ones already written
    fn write_fields(
        &self,
        before: &ExerciseDefinition,
        updates: &[FieldUpdate],
    ) -> Result<Vec<FieldUpdate>> {
        let mut written = Vec::with_capacity(updates.len());

        for update in updates {
            if let Err(e) = self.store.write_field(&before.name, *update) {
                tracing::error!(
                    "Failed to write '{}' for {}: {}",
                    update.column(),
                    before.name,
                    e
                );
                return Err(self.restore(before, &written, e));
            }
            tracing::debug!(
                "Wrote '{}' = {} for {}",
                update.column(),
                update.value_string(),
                before.name
            );
            written.push(*update);
        }

        Ok(written)
    }

    /// Write back the pre-transition values of `written`, returning the error to surface
    fn restore(
        &self,
        before: &ExerciseDefinition,
        written: &[FieldUpdate],
        cause: Error,
    ) -> Error {
        let mut failures = Vec::new();
        for update in written.iter().rev() {
            let original = match update {
                FieldUpdate::CurrentCycleStep(_) => {
                    before.current_cycle_step.map(FieldUpdate::CurrentCycleStep)
                }
                FieldUpdate::CurrentWeight(_) => before.current_weight.map(FieldUpdate::CurrentWeight),
                FieldUpdate::CycleBaseWeight(_) => {
                    before.cycle_base_weight.map(FieldUpdate::CycleBaseWeight)
                }
            };
            if let Some(original) = original {
                if let Err(e) = self.store.write_field(&before.name, original) {
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            if !written.is_empty() {
                tracing::warn!("Restored progression state for {}", before.name);
            }
            cause
        } else {
            tracing::error!(
                "Progression state for {} may be inconsistent: {}",
                before.name,
                failures.join("; ")
            );
            Error::Store(format!(
                "{}; restoring previous state of {} also failed: {}",
                cause,
                before.name,
                failures.join("; ")
            ))
        }
    }
}
