//! Cycle progression engine.
//!
//! A pure state machine over the 8-step periodization cycle:
//! - RPE ≤ 8 advances one step, anything harder repeats the step
//! - Each step maps to fixed sets/reps and a weight relative to the cycle base
//! - Step 8 is an AMRAP test set whose load is estimated from the step-7 weight
//! - Progressing out of step 8 completes the cycle: back to step 1 on a heavier base
//!
//! The engine never performs IO. It receives a snapshot of an exercise and
//! returns the next snapshot plus the prescription for the next session.

use crate::{
    Error, ExerciseDefinition, FieldUpdate, Performed, Prescription, ProgressionType, RepTarget,
    Result, SetTarget,
};
use std::fmt;

/// RPE at or below this is a successful session
pub const RPE_PROGRESS_THRESHOLD: f64 = 8.0;

/// Assumed fraction of a one-rep max lifted for the step-7 sets
pub const STEP7_PERCENT_OF_MAX: f64 = 0.82;

/// Fraction of the estimated max prescribed for the AMRAP set
pub const AMRAP_PERCENT_OF_MAX: f64 = 0.90;

/// Weights are rounded to the nearest multiple of this
pub const WEIGHT_ROUNDING: f64 = 2.5;

/// Base weight added when a cycle completes
pub const CYCLE_BASE_INCREMENT: f64 = 15.0;

// ============================================================================
// Cycle Steps
// ============================================================================

/// A position within the cycle, always in 1..=8
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleStep(u32);

impl CycleStep {
    pub const FIRST: CycleStep = CycleStep(1);
    pub const AMRAP: CycleStep = CycleStep(8);

    pub fn new(step: u32) -> Result<Self> {
        if (Self::FIRST.0..=Self::AMRAP.0).contains(&step) {
            Ok(CycleStep(step))
        } else {
            Err(Error::InvalidState(format!(
                "cycle step {} is outside 1..=8",
                step
            )))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The step after this one, or `None` when this step finishes the cycle
    fn successor(self) -> Option<CycleStep> {
        if self == Self::AMRAP {
            None
        } else {
            Some(CycleStep(self.0 + 1))
        }
    }
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Step Table
// ============================================================================

/// How a step's weight is derived
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepLoad {
    /// Cycle base weight plus a fixed offset
    BasePlus(f64),
    /// AMRAP test set; derived from the weight just lifted
    Amrap,
}

/// One row of the step table
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepTargets {
    pub sets: u32,
    pub reps: RepTarget,
    pub load: StepLoad,
}

/// The step → prescription table shared by the engine and the prescription reader
///
/// | step | sets | reps        | weight    |
/// |------|------|-------------|-----------|
/// | 1    | 3    | min         | base      |
/// | 2    | 4    | min         | base      |
/// | 3    | 3    | min         | base + 5  |
/// | 4    | 4    | min         | base + 5  |
/// | 5    | 3    | min + 2     | base + 5  |
/// | 6    | 4    | min + 2     | base + 5  |
/// | 7    | 3    | min + 2     | base + 10 |
/// | 8    | 1    | AMRAP       | see `amrap_weight` |
pub fn step_targets(step: CycleStep, min_reps: u32) -> StepTargets {
    let (sets, reps, load) = match step.get() {
        1 => (3, RepTarget::Count(min_reps), StepLoad::BasePlus(0.0)),
        2 => (4, RepTarget::Count(min_reps), StepLoad::BasePlus(0.0)),
        3 => (3, RepTarget::Count(min_reps), StepLoad::BasePlus(5.0)),
        4 => (4, RepTarget::Count(min_reps), StepLoad::BasePlus(5.0)),
        5 => (3, RepTarget::Count(min_reps + 2), StepLoad::BasePlus(5.0)),
        6 => (4, RepTarget::Count(min_reps + 2), StepLoad::BasePlus(5.0)),
        7 => (3, RepTarget::Count(min_reps + 2), StepLoad::BasePlus(10.0)),
        // CycleStep::new guarantees 8 is the only remaining value
        _ => (1, RepTarget::Amrap, StepLoad::Amrap),
    };
    StepTargets { sets, reps, load }
}

/// AMRAP load from the step-7 working weight: 90% of an estimated max,
/// rounded to the nearest 2.5
pub fn amrap_weight(step7_weight: f64) -> f64 {
    round_to_increment(
        (step7_weight / STEP7_PERCENT_OF_MAX) * AMRAP_PERCENT_OF_MAX,
        WEIGHT_ROUNDING,
    )
}

fn round_to_increment(value: f64, increment: f64) -> f64 {
    (value / increment).round() * increment
}

// ============================================================================
// Cycle State
// ============================================================================

/// The validated cycle fields of a `Cycle` exercise
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleState {
    pub step: CycleStep,
    pub base_weight: f64,
    pub min_reps: u32,
}

impl CycleState {
    /// Extract the cycle fields, failing if any is missing or out of range
    pub fn from_definition(def: &ExerciseDefinition) -> Result<Self> {
        let missing = |field: &str| {
            Error::InvalidState(format!(
                "Invalid number format found for {}: '{}' is missing or not a number",
                def.name, field
            ))
        };

        let raw_step = def
            .current_cycle_step
            .ok_or_else(|| missing("Current Cycle Step"))?;
        let base_weight = def
            .cycle_base_weight
            .filter(|w| w.is_finite())
            .ok_or_else(|| missing("Cycle Base Weight"))?;
        let min_reps = def
            .target_reps_min
            .ok_or_else(|| missing("Target Reps Min"))?;

        let step = CycleStep::new(raw_step).map_err(|_| {
            Error::InvalidState(format!(
                "Invalid cycle step {} found for {}",
                raw_step, def.name
            ))
        })?;

        Ok(CycleState {
            step,
            base_weight,
            min_reps,
        })
    }

    /// Prescription for this state's step; `carried_weight` stands in for the AMRAP load
    fn prescription_at(&self, step: CycleStep, carried_weight: f64) -> Prescription {
        let targets = step_targets(step, self.min_reps);
        let weight = match targets.load {
            StepLoad::BasePlus(offset) => self.base_weight + offset,
            StepLoad::Amrap => carried_weight,
        };
        Prescription {
            sets: SetTarget::Count(targets.sets),
            reps: targets.reps,
            weight: Some(weight),
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Where the cycle goes after a logged session
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    /// Stay in the current cycle at this step (advanced or repeated)
    Continue(CycleStep),
    /// Step 8 was passed: restart at step 1 on a heavier base
    CycleComplete { new_base: f64 },
}

/// Decide the next step from the current one and the session's RPE
pub fn next_step(current: CycleStep, rpe: f64, base_weight: f64) -> StepOutcome {
    if rpe <= RPE_PROGRESS_THRESHOLD {
        match current.successor() {
            Some(step) => StepOutcome::Continue(step),
            None => StepOutcome::CycleComplete {
                new_base: base_weight + CYCLE_BASE_INCREMENT,
            },
        }
    } else {
        StepOutcome::Continue(current)
    }
}

/// Result of running the engine on one logged session
#[derive(Clone, Debug, PartialEq)]
pub struct Advance {
    pub next_state: ExerciseDefinition,
    pub prescription: Prescription,
    /// `None` for exercises the engine passes through untouched
    pub outcome: Option<StepOutcome>,
    pub progressed: bool,
}

impl Advance {
    /// Field writes needed to persist `next_state` over `previous`
    ///
    /// Step and current weight are always written for cycle exercises; the
    /// base weight only when a cycle completed. Pass-through exercises need no writes.
    pub fn changes(&self, previous: &ExerciseDefinition) -> Vec<FieldUpdate> {
        if self.outcome.is_none() {
            return Vec::new();
        }

        let mut updates = Vec::with_capacity(3);
        if let Some(step) = self.next_state.current_cycle_step {
            updates.push(FieldUpdate::CurrentCycleStep(step));
        }
        if let Some(weight) = self.next_state.current_weight {
            updates.push(FieldUpdate::CurrentWeight(weight));
        }
        if let Some(base) = self.next_state.cycle_base_weight {
            if previous.cycle_base_weight != Some(base) {
                updates.push(FieldUpdate::CycleBaseWeight(base));
            }
        }
        updates
    }
}

/// Run the engine for one logged session
///
/// Non-cycle exercises come back unchanged with a type-specific prescription.
/// Cycle exercises with missing or out-of-range cycle data fail with
/// `Error::InvalidState`.
pub fn advance(state: &ExerciseDefinition, performed: Performed) -> Result<Advance> {
    match state.progression_type {
        ProgressionType::Cycle => advance_cycle(state, performed),
        ProgressionType::Failure => {
            tracing::debug!("No progression for {} (Type: Failure)", state.name);
            Ok(Advance {
                next_state: state.clone(),
                prescription: failure_prescription(state),
                outcome: None,
                progressed: false,
            })
        }
        ProgressionType::Other(ref label) => {
            tracing::debug!("No progression for {} (Type: {})", state.name, label);
            Ok(Advance {
                next_state: state.clone(),
                prescription: Prescription {
                    sets: SetTarget::Unspecified,
                    reps: RepTarget::Unspecified,
                    weight: state.current_weight,
                },
                outcome: None,
                progressed: false,
            })
        }
    }
}

fn advance_cycle(state: &ExerciseDefinition, performed: Performed) -> Result<Advance> {
    let cycle = CycleState::from_definition(state)?;
    let completed_weight = performed.weight_used;
    let progressed = performed.rpe <= RPE_PROGRESS_THRESHOLD;

    tracing::debug!(
        "Current state for {}: step={}, base={}, completed={}, min_reps={}",
        state.name,
        cycle.step,
        cycle.base_weight,
        completed_weight,
        cycle.min_reps
    );

    let outcome = next_step(cycle.step, performed.rpe, cycle.base_weight);
    let mut next_state = state.clone();

    let prescription = match outcome {
        StepOutcome::Continue(step) => {
            if progressed {
                tracing::debug!(
                    "RPE {} <= {}: progressing from step {} to {}",
                    performed.rpe,
                    RPE_PROGRESS_THRESHOLD,
                    cycle.step,
                    step
                );
            } else {
                tracing::debug!(
                    "RPE {} > {}: repeating step {}",
                    performed.rpe,
                    RPE_PROGRESS_THRESHOLD,
                    step
                );
            }

            let amrap_load = if step == CycleStep::AMRAP && cycle.step.get() == 7 && progressed {
                let weight = amrap_weight(completed_weight);
                tracing::debug!(
                    "AMRAP weight for step 8: {} (from step-7 weight {})",
                    weight,
                    completed_weight
                );
                weight
            } else {
                completed_weight
            };

            let prescription = cycle.prescription_at(step, amrap_load);
            next_state.current_cycle_step = Some(step.get());
            next_state.current_weight = prescription.weight;
            prescription
        }
        StepOutcome::CycleComplete { new_base } => {
            tracing::debug!(
                "Cycle complete for {}: resetting to step 1 with base {}",
                state.name,
                new_base
            );
            let reset = CycleState {
                step: CycleStep::FIRST,
                base_weight: new_base,
                min_reps: cycle.min_reps,
            };
            let prescription = reset.prescription_at(CycleStep::FIRST, new_base);
            next_state.current_cycle_step = Some(CycleStep::FIRST.get());
            next_state.cycle_base_weight = Some(new_base);
            next_state.current_weight = Some(new_base);
            prescription
        }
    };

    Ok(Advance {
        next_state,
        prescription,
        outcome: Some(outcome),
        progressed,
    })
}

/// Fixed-sets-to-failure prescription; weight never changes
pub(crate) fn failure_prescription(state: &ExerciseDefinition) -> Prescription {
    Prescription {
        sets: state
            .target_sets_min
            .map(SetTarget::Count)
            .unwrap_or(SetTarget::Unspecified),
        reps: RepTarget::Failure,
        weight: state.current_weight,
    }
}

/// Prescription scheduled at a cycle state's own step, without simulating a session
///
/// The AMRAP load is not derivable from the table, so `scheduled_weight`
/// (the stored forward-looking weight) is used for every step.
pub(crate) fn scheduled_prescription(
    cycle: &CycleState,
    scheduled_weight: Option<f64>,
) -> Prescription {
    let targets = step_targets(cycle.step, cycle.min_reps);
    Prescription {
        sets: SetTarget::Count(targets.sets),
        reps: targets.reps,
        weight: scheduled_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkoutGroup;

    fn cycle_exercise(step: u32, base: f64) -> ExerciseDefinition {
        ExerciseDefinition {
            name: "Back Squat".into(),
            workout_group: WorkoutGroup::A,
            progression_type: ProgressionType::Cycle,
            current_cycle_step: Some(step),
            cycle_base_weight: Some(base),
            current_weight: Some(base),
            target_reps_min: Some(5),
            target_sets_min: None,
        }
    }

    fn performed(weight_used: f64, rpe: f64) -> Performed {
        Performed { weight_used, rpe }
    }

    #[test]
    fn test_progresses_one_step_at_or_below_rpe_8() {
        let expected_weights = [100.0, 105.0, 105.0, 105.0, 105.0, 110.0];
        for (step, expected) in (1..=6).zip(expected_weights) {
            let adv = advance(&cycle_exercise(step, 100.0), performed(100.0, 8.0)).unwrap();
            assert_eq!(adv.next_state.current_cycle_step, Some(step + 1));
            assert_eq!(adv.next_state.current_weight, Some(expected), "step {}", step);
            assert_eq!(adv.next_state.cycle_base_weight, Some(100.0));
            assert!(adv.progressed);
        }
    }

    #[test]
    fn test_step_one_to_two_keeps_base_weight() {
        let adv = advance(&cycle_exercise(1, 100.0), performed(100.0, 7.0)).unwrap();
        assert_eq!(adv.next_state.current_cycle_step, Some(2));
        assert_eq!(
            adv.prescription,
            Prescription {
                sets: SetTarget::Count(4),
                reps: RepTarget::Count(5),
                weight: Some(100.0),
            }
        );
    }

    #[test]
    fn test_step_two_to_three_adds_five() {
        let adv = advance(&cycle_exercise(2, 100.0), performed(100.0, 6.0)).unwrap();
        assert_eq!(adv.next_state.current_cycle_step, Some(3));
        assert_eq!(adv.prescription.weight, Some(105.0));
        assert_eq!(adv.prescription.sets, SetTarget::Count(3));
    }

    #[test]
    fn test_steps_five_through_seven_add_two_reps() {
        let adv = advance(&cycle_exercise(4, 100.0), performed(105.0, 7.0)).unwrap();
        assert_eq!(adv.prescription.reps, RepTarget::Count(7));

        let adv = advance(&cycle_exercise(6, 100.0), performed(105.0, 7.0)).unwrap();
        assert_eq!(adv.prescription.reps, RepTarget::Count(7));
        assert_eq!(adv.prescription.weight, Some(110.0));
    }

    #[test]
    fn test_rpe_above_8_repeats_step() {
        let adv = advance(&cycle_exercise(3, 100.0), performed(105.0, 9.0)).unwrap();
        assert_eq!(adv.next_state.current_cycle_step, Some(3));
        assert_eq!(adv.next_state.current_weight, Some(105.0));
        assert!(!adv.progressed);
        assert_eq!(adv.outcome, Some(StepOutcome::Continue(CycleStep::new(3).unwrap())));
    }

    #[test]
    fn test_rpe_boundary_8_progresses_9_repeats() {
        let at_8 = advance(&cycle_exercise(2, 100.0), performed(100.0, 8.0)).unwrap();
        assert_eq!(at_8.next_state.current_cycle_step, Some(3));

        let at_9 = advance(&cycle_exercise(2, 100.0), performed(100.0, 9.0)).unwrap();
        assert_eq!(at_9.next_state.current_cycle_step, Some(2));

        let at_8_5 = advance(&cycle_exercise(2, 100.0), performed(100.0, 8.5)).unwrap();
        assert_eq!(at_8_5.next_state.current_cycle_step, Some(2));
    }

    #[test]
    fn test_step_seven_to_eight_estimates_amrap_weight() {
        let mut state = cycle_exercise(7, 195.0);
        state.current_weight = Some(205.0);
        let adv = advance(&state, performed(205.0, 8.0)).unwrap();

        assert_eq!(adv.next_state.current_cycle_step, Some(8));
        assert_eq!(adv.next_state.current_weight, Some(225.0));
        assert_eq!(adv.prescription.sets, SetTarget::Count(1));
        assert_eq!(adv.prescription.reps, RepTarget::Amrap);
    }

    #[test]
    fn test_amrap_weight_rounds_to_nearest_increment() {
        assert_eq!(amrap_weight(205.0), 225.0);
        // 110 / 0.82 * 0.9 = 120.73 -> 120
        assert_eq!(amrap_weight(110.0), 120.0);
        // 112 / 0.82 * 0.9 = 122.93 -> 122.5
        assert_eq!(amrap_weight(112.0), 122.5);
    }

    #[test]
    fn test_repeating_step_eight_carries_weight_forward() {
        let mut state = cycle_exercise(8, 195.0);
        state.current_weight = Some(225.0);
        let adv = advance(&state, performed(225.0, 10.0)).unwrap();

        assert_eq!(adv.next_state.current_cycle_step, Some(8));
        assert_eq!(adv.next_state.current_weight, Some(225.0));
        assert_eq!(adv.prescription.reps, RepTarget::Amrap);
    }

    #[test]
    fn test_repeating_step_seven_uses_table_weight() {
        let adv = advance(&cycle_exercise(7, 100.0), performed(110.0, 9.5)).unwrap();
        assert_eq!(adv.next_state.current_cycle_step, Some(7));
        assert_eq!(adv.next_state.current_weight, Some(110.0));
    }

    #[test]
    fn test_step_eight_completion_resets_cycle() {
        let adv = advance(&cycle_exercise(8, 100.0), performed(120.0, 7.0)).unwrap();

        assert_eq!(adv.next_state.current_cycle_step, Some(1));
        assert_eq!(adv.next_state.cycle_base_weight, Some(115.0));
        assert_eq!(adv.next_state.current_weight, Some(115.0));
        assert_eq!(adv.outcome, Some(StepOutcome::CycleComplete { new_base: 115.0 }));
        assert_eq!(
            adv.prescription,
            Prescription {
                sets: SetTarget::Count(3),
                reps: RepTarget::Count(5),
                weight: Some(115.0),
            }
        );
    }

    #[test]
    fn test_changes_write_base_only_on_cycle_completion() {
        let before = cycle_exercise(3, 100.0);
        let adv = advance(&before, performed(105.0, 6.0)).unwrap();
        assert_eq!(
            adv.changes(&before),
            vec![
                FieldUpdate::CurrentCycleStep(4),
                FieldUpdate::CurrentWeight(105.0),
            ]
        );

        let before = cycle_exercise(8, 100.0);
        let adv = advance(&before, performed(120.0, 6.0)).unwrap();
        assert_eq!(
            adv.changes(&before),
            vec![
                FieldUpdate::CurrentCycleStep(1),
                FieldUpdate::CurrentWeight(115.0),
                FieldUpdate::CycleBaseWeight(115.0),
            ]
        );
    }

    #[test]
    fn test_failure_type_passes_through() {
        let state = ExerciseDefinition {
            name: "Pull-up".into(),
            workout_group: WorkoutGroup::B,
            progression_type: ProgressionType::Failure,
            current_cycle_step: None,
            cycle_base_weight: None,
            current_weight: Some(0.0),
            target_reps_min: None,
            target_sets_min: Some(3),
        };
        let adv = advance(&state, performed(0.0, 10.0)).unwrap();

        assert_eq!(adv.next_state, state);
        assert!(adv.outcome.is_none());
        assert!(adv.changes(&state).is_empty());
        assert_eq!(adv.prescription.sets, SetTarget::Count(3));
        assert_eq!(adv.prescription.reps, RepTarget::Failure);
        assert_eq!(adv.prescription.weight, Some(0.0));
    }

    #[test]
    fn test_unknown_type_passes_through_with_dashes() {
        let mut state = cycle_exercise(2, 100.0);
        state.progression_type = ProgressionType::Other("Standard".into());
        state.current_cycle_step = None;
        let adv = advance(&state, performed(100.0, 5.0)).unwrap();

        assert_eq!(adv.next_state, state);
        assert_eq!(adv.prescription.sets, SetTarget::Unspecified);
        assert_eq!(adv.prescription.reps, RepTarget::Unspecified);
        assert_eq!(adv.prescription.weight, Some(100.0));
    }

    #[test]
    fn test_missing_cycle_fields_are_invalid_state() {
        let mut state = cycle_exercise(2, 100.0);
        state.target_reps_min = None;
        assert!(matches!(
            advance(&state, performed(100.0, 7.0)),
            Err(Error::InvalidState(_))
        ));

        let mut state = cycle_exercise(2, 100.0);
        state.cycle_base_weight = None;
        assert!(matches!(
            advance(&state, performed(100.0, 7.0)),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_out_of_range_step_is_invalid_state() {
        for step in [0, 9, 42] {
            let result = advance(&cycle_exercise(step, 100.0), performed(100.0, 7.0));
            assert!(matches!(result, Err(Error::InvalidState(_))), "step {}", step);
        }
    }

    #[test]
    fn test_engine_does_not_mutate_input() {
        let state = cycle_exercise(5, 100.0);
        let snapshot = state.clone();
        let _ = advance(&state, performed(105.0, 6.0)).unwrap();
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_full_cycle_of_successes_returns_to_step_one() {
        let mut state = cycle_exercise(1, 100.0);
        for _ in 0..8 {
            let lifted = state.current_weight.unwrap();
            state = advance(&state, performed(lifted, 7.0)).unwrap().next_state;
        }
        assert_eq!(state.current_cycle_step, Some(1));
        assert_eq!(state.cycle_base_weight, Some(115.0));
        assert_eq!(state.current_weight, Some(115.0));
    }
}
