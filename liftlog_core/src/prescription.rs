//! Prescription reader: what is scheduled next, without logging anything.
//!
//! Uses the same step table as the cycle engine, evaluated at the stored
//! step (not the step after it).

use crate::cycle::{self, CycleState};
use crate::store::ExerciseStore;
use crate::{
    CurrentPrescription, ExerciseDefinition, ProgressionType, RepTarget, Result, SetTarget,
    WorkoutGroup,
};
use serde::Serialize;

/// Currently scheduled prescription for one exercise
///
/// Sets and reps come from the step table; the weight is the stored
/// forward-looking weight, which is where the engine put the AMRAP load.
pub fn current_prescription(state: &ExerciseDefinition) -> Result<CurrentPrescription> {
    let prescription = match state.progression_type {
        ProgressionType::Cycle => {
            let cycle = CycleState::from_definition(state)?;
            cycle::scheduled_prescription(&cycle, state.current_weight)
        }
        ProgressionType::Failure => cycle::failure_prescription(state),
        ProgressionType::Other(_) => crate::Prescription {
            sets: SetTarget::Unspecified,
            reps: RepTarget::Unspecified,
            weight: state.current_weight,
        },
    };

    Ok(CurrentPrescription {
        sets: prescription.sets,
        reps: prescription.reps,
        weight: prescription.weight,
        base_weight: state.cycle_base_weight,
    })
}

/// One line of a workout listing
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct WorkoutDetail {
    pub name: String,
    #[serde(flatten)]
    pub prescription: CurrentPrescription,
}

/// Today's workout: the scheduled prescription of every exercise in a group
///
/// An exercise with corrupt cycle data is listed with "-" targets and a
/// warning rather than failing the whole listing.
pub fn workout_details<S: ExerciseStore + ?Sized>(
    store: &S,
    group: WorkoutGroup,
) -> Result<Vec<WorkoutDetail>> {
    let exercises = store.list_by_group(group)?;

    let details: Vec<_> = exercises
        .iter()
        .map(|def| {
            let prescription = current_prescription(def).unwrap_or_else(|e| {
                tracing::warn!("Cannot compute prescription for {}: {}", def.name, e);
                CurrentPrescription {
                    sets: SetTarget::Unspecified,
                    reps: RepTarget::Unspecified,
                    weight: def.current_weight,
                    base_weight: def.cycle_base_weight,
                }
            });
            WorkoutDetail {
                name: def.name.clone(),
                prescription,
            }
        })
        .collect();

    tracing::info!("Found {} exercises for workout {}", details.len(), group);
    Ok(details)
}
