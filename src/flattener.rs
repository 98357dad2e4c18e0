//! Plan flattening
//!
//! This module expands a hierarchical workout plan into a linear sequence of
//! flat steps:
//! - Standalone steps map one-to-one
//! - Repeat groups are fully unrolled, repetition by repetition
//! - Every flat step keeps a back-reference to its originating step and group

use crate::types::{DurationKind, FlatStep, PlanEntry, WorkoutStep, MAX_REPS};
use tracing::debug;

/// Flattener for converting plan entries into flat steps
pub struct Flattener;

impl Flattener {
    /// Flatten a plan into its execution sequence.
    ///
    /// Pure and deterministic: identical input always yields identical output.
    pub fn flatten(plan: &[PlanEntry]) -> Vec<FlatStep> {
        let mut flat_steps = Vec::new();

        for entry in plan {
            match entry {
                PlanEntry::Step(step) => {
                    let sequence_index = flat_steps.len();
                    flat_steps.push(to_flat_step(step, sequence_index, None, 0));
                }
                PlanEntry::Group(group) => {
                    let reps = group.effective_reps();
                    if group.reps < 1 {
                        debug!(
                            group_id = %group.group_id,
                            reps = group.reps,
                            effective_reps = reps,
                            "Non-positive repetition count, unrolling group once"
                        );
                    } else if group.reps > MAX_REPS {
                        debug!(
                            group_id = %group.group_id,
                            reps = group.reps,
                            effective_reps = reps,
                            "Repetition count above limit, capping"
                        );
                    }

                    for repetition in 0..reps {
                        for member in &group.members {
                            let sequence_index = flat_steps.len();
                            flat_steps.push(to_flat_step(
                                member,
                                sequence_index,
                                Some(&group.group_id),
                                repetition,
                            ));
                        }
                    }
                }
            }
        }

        flat_steps
    }
}

/// Number of flat steps a plan expands to
pub fn flattened_len(plan: &[PlanEntry]) -> usize {
    plan.iter()
        .map(|entry| match entry {
            PlanEntry::Step(_) => 1,
            PlanEntry::Group(group) => group.members.len().saturating_mul(group.effective_reps()),
        })
        .fold(0, usize::saturating_add)
}

fn to_flat_step(
    step: &WorkoutStep,
    sequence_index: usize,
    group_id: Option<&str>,
    repetition_index: usize,
) -> FlatStep {
    let duration_kind = step.duration.map(|d| d.kind());
    let usable = step.duration.and_then(|d| d.usable_value());

    if usable.is_none() {
        debug!(
            step_id = %step.id,
            sequence_index,
            "Step has no usable duration, excluded from aggregation"
        );
    }

    let (planned_distance_meters, planned_duration_seconds) = match duration_kind {
        Some(DurationKind::Distance) => (usable, None),
        Some(DurationKind::Time) => (None, usable),
        None => (None, None),
    };

    FlatStep {
        sequence_index,
        source_step_id: step.id.clone(),
        source_group_id: group_id.map(str::to_string),
        repetition_index,
        step_type: step.step_type,
        label: step.label.clone(),
        duration_kind,
        planned_distance_meters,
        planned_duration_seconds,
        target: step.target,
        intensity: step.intensity,
    }
}
