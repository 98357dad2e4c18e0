//! Plan validation
//!
//! The engine tolerates all of these issues; the validator reports them so a
//! plan builder can show them to the coach.

use crate::types::{PlanEntry, WorkoutStep, MAX_REPS};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Authoring problem found in a plan
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum PlanIssue {
    #[error("Step id {step_id} is used more than once")]
    DuplicateStepId { step_id: String },

    #[error("Group {group_id} has {reps} repetitions, it will be performed once")]
    NonPositiveReps { group_id: String, reps: i64 },

    #[error("Group {group_id} has {reps} repetitions, the limit is {max_reps}")]
    ExcessiveReps {
        group_id: String,
        reps: i64,
        max_reps: i64,
    },

    #[error("Group {group_id} has no members")]
    EmptyGroup { group_id: String },

    #[error("Step {step_id} has no positive duration, it is excluded from totals")]
    MissingDuration { step_id: String },

    #[error("Step {step_id} has a target whose minimum exceeds its maximum")]
    InvertedTarget { step_id: String },

    #[error("Step {step_id} has intensity {intensity}, expected 0-100")]
    IntensityOutOfRange { step_id: String, intensity: f64 },
}

/// Issue together with the plan entry it was found in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Index of the top-level plan entry
    pub entry_index: usize,
    #[serde(flatten)]
    pub issue: PlanIssue,
}

/// Check a plan for authoring problems
pub fn validate_plan(plan: &[PlanEntry]) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for (entry_index, entry) in plan.iter().enumerate() {
        let mut report = |issue: PlanIssue| {
            warn!(entry_index, %issue, "Plan validation issue");
            results.push(ValidationResult { entry_index, issue });
        };

        match entry {
            PlanEntry::Step(step) => {
                check_step(step, &mut seen_ids, &mut report);
            }
            PlanEntry::Group(group) => {
                if group.reps < 1 {
                    report(PlanIssue::NonPositiveReps {
                        group_id: group.group_id.clone(),
                        reps: group.reps,
                    });
                } else if group.reps > MAX_REPS {
                    report(PlanIssue::ExcessiveReps {
                        group_id: group.group_id.clone(),
                        reps: group.reps,
                        max_reps: MAX_REPS,
                    });
                }
                if group.members.is_empty() {
                    report(PlanIssue::EmptyGroup {
                        group_id: group.group_id.clone(),
                    });
                }
                for member in &group.members {
                    check_step(member, &mut seen_ids, &mut report);
                }
            }
        }
    }

    results
}

fn check_step<'a>(
    step: &'a WorkoutStep,
    seen_ids: &mut HashSet<&'a str>,
    report: &mut impl FnMut(PlanIssue),
) {
    if !seen_ids.insert(step.id.as_str()) {
        report(PlanIssue::DuplicateStepId {
            step_id: step.id.clone(),
        });
    }

    if step.duration.and_then(|d| d.usable_value()).is_none() {
        report(PlanIssue::MissingDuration {
            step_id: step.id.clone(),
        });
    }

    if step.target.is_inverted() {
        report(PlanIssue::InvertedTarget {
            step_id: step.id.clone(),
        });
    }

    if let Some(intensity) = step.intensity {
        if !(0.0..=100.0).contains(&intensity) {
            report(PlanIssue::IntensityOutOfRange {
                step_id: step.id.clone(),
                intensity,
            });
        }
    }
}
