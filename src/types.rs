//! Core types for the Workout Match engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: plan entries as authored by a coach, flat steps produced by the
//! flattener, recorded laps supplied by an activity source, the lap → step
//! correspondence and the final match quality.
//!
//! All JSON field names are camelCase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a step within a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Warmup,
    #[serde(alias = "interval", alias = "work")]
    Active,
    #[serde(alias = "rest")]
    Recovery,
    Cooldown,
    #[default]
    Other,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Warmup => "warmup",
            StepType::Active => "active",
            StepType::Recovery => "recovery",
            StepType::Cooldown => "cooldown",
            StepType::Other => "other",
        }
    }

    /// Human-readable name used when a step carries no label
    pub fn display_name(&self) -> &'static str {
        match self {
            StepType::Warmup => "Warm-up",
            StepType::Active => "Active",
            StepType::Recovery => "Recovery",
            StepType::Cooldown => "Cool-down",
            StepType::Other => "Other",
        }
    }
}

/// Quantity a step is authored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationKind {
    Distance,
    Time,
}

/// Planned step length, tagged by `kind`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepDuration {
    /// Distance in meters
    Distance {
        #[serde(default)]
        value: Option<f64>,
    },
    /// Time in seconds
    Time {
        #[serde(default)]
        value: Option<f64>,
    },
}

impl StepDuration {
    pub fn kind(&self) -> DurationKind {
        match self {
            StepDuration::Distance { .. } => DurationKind::Distance,
            StepDuration::Time { .. } => DurationKind::Time,
        }
    }

    /// Raw authored value, if any
    pub fn value(&self) -> Option<f64> {
        match self {
            StepDuration::Distance { value } | StepDuration::Time { value } => *value,
        }
    }

    /// Authored value when it is usable for aggregation (finite and positive)
    pub fn usable_value(&self) -> Option<f64> {
        self.value().filter(|v| v.is_finite() && *v > 0.0)
    }
}

/// Intensity target for a step, tagged by `type`
///
/// Pace bounds are seconds per kilometre, heart rate bounds are bpm, power
/// bounds are watts and zone bounds are zone indices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepTarget {
    Pace { min: f64, max: f64 },
    HeartRate { min: f64, max: f64 },
    HrZone { min: u8, max: u8 },
    VamZone { min: u8, max: u8 },
    Power { min: f64, max: f64 },
    #[default]
    None,
}

impl StepTarget {
    /// Pace bounds as a range, for pace targets only
    pub fn pace_range(&self) -> Option<PaceRange> {
        match *self {
            StepTarget::Pace { min, max } => Some(PaceRange {
                min_seconds_per_km: min,
                max_seconds_per_km: max,
            }),
            _ => None,
        }
    }

    /// Midpoint of a pace target in seconds per meter
    pub fn pace_midpoint_seconds_per_meter(&self) -> Option<f64> {
        let range = self.pace_range()?;
        let midpoint = (range.min_seconds_per_km + range.max_seconds_per_km) / 2.0 / 1000.0;
        (midpoint.is_finite() && midpoint > 0.0).then_some(midpoint)
    }

    /// Whether the target's lower bound exceeds its upper bound
    pub fn is_inverted(&self) -> bool {
        match *self {
            StepTarget::Pace { min, max }
            | StepTarget::HeartRate { min, max }
            | StepTarget::Power { min, max } => min > max,
            StepTarget::HrZone { min, max } | StepTarget::VamZone { min, max } => min > max,
            StepTarget::None => false,
        }
    }
}

/// Pace window of a step in seconds per kilometre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceRange {
    pub min_seconds_per_km: f64,
    pub max_seconds_per_km: f64,
}

impl fmt::Display for PaceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}–{} /km",
            format_pace(self.min_seconds_per_km),
            format_pace(self.max_seconds_per_km)
        )
    }
}

/// Format seconds-per-kilometre as `m:ss`
pub fn format_pace(seconds_per_km: f64) -> String {
    let total = seconds_per_km.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Atomic plan node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub duration: Option<StepDuration>,
    #[serde(default)]
    pub target: StepTarget,
    /// Perceived intensity (0-100)
    #[serde(default)]
    pub intensity: Option<f64>,
}

/// Largest repetition count a repeat group may carry
pub const MAX_REPS: i64 = 1000;

/// Steps performed `reps` times back to back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatGroup {
    pub group_id: String,
    /// Signed so that zero and negative counts reach the coercion rule
    pub reps: i64,
    pub members: Vec<WorkoutStep>,
}

impl RepeatGroup {
    /// Repetition count used for unrolling, within `1..=MAX_REPS`
    pub fn effective_reps(&self) -> usize {
        self.reps.clamp(1, MAX_REPS) as usize
    }
}

/// One entry of a workout plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanEntry {
    Group(RepeatGroup),
    Step(WorkoutStep),
}

/// Fully unrolled execution unit derived from a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatStep {
    /// Position in the flattened sequence (0-based)
    pub sequence_index: usize,
    pub source_step_id: String,
    pub source_group_id: Option<String>,
    /// 0 for standalone steps, 0..reps-1 inside a group
    pub repetition_index: usize,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub label: Option<String>,
    /// Authored kind, kept even when the value was unusable
    pub duration_kind: Option<DurationKind>,
    pub planned_distance_meters: Option<f64>,
    pub planned_duration_seconds: Option<f64>,
    pub target: StepTarget,
    pub intensity: Option<f64>,
}

impl FlatStep {
    /// Label, falling back to the step type's display name
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.step_type.display_name().to_string())
    }

    /// Whether the step contributes a planned quantity
    pub fn has_planned_quantity(&self) -> bool {
        self.planned_distance_meters.is_some() || self.planned_duration_seconds.is_some()
    }
}

/// Externally recorded lap of a completed activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedLap {
    /// 1-based, as recorded
    pub lap_index: u32,
    pub distance_meters: f64,
    pub moving_time_seconds: f64,
    #[serde(default)]
    pub elapsed_time_seconds: f64,
    #[serde(default)]
    pub average_speed_mps: f64,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
}

/// Lap annotated with the flat step it corresponds to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedLap {
    pub lap_index: u32,
    /// `None` only when the plan has no flat steps
    pub flat_step_index: Option<usize>,
    pub step_type: StepType,
    pub step_label: Option<String>,
}

/// Whole-activity totals reported by the activity source
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTotals {
    pub distance_meters: f64,
    pub moving_time_seconds: f64,
}

/// Recorded activity already linked to a plan by the caller
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    pub laps: Vec<RecordedLap>,
    #[serde(default)]
    pub totals: Option<ActivityTotals>,
}

/// Dominant planned quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveType {
    Distance,
    Time,
}

/// Category label for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityCategory {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCategory::Excellent => "Excellent",
            QualityCategory::Good => "Good",
            QualityCategory::Fair => "Fair",
            QualityCategory::Poor => "Poor",
        }
    }
}

/// Flag describing how a match quality was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    EstimatedDistance,
    EstimatedDuration,
    MissingStepDuration,
    NoLaps,
    LapCountMismatch,
    TotalsFromActivity,
}

/// Planned vs. actual for one originating plan node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockComparison {
    pub source_step_id: String,
    pub source_group_id: Option<String>,
    pub label: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Number of flat steps collapsed into this entry
    pub repetitions: usize,
    pub planned_distance_meters: Option<f64>,
    pub planned_duration_seconds: Option<f64>,
    pub target_pace_range: Option<PaceRange>,
    pub actual_distance_meters: f64,
    pub actual_duration_seconds: f64,
}

/// How well an activity executed a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuality {
    /// 0-100
    pub overall_score: u8,
    pub category: QualityCategory,
    pub objective_type: ObjectiveType,
    pub planned_distance_meters: Option<f64>,
    pub actual_distance_meters: f64,
    pub distance_percent_diff: Option<f64>,
    pub distance_score: Option<f64>,
    pub planned_duration_seconds: Option<f64>,
    pub actual_duration_seconds: f64,
    pub duration_percent_diff: Option<f64>,
    pub duration_score: Option<f64>,
    pub block_comparison: Vec<BlockComparison>,
    pub flags: Vec<QualityFlag>,
}

/// Plan totals for builders and report headers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub step_count: usize,
    /// Sum of distance-authored steps
    pub authored_distance_meters: f64,
    /// Sum of time-authored steps
    pub authored_duration_seconds: f64,
    /// Distance including pace-based estimates for time-authored steps
    pub estimated_distance_meters: Option<f64>,
    /// Duration including pace-based estimates for distance-authored steps
    pub estimated_duration_seconds: Option<f64>,
}
