//! Match scoring
//!
//! This module compares what was planned with what was recorded:
//! - Planned totals, with pace-based estimates across distance/time authoring
//! - Actual totals from laps (or activity totals when supplied)
//! - Percent differences, component scores and a weighted overall score
//! - A per-block breakdown with repetitions collapsed

use crate::error::MatchError;
use crate::types::{
    ActivityTotals, BlockComparison, DurationKind, FlatStep, MatchQuality, MatchedLap,
    ObjectiveType, PlanSummary, QualityCategory, QualityFlag, RecordedLap,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Points lost per percent of deviation
pub const DEFAULT_SENSITIVITY: f64 = 2.0;

/// Weight of the objective metric in the overall score
pub const DEFAULT_OBJECTIVE_WEIGHT: f64 = 0.7;

/// Lower bounds (inclusive) of each score category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub excellent: u8,
    pub good: u8,
    pub fair: u8,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            excellent: 85,
            good: 70,
            fair: 50,
        }
    }
}

impl CategoryThresholds {
    pub fn categorize(&self, score: u8) -> QualityCategory {
        if score >= self.excellent {
            QualityCategory::Excellent
        } else if score >= self.good {
            QualityCategory::Good
        } else if score >= self.fair {
            QualityCategory::Fair
        } else {
            QualityCategory::Poor
        }
    }
}

/// Tunable scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    pub sensitivity: f64,
    pub objective_weight: f64,
    pub thresholds: CategoryThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            objective_weight: DEFAULT_OBJECTIVE_WEIGHT,
            thresholds: CategoryThresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Check that the constants describe a usable scoring curve
    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(MatchError::InvalidConfig(format!(
                "sensitivity must be a non-negative number, got {}",
                self.sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.objective_weight) {
            return Err(MatchError::InvalidConfig(format!(
                "objectiveWeight must be within [0, 1], got {}",
                self.objective_weight
            )));
        }
        let t = &self.thresholds;
        if !(t.excellent >= t.good && t.good >= t.fair && t.excellent <= 100) {
            return Err(MatchError::InvalidConfig(format!(
                "thresholds must satisfy 100 >= excellent >= good >= fair, got {}/{}/{}",
                t.excellent, t.good, t.fair
            )));
        }
        Ok(())
    }

    /// Score for one metric: 100 minus `sensitivity` points per percent of deviation
    pub fn component_score(&self, percent_diff: f64) -> f64 {
        (100.0 - self.sensitivity * percent_diff.abs()).max(0.0)
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, MatchError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Relative difference of `actual` against `planned`, in percent.
///
/// `None` when nothing was planned.
pub fn percent_diff(actual: f64, planned: f64) -> Option<f64> {
    (planned > 0.0).then(|| (actual - planned) / planned * 100.0)
}

/// Planned quantities aggregated over a flat-step sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlannedTotals {
    /// Distance including estimates; `None` when nothing positive was planned
    pub distance_meters: Option<f64>,
    /// Duration including estimates; `None` when nothing positive was planned
    pub duration_seconds: Option<f64>,
    pub authored_distance_meters: f64,
    pub authored_duration_seconds: f64,
    pub distance_estimated: bool,
    pub duration_estimated: bool,
    /// Steps without a usable duration
    pub excluded_steps: usize,
}

impl PlannedTotals {
    pub fn from_steps(flat_steps: &[FlatStep]) -> Self {
        let mut totals = PlannedTotals::default();
        let mut distance = 0.0;
        let mut duration = 0.0;

        for step in flat_steps {
            let pace = step.target.pace_midpoint_seconds_per_meter();

            match (step.planned_distance_meters, step.planned_duration_seconds) {
                (Some(meters), _) => {
                    distance += meters;
                    totals.authored_distance_meters += meters;
                    if let Some(seconds_per_meter) = pace {
                        duration += meters * seconds_per_meter;
                        totals.duration_estimated = true;
                    }
                }
                (None, Some(seconds)) => {
                    duration += seconds;
                    totals.authored_duration_seconds += seconds;
                    if let Some(seconds_per_meter) = pace {
                        distance += seconds / seconds_per_meter;
                        totals.distance_estimated = true;
                    }
                }
                (None, None) => totals.excluded_steps += 1,
            }
        }

        totals.distance_meters = (distance > 0.0).then_some(distance);
        totals.duration_seconds = (duration > 0.0).then_some(duration);
        totals
    }

    pub fn summary(&self, step_count: usize) -> PlanSummary {
        PlanSummary {
            step_count,
            authored_distance_meters: self.authored_distance_meters,
            authored_duration_seconds: self.authored_duration_seconds,
            estimated_distance_meters: self.distance_meters,
            estimated_duration_seconds: self.duration_seconds,
        }
    }
}

/// Dominant planned quantity: distance when a strict majority of steps are distance-authored
pub fn objective_type(flat_steps: &[FlatStep]) -> ObjectiveType {
    let distance_steps = flat_steps
        .iter()
        .filter(|s| s.duration_kind == Some(DurationKind::Distance))
        .count();

    if distance_steps * 2 > flat_steps.len() {
        ObjectiveType::Distance
    } else {
        ObjectiveType::Time
    }
}

/// Scorer comparing a plan with a recorded activity
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score an activity against a plan using lap totals.
    ///
    /// Returns `None` when the plan has no positive planned distance or duration.
    pub fn score(
        &self,
        flat_steps: &[FlatStep],
        matched_laps: &[MatchedLap],
        laps: &[RecordedLap],
    ) -> Option<MatchQuality> {
        self.score_with_totals(flat_steps, matched_laps, laps, None)
    }

    /// Score an activity, preferring activity-level totals over lap sums when given.
    ///
    /// `matched_laps` must be the output of aligning `laps`, position for position.
    pub fn score_with_totals(
        &self,
        flat_steps: &[FlatStep],
        matched_laps: &[MatchedLap],
        laps: &[RecordedLap],
        totals: Option<ActivityTotals>,
    ) -> Option<MatchQuality> {
        let planned = PlannedTotals::from_steps(flat_steps);
        if planned.distance_meters.is_none() && planned.duration_seconds.is_none() {
            debug!(
                step_count = flat_steps.len(),
                "No planned distance or duration, nothing to compare"
            );
            return None;
        }

        let mut flags = Vec::new();
        if planned.distance_estimated {
            flags.push(QualityFlag::EstimatedDistance);
        }
        if planned.duration_estimated {
            flags.push(QualityFlag::EstimatedDuration);
        }
        if planned.excluded_steps > 0 {
            flags.push(QualityFlag::MissingStepDuration);
        }
        if laps.is_empty() {
            flags.push(QualityFlag::NoLaps);
        } else if !flat_steps.is_empty() && laps.len() != flat_steps.len() {
            flags.push(QualityFlag::LapCountMismatch);
        }

        let (actual_distance, actual_duration) = match totals {
            Some(t) => {
                flags.push(QualityFlag::TotalsFromActivity);
                (t.distance_meters, t.moving_time_seconds)
            }
            None => (
                laps.iter().map(|l| l.distance_meters).sum(),
                laps.iter().map(|l| l.moving_time_seconds).sum(),
            ),
        };

        let distance_percent_diff = planned
            .distance_meters
            .and_then(|p| percent_diff(actual_distance, p));
        let duration_percent_diff = planned
            .duration_seconds
            .and_then(|p| percent_diff(actual_duration, p));

        let distance_score = distance_percent_diff.map(|d| self.config.component_score(d));
        let duration_score = duration_percent_diff.map(|d| self.config.component_score(d));

        let objective = objective_type(flat_steps);
        let (objective_score, other_score) = match objective {
            ObjectiveType::Distance => (distance_score, duration_score),
            ObjectiveType::Time => (duration_score, distance_score),
        };

        let weight = self.config.objective_weight;
        let weighted = match (objective_score, other_score) {
            (Some(o), Some(t)) => weight * o + (1.0 - weight) * t,
            (Some(o), None) => o,
            (None, Some(t)) => t,
            (None, None) => return None,
        };
        let overall_score = weighted.round().clamp(0.0, 100.0) as u8;
        let category = self.config.thresholds.categorize(overall_score);

        debug!(
            overall_score,
            category = category.as_str(),
            objective = ?objective,
            distance_percent_diff = ?distance_percent_diff,
            duration_percent_diff = ?duration_percent_diff,
            "Scored activity against plan"
        );

        Some(MatchQuality {
            overall_score,
            category,
            objective_type: objective,
            planned_distance_meters: planned.distance_meters,
            actual_distance_meters: actual_distance,
            distance_percent_diff,
            distance_score,
            planned_duration_seconds: planned.duration_seconds,
            actual_duration_seconds: actual_duration,
            duration_percent_diff,
            duration_score,
            block_comparison: compare_blocks(flat_steps, matched_laps, laps),
            flags,
        })
    }
}

/// Per-block planned vs. actual, one entry per originating plan node in plan order
pub fn compare_blocks(
    flat_steps: &[FlatStep],
    matched_laps: &[MatchedLap],
    laps: &[RecordedLap],
) -> Vec<BlockComparison> {
    let mut blocks: Vec<BlockComparison> = Vec::new();
    let mut block_of_key: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    let mut block_of_step: Vec<usize> = Vec::with_capacity(flat_steps.len());

    for step in flat_steps {
        let key = (step.source_group_id.as_deref(), step.source_step_id.as_str());
        let block_index = *block_of_key.entry(key).or_insert_with(|| {
            blocks.push(BlockComparison {
                source_step_id: step.source_step_id.clone(),
                source_group_id: step.source_group_id.clone(),
                label: step.display_label(),
                step_type: step.step_type,
                repetitions: 0,
                planned_distance_meters: None,
                planned_duration_seconds: None,
                target_pace_range: step.target.pace_range(),
                actual_distance_meters: 0.0,
                actual_duration_seconds: 0.0,
            });
            blocks.len() - 1
        });

        let block = &mut blocks[block_index];
        block.repetitions += 1;
        if let Some(meters) = step.planned_distance_meters {
            *block.planned_distance_meters.get_or_insert(0.0) += meters;
        }
        if let Some(seconds) = step.planned_duration_seconds {
            *block.planned_duration_seconds.get_or_insert(0.0) += seconds;
        }
        block_of_step.push(block_index);
    }

    if matched_laps.len() != laps.len() {
        warn!(
            matched_lap_count = matched_laps.len(),
            lap_count = laps.len(),
            "Matched laps and laps differ in length, unpaired laps are left out of block actuals"
        );
    }

    for (matched, lap) in matched_laps.iter().zip(laps) {
        if matched.lap_index != lap.lap_index {
            debug!(
                matched_lap_index = matched.lap_index,
                lap_index = lap.lap_index,
                "Matched lap does not correspond to lap, skipping"
            );
            continue;
        }
        let block_index = matched
            .flat_step_index
            .and_then(|i| block_of_step.get(i).copied());
        if let Some(block_index) = block_index {
            let block = &mut blocks[block_index];
            block.actual_distance_meters += lap.distance_meters;
            block.actual_duration_seconds += lap.moving_time_seconds;
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StepTarget, StepType};
    use pretty_assertions::assert_eq;

    fn make_flat(
        index: usize,
        step_id: &str,
        group_id: Option<&str>,
        kind: DurationKind,
        value: f64,
        target: StepTarget,
    ) -> FlatStep {
        FlatStep {
            sequence_index: index,
            source_step_id: step_id.to_string(),
            source_group_id: group_id.map(str::to_string),
            repetition_index: 0,
            step_type: StepType::Active,
            label: None,
            duration_kind: Some(kind),
            planned_distance_meters: (kind == DurationKind::Distance).then_some(value),
            planned_duration_seconds: (kind == DurationKind::Time).then_some(value),
            target,
            intensity: None,
        }
    }

    fn make_lap(index: u32, meters: f64, seconds: f64) -> RecordedLap {
        RecordedLap {
            lap_index: index,
            distance_meters: meters,
            moving_time_seconds: seconds,
            elapsed_time_seconds: seconds,
            average_speed_mps: meters / seconds,
            average_heartrate: None,
            average_cadence: None,
        }
    }

    fn matched(lap_index: u32, flat_step_index: usize) -> MatchedLap {
        MatchedLap {
            lap_index,
            flat_step_index: Some(flat_step_index),
            step_type: StepType::Active,
            step_label: None,
        }
    }

    fn pace(min: f64, max: f64) -> StepTarget {
        StepTarget::Pace { min, max }
    }

    #[test]
    fn test_percent_diff_symmetry() {
        assert_eq!(percent_diff(3600.0, 3600.0), Some(0.0));
        assert_eq!(ScoringConfig::default().component_score(0.0), 100.0);
        assert_eq!(percent_diff(10.0, 0.0), None);
    }

    #[test]
    fn test_distance_objective_scenario() {
        // 10 km at a 6:00/km midpoint plans 3600 s
        let steps = vec![make_flat(
            0,
            "run",
            None,
            DurationKind::Distance,
            10_000.0,
            pace(350.0, 370.0),
        )];
        let laps = vec![make_lap(1, 9_500.0, 3_700.0)];
        let matched_laps = vec![matched(1, 0)];

        let quality = Scorer::default()
            .score(&steps, &matched_laps, &laps)
            .unwrap();

        assert_eq!(quality.objective_type, ObjectiveType::Distance);
        assert_eq!(quality.planned_distance_meters, Some(10_000.0));
        assert!((quality.planned_duration_seconds.unwrap() - 3600.0).abs() < 1e-6);
        assert!((quality.distance_percent_diff.unwrap() + 5.0).abs() < 1e-9);
        assert!((quality.duration_percent_diff.unwrap() - 2.777_777).abs() < 1e-3);
        assert!((quality.distance_score.unwrap() - 90.0).abs() < 1e-9);
        assert!((quality.duration_score.unwrap() - 94.444).abs() < 1e-2);
        assert_eq!(quality.overall_score, 91);
        assert_eq!(quality.category, QualityCategory::Excellent);
        assert!(quality.flags.contains(&QualityFlag::EstimatedDuration));
    }

    #[test]
    fn test_nothing_planned_is_unmatched() {
        let steps = vec![FlatStep {
            planned_distance_meters: None,
            ..make_flat(0, "a", None, DurationKind::Distance, 0.0, StepTarget::None)
        }];
        let laps = vec![make_lap(1, 5_000.0, 1_500.0)];
        assert!(Scorer::default()
            .score(&steps, &[matched(1, 0)], &laps)
            .is_none());
        assert!(Scorer::default().score(&[], &[], &laps).is_none());
    }

    #[test]
    fn test_single_metric_uses_full_weight() {
        // Time objective without pace target: distance is unavailable
        let steps = vec![make_flat(
            0,
            "easy",
            None,
            DurationKind::Time,
            3_000.0,
            StepTarget::None,
        )];
        let laps = vec![make_lap(1, 8_000.0, 2_700.0)];
        let quality = Scorer::default()
            .score(&steps, &[matched(1, 0)], &laps)
            .unwrap();

        assert_eq!(quality.objective_type, ObjectiveType::Time);
        assert_eq!(quality.distance_percent_diff, None);
        // -10% costs 20 points
        assert_eq!(quality.overall_score, 80);
        assert_eq!(quality.category, QualityCategory::Good);
    }

    #[test]
    fn test_large_deviation_floors_at_zero() {
        let steps = vec![make_flat(
            0,
            "long",
            None,
            DurationKind::Distance,
            20_000.0,
            StepTarget::None,
        )];
        let quality = Scorer::default().score(&steps, &[], &[]).unwrap();
        assert_eq!(quality.overall_score, 0);
        assert_eq!(quality.category, QualityCategory::Poor);
        assert_eq!(quality.actual_distance_meters, 0.0);
        assert!(quality.flags.contains(&QualityFlag::NoLaps));
    }

    #[test]
    fn test_activity_totals_override_lap_sums() {
        let steps = vec![make_flat(
            0,
            "run",
            None,
            DurationKind::Distance,
            5_000.0,
            StepTarget::None,
        )];
        let laps = vec![make_lap(1, 1_000.0, 300.0)];
        let totals = ActivityTotals {
            distance_meters: 5_000.0,
            moving_time_seconds: 1_500.0,
        };
        let quality = Scorer::default()
            .score_with_totals(&steps, &[matched(1, 0)], &laps, Some(totals))
            .unwrap();

        assert_eq!(quality.overall_score, 100);
        assert!(quality.flags.contains(&QualityFlag::TotalsFromActivity));
        // Block comparison still reflects the laps
        assert_eq!(quality.block_comparison[0].actual_distance_meters, 1_000.0);
    }

    #[test]
    fn test_blocks_collapse_repetitions() {
        let steps = vec![
            make_flat(0, "wu", None, DurationKind::Time, 600.0, StepTarget::None),
            make_flat(1, "int", Some("g"), DurationKind::Distance, 1_000.0, pace(230.0, 240.0)),
            make_flat(2, "rec", Some("g"), DurationKind::Time, 120.0, StepTarget::None),
            make_flat(3, "int", Some("g"), DurationKind::Distance, 1_000.0, pace(230.0, 240.0)),
            make_flat(4, "rec", Some("g"), DurationKind::Time, 120.0, StepTarget::None),
        ];
        let laps = vec![
            make_lap(1, 1_800.0, 600.0),
            make_lap(2, 1_000.0, 236.0),
            make_lap(3, 300.0, 120.0),
            make_lap(4, 1_000.0, 238.0),
            make_lap(5, 310.0, 120.0),
        ];
        let matched_laps: Vec<MatchedLap> = (0..5).map(|i| matched(i as u32 + 1, i)).collect();

        let blocks = compare_blocks(&steps, &matched_laps, &laps);
        let ids: Vec<&str> = blocks.iter().map(|b| b.source_step_id.as_str()).collect();
        assert_eq!(ids, vec!["wu", "int", "rec"]);

        let interval = &blocks[1];
        assert_eq!(interval.repetitions, 2);
        assert_eq!(interval.planned_distance_meters, Some(2_000.0));
        assert_eq!(interval.planned_duration_seconds, None);
        assert_eq!(interval.actual_distance_meters, 2_000.0);
        assert_eq!(interval.actual_duration_seconds, 474.0);
        assert_eq!(
            interval.target_pace_range.map(|r| r.to_string()).as_deref(),
            Some("3:50–4:00 /km")
        );
        assert_eq!(blocks[2].planned_duration_seconds, Some(240.0));
        assert_eq!(blocks[2].actual_distance_meters, 610.0);
    }

    #[test]
    fn test_blocks_skip_unpaired_laps() {
        let steps = vec![
            make_flat(0, "a", None, DurationKind::Time, 600.0, StepTarget::None),
            make_flat(1, "b", None, DurationKind::Time, 600.0, StepTarget::None),
        ];
        let laps = vec![
            make_lap(1, 2_000.0, 600.0),
            make_lap(2, 2_100.0, 610.0),
            make_lap(3, 500.0, 150.0),
        ];

        // Shorter than laps: the third lap has no pairing
        let short = vec![matched(1, 0), matched(2, 1)];
        let blocks = compare_blocks(&steps, &short, &laps);
        assert_eq!(blocks[0].actual_distance_meters, 2_000.0);
        assert_eq!(blocks[1].actual_distance_meters, 2_100.0);

        // Out of step with laps: nothing is attributed to the wrong lap
        let shifted = vec![matched(2, 0), matched(3, 1), matched(1, 1)];
        let blocks = compare_blocks(&steps, &shifted, &laps);
        assert_eq!(blocks[0].actual_distance_meters, 0.0);
        assert_eq!(blocks[1].actual_distance_meters, 0.0);
    }

    #[test]
    fn test_objective_majority() {
        let mixed = vec![
            make_flat(0, "a", None, DurationKind::Distance, 1.0, StepTarget::None),
            make_flat(1, "b", None, DurationKind::Time, 1.0, StepTarget::None),
        ];
        assert_eq!(objective_type(&mixed), ObjectiveType::Time);
        assert_eq!(objective_type(&mixed[..1]), ObjectiveType::Distance);
        assert_eq!(objective_type(&[]), ObjectiveType::Time);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScoringConfig::default().validate().is_ok());

        let config = ScoringConfig {
            objective_weight: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MatchError::InvalidConfig(_))));

        let config = ScoringConfig {
            thresholds: CategoryThresholds {
                excellent: 60,
                good: 70,
                fair: 50,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let loaded = ScoringConfig::from_json(r#"{"sensitivity": 3.0}"#).unwrap();
        assert_eq!(loaded.sensitivity, 3.0);
        assert_eq!(loaded.objective_weight, DEFAULT_OBJECTIVE_WEIGHT);
        assert_eq!(loaded.thresholds, CategoryThresholds::default());
    }

    #[test]
    fn test_categories() {
        let thresholds = CategoryThresholds::default();
        assert_eq!(thresholds.categorize(85), QualityCategory::Excellent);
        assert_eq!(thresholds.categorize(84), QualityCategory::Good);
        assert_eq!(thresholds.categorize(70), QualityCategory::Good);
        assert_eq!(thresholds.categorize(50), QualityCategory::Fair);
        assert_eq!(thresholds.categorize(49), QualityCategory::Poor);
    }
}
