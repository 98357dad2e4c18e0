//! Pipeline orchestration
//!
//! This module provides the public API for Workout Match.
//! It orchestrates the stages from plan and activity JSON to a match report.

use crate::adapters::{ActivitySourceAdapter, NativeAdapter};
use crate::aligner::Aligner;
use crate::encoder::{MatchOutcome, MatchReport, ReportEncoder};
use crate::error::MatchError;
use crate::flattener::Flattener;
use crate::schema::parse_plan;
use crate::scorer::{PlannedTotals, Scorer, ScoringConfig};
use crate::types::{ActivityInput, FlatStep, MatchQuality, MatchedLap, PlanEntry, RecordedLap};

/// Expand a plan into its flat execution sequence.
pub fn flatten(plan: &[PlanEntry]) -> Vec<FlatStep> {
    Flattener::flatten(plan)
}

/// Map recorded laps onto flat steps, one entry per lap.
pub fn align(laps: &[RecordedLap], flat_steps: &[FlatStep]) -> Vec<MatchedLap> {
    Aligner::align(laps, flat_steps)
}

/// Score laps against flat steps with the default scoring constants.
///
/// Returns `None` when the plan has nothing to compare against.
pub fn score(
    flat_steps: &[FlatStep],
    matched_laps: &[MatchedLap],
    laps: &[RecordedLap],
) -> Option<MatchQuality> {
    Scorer::default().score(flat_steps, matched_laps, laps)
}

/// Convert plan JSON into flat-step JSON.
///
/// # Example
/// ```ignore
/// let flat_json = flatten_plan_json(plan_json)?;
/// ```
pub fn flatten_plan_json(plan_json: String) -> Result<String, MatchError> {
    let plan = parse_plan(&plan_json)?;
    let flat_steps = Flattener::flatten(&plan);
    serde_json::to_string_pretty(&flat_steps).map_err(|e| MatchError::EncodingError(e.to_string()))
}

/// Match native activity JSON against plan JSON and return the report JSON.
///
/// # Arguments
/// * `plan_json` - Plan entries (array, or object with `steps`)
/// * `activity_json` - Activity with `laps` and optional `totals`, or a bare lap array
///
/// # Example
/// ```ignore
/// let report_json = match_workout_json(plan_json, activity_json)?;
/// ```
pub fn match_workout_json(plan_json: String, activity_json: String) -> Result<String, MatchError> {
    WorkoutMatcher::new().match_json(&NativeAdapter, &plan_json, &activity_json)
}

/// Matcher with configurable scoring constants.
///
/// Holds no per-request state; one instance can serve any number of requests.
#[derive(Debug, Clone, Default)]
pub struct WorkoutMatcher {
    scorer: Scorer,
    encoder: ReportEncoder,
}

impl WorkoutMatcher {
    /// Create a matcher with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher with specific scoring constants
    pub fn with_config(config: ScoringConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self {
            scorer: Scorer::new(config),
            encoder: ReportEncoder::new(),
        })
    }

    /// Create a matcher whose reports carry a fixed instance ID
    pub fn with_instance_id(mut self, instance_id: String) -> Self {
        self.encoder = ReportEncoder::with_instance_id(instance_id);
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        self.scorer.config()
    }

    /// Run flatten, align and score over already-parsed input.
    ///
    /// Pipeline stages:
    /// 1. Flattener - Unroll the plan into flat steps
    /// 2. Aligner - Map laps onto flat steps
    /// 3. Scorer - Compare planned and actual totals
    pub fn match_activity(&self, plan: &[PlanEntry], activity: &ActivityInput) -> MatchOutcome {
        let flat_steps = Flattener::flatten(plan);
        let matched_laps = Aligner::align(&activity.laps, &flat_steps);
        let quality = self.scorer.score_with_totals(
            &flat_steps,
            &matched_laps,
            &activity.laps,
            activity.totals,
        );
        let plan_summary = PlannedTotals::from_steps(&flat_steps).summary(flat_steps.len());

        MatchOutcome {
            plan: plan_summary,
            flat_steps,
            matched_laps,
            quality,
        }
    }

    /// Run the pipeline and wrap the outcome in a report
    pub fn report(&self, plan: &[PlanEntry], activity: &ActivityInput) -> MatchReport {
        self.encoder.encode(self.match_activity(plan, activity))
    }

    /// Parse plan and activity JSON, run the pipeline and encode the report
    pub fn match_json(
        &self,
        adapter: &dyn ActivitySourceAdapter,
        plan_json: &str,
        activity_json: &str,
    ) -> Result<String, MatchError> {
        let plan = parse_plan(plan_json)?;
        let activity = adapter.parse(activity_json)?;
        self.encoder
            .encode_to_json(self.match_activity(&plan, &activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StravaAdapter;
    use crate::types::{ObjectiveType, QualityCategory};

    fn sample_plan_json() -> &'static str {
        r#"[
            { "id": "wu", "type": "warmup", "duration": { "kind": "time", "value": 600 } },
            { "groupId": "g1", "reps": 3, "members": [
                { "id": "int", "type": "active",
                  "duration": { "kind": "distance", "value": 1000 },
                  "target": { "type": "pace", "min": 230, "max": 250 } },
                { "id": "rec", "type": "recovery", "duration": { "kind": "time", "value": 120 } }
            ] },
            { "id": "cd", "type": "cooldown", "duration": { "kind": "time", "value": 600 } }
        ]"#
    }

    fn sample_activity_json() -> &'static str {
        r#"{ "laps": [
            { "lapIndex": 1, "distanceMeters": 1800, "movingTimeSeconds": 600 },
            { "lapIndex": 2, "distanceMeters": 1000, "movingTimeSeconds": 238 },
            { "lapIndex": 3, "distanceMeters": 350, "movingTimeSeconds": 120 },
            { "lapIndex": 4, "distanceMeters": 1000, "movingTimeSeconds": 242 },
            { "lapIndex": 5, "distanceMeters": 340, "movingTimeSeconds": 120 },
            { "lapIndex": 6, "distanceMeters": 1000, "movingTimeSeconds": 245 },
            { "lapIndex": 7, "distanceMeters": 330, "movingTimeSeconds": 120 },
            { "lapIndex": 8, "distanceMeters": 1750, "movingTimeSeconds": 600 }
        ] }"#
    }

    #[test]
    fn test_match_workout_json() {
        let result = match_workout_json(
            sample_plan_json().to_string(),
            sample_activity_json().to_string(),
        );

        assert!(result.is_ok());
        let report: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();

        assert_eq!(report["producer"]["name"], "workout-match");
        assert_eq!(report["matched"], true);
        assert_eq!(report["plan"]["stepCount"], 8);
        assert_eq!(report["flatSteps"].as_array().unwrap().len(), 8);

        let matched_laps = report["matchedLaps"].as_array().unwrap();
        assert_eq!(matched_laps.len(), 8);
        assert_eq!(matched_laps[7]["flatStepIndex"], 7);
        assert_eq!(matched_laps[7]["stepType"], "cooldown");

        let quality = &report["quality"];
        assert_eq!(quality["objectiveType"], "time");
        let planned_duration = quality["plannedDurationSeconds"].as_f64().unwrap();
        assert!((planned_duration - 2280.0).abs() < 1e-6);
        assert_eq!(quality["blockComparison"].as_array().unwrap().len(), 4);
        assert!(quality["overallScore"].as_u64().unwrap() <= 100);
    }

    #[test]
    fn test_match_activity_outcome() {
        let plan = parse_plan(sample_plan_json()).unwrap();
        let activity = NativeAdapter.parse(sample_activity_json()).unwrap();

        let outcome = WorkoutMatcher::new().match_activity(&plan, &activity);
        let quality = outcome.quality.unwrap();

        // 600 + 3 * 120 + 600 s authored, plus 3 km at a 4:00/km midpoint
        assert_eq!(outcome.plan.authored_duration_seconds, 1560.0);
        assert_eq!(outcome.plan.authored_distance_meters, 3000.0);
        assert!((quality.planned_duration_seconds.unwrap() - 2280.0).abs() < 1e-6);
        // Time steps carry no pace target, so planned distance stays authored-only
        assert_eq!(quality.planned_distance_meters, Some(3000.0));
        assert_eq!(quality.objective_type, ObjectiveType::Time);
        assert_eq!(quality.block_comparison[1].repetitions, 3);
        assert_eq!(quality.block_comparison[1].actual_distance_meters, 3000.0);
    }

    #[test]
    fn test_empty_plan_is_unmatched() {
        let report = WorkoutMatcher::new()
            .with_instance_id("fixed".to_string())
            .match_json(&NativeAdapter, "[]", sample_activity_json())
            .unwrap();

        let report: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(report["matched"], false);
        assert!(report["quality"].is_null());
        assert_eq!(report["producer"]["instanceId"], "fixed");

        let matched_laps = report["matchedLaps"].as_array().unwrap();
        assert_eq!(matched_laps.len(), 8);
        assert!(matched_laps.iter().all(|m| m["flatStepIndex"].is_null()));
        assert!(matched_laps.iter().all(|m| m["stepType"] == "other"));
    }

    #[test]
    fn test_strava_source() {
        let strava_json = r#"{
            "id": 42, "distance": 2400.0, "moving_time": 900,
            "laps": [
                { "lap_index": 1, "distance": 1200.0, "moving_time": 450 },
                { "lap_index": 2, "distance": 1200.0, "moving_time": 450 }
            ]
        }"#;
        let plan_json = r#"[{ "id": "run", "type": "active",
            "duration": { "kind": "time", "value": 900 } }]"#;

        let report = WorkoutMatcher::new()
            .match_json(&StravaAdapter, plan_json, strava_json)
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(report["quality"]["overallScore"], 100);
        assert_eq!(report["quality"]["category"], "Excellent");
        let flags = report["quality"]["flags"].as_array().unwrap();
        assert!(flags.contains(&serde_json::json!("totals_from_activity")));
        assert!(flags.contains(&serde_json::json!("lap_count_mismatch")));
    }

    #[test]
    fn test_custom_config() {
        let config = ScoringConfig {
            sensitivity: 1.0,
            ..Default::default()
        };
        let matcher = WorkoutMatcher::with_config(config).unwrap();

        let plan = parse_plan(
            r#"[{ "id": "run", "type": "active", "duration": { "kind": "time", "value": 1000 } }]"#,
        )
        .unwrap();
        let activity = NativeAdapter
            .parse(r#"[{ "lapIndex": 1, "distanceMeters": 3000, "movingTimeSeconds": 800 }]"#)
            .unwrap();

        // -20% at one point per percent
        let quality = matcher.match_activity(&plan, &activity).quality.unwrap();
        assert_eq!(quality.overall_score, 80);
        assert_eq!(quality.category, QualityCategory::Good);

        let invalid = ScoringConfig {
            sensitivity: -1.0,
            ..Default::default()
        };
        assert!(WorkoutMatcher::with_config(invalid).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(match_workout_json("not valid json".to_string(), "[]".to_string()).is_err());
        assert!(match_workout_json("[]".to_string(), "not valid json".to_string()).is_err());
    }

    #[test]
    fn test_flatten_plan_json() {
        let json = flatten_plan_json(sample_plan_json().to_string()).unwrap();
        let flat: serde_json::Value = serde_json::from_str(&json).unwrap();
        let flat = flat.as_array().unwrap();

        assert_eq!(flat.len(), 8);
        assert_eq!(flat[5]["sourceGroupId"], "g1");
        assert_eq!(flat[5]["repetitionIndex"], 2);
        assert_eq!(flat[5]["type"], "active");
        assert_eq!(flat[5]["target"]["type"], "pace");
    }
}
