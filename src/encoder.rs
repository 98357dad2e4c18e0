//! Report encoding
//!
//! This module wraps engine output in a versioned report envelope with
//! producer metadata, ready to hand to a comparison view.

use crate::error::MatchError;
use crate::types::{FlatStep, MatchQuality, MatchedLap, PlanSummary};
use crate::{PRODUCER_NAME, WORKOUT_MATCH_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete plan-vs-actual report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub plan: PlanSummary,
    pub flat_steps: Vec<FlatStep>,
    pub matched_laps: Vec<MatchedLap>,
    /// `false` when there was nothing to compare
    pub matched: bool,
    pub quality: Option<MatchQuality>,
}

/// Engine output before encoding
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub plan: PlanSummary,
    pub flat_steps: Vec<FlatStep>,
    pub matched_laps: Vec<MatchedLap>,
    pub quality: Option<MatchQuality>,
}

/// Encoder for producing report payloads
#[derive(Debug, Clone)]
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap an outcome in a report
    pub fn encode(&self, outcome: MatchOutcome) -> MatchReport {
        MatchReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: WORKOUT_MATCH_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            plan: outcome.plan,
            flat_steps: outcome.flat_steps,
            matched_laps: outcome.matched_laps,
            matched: outcome.quality.is_some(),
            quality: outcome.quality,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, outcome: MatchOutcome) -> Result<String, MatchError> {
        let report = self.encode(outcome);
        serde_json::to_string_pretty(&report).map_err(|e| MatchError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_outcome() -> MatchOutcome {
        MatchOutcome {
            plan: PlanSummary::default(),
            flat_steps: vec![],
            matched_laps: vec![],
            quality: None,
        }
    }

    #[test]
    fn test_encode_report_envelope() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(empty_outcome());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, WORKOUT_MATCH_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert!(!report.matched);
        assert!(report.quality.is_none());
    }

    #[test]
    fn test_encode_to_json() {
        let json = ReportEncoder::new().encode_to_json(empty_outcome()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["matched"], false);
        assert!(parsed["quality"].is_null());
        assert!(parsed.get("flatSteps").is_some());
        assert!(parsed.get("matchedLaps").is_some());
        assert!(parsed["producer"].get("instanceId").is_some());
        assert!(parsed.get("computedAtUtc").is_some());
    }
}
