//! Native activity adapter
//!
//! Accepts the engine's own activity JSON: either `{ "laps": [...], "totals": {...} }`
//! or a bare array of laps.

use crate::error::MatchError;
use crate::types::{ActivityInput, RecordedLap};
use serde::Deserialize;

use super::{sort_laps, ActivitySourceAdapter};

/// Adapter for activity JSON already in the engine's shape
pub struct NativeAdapter;

#[derive(Deserialize)]
#[serde(untagged)]
enum NativePayload {
    Activity(ActivityInput),
    Laps(Vec<RecordedLap>),
}

impl ActivitySourceAdapter for NativeAdapter {
    fn parse(&self, raw_json: &str) -> Result<ActivityInput, MatchError> {
        let value: serde_json::Value = serde_json::from_str(raw_json)?;
        let payload: NativePayload = serde_json::from_value(value)
            .map_err(|e| MatchError::ParseError(format!("Failed to parse activity: {}", e)))?;

        let mut activity = match payload {
            NativePayload::Activity(activity) => activity,
            NativePayload::Laps(laps) => ActivityInput { laps, totals: None },
        };
        sort_laps(&mut activity.laps);

        Ok(activity)
    }
}
