//! Strava activity adapter
//!
//! Parses a Strava detailed-activity payload (as returned by the activities
//! endpoint with laps included) and maps its laps to recorded laps.

use crate::error::MatchError;
use crate::types::{ActivityInput, ActivityTotals, RecordedLap};
use serde::Deserialize;
use tracing::debug;

use super::{sort_laps, ActivitySourceAdapter};

/// Strava payload adapter
pub struct StravaAdapter;

impl ActivitySourceAdapter for StravaAdapter {
    fn parse(&self, raw_json: &str) -> Result<ActivityInput, MatchError> {
        let payload: StravaActivity = serde_json::from_str(raw_json)?;

        let strava_laps = payload.laps.unwrap_or_default();
        // Recorded indices are only trusted when every lap carries one
        let indexed = strava_laps.iter().all(|lap| lap.lap_index.is_some());
        if !indexed {
            debug!(
                activity_id = ?payload.id,
                "Some laps have no lap_index, keeping payload order"
            );
        }

        let mut laps: Vec<RecordedLap> = strava_laps
            .into_iter()
            .enumerate()
            .map(|(position, lap)| {
                let lap_index = match (indexed, lap.lap_index) {
                    (true, Some(index)) => index,
                    _ => position as u32 + 1,
                };
                convert_lap(lap, lap_index)
            })
            .collect();
        if indexed {
            sort_laps(&mut laps);
        }

        let totals = match (payload.distance, payload.moving_time) {
            (Some(distance_meters), Some(moving_time_seconds)) => Some(ActivityTotals {
                distance_meters,
                moving_time_seconds,
            }),
            _ => None,
        };

        debug!(
            activity_id = ?payload.id,
            lap_count = laps.len(),
            has_totals = totals.is_some(),
            "Parsed Strava activity"
        );

        Ok(ActivityInput { laps, totals })
    }
}

fn convert_lap(lap: StravaLap, lap_index: u32) -> RecordedLap {
    let average_speed_mps = lap.average_speed.unwrap_or_else(|| {
        if lap.moving_time > 0.0 {
            lap.distance / lap.moving_time
        } else {
            0.0
        }
    });

    RecordedLap {
        lap_index,
        distance_meters: lap.distance,
        moving_time_seconds: lap.moving_time,
        elapsed_time_seconds: lap.elapsed_time.unwrap_or(lap.moving_time),
        average_speed_mps,
        average_heartrate: lap.average_heartrate,
        average_cadence: lap.average_cadence,
    }
}

// ============================================================================
// Strava API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: Option<u64>,
    distance: Option<f64>,
    moving_time: Option<f64>,
    laps: Option<Vec<StravaLap>>,
}

#[derive(Debug, Deserialize)]
struct StravaLap {
    lap_index: Option<u32>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    moving_time: f64,
    elapsed_time: Option<f64>,
    average_speed: Option<f64>,
    average_heartrate: Option<f64>,
    average_cadence: Option<f64>,
}
