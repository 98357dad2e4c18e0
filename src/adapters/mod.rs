//! Activity source adapters
//!
//! This module provides adapters that parse recorded-activity JSON from an
//! activity source and map it to the engine's lap representation.

mod native;
mod strava;

pub use native::NativeAdapter;
pub use strava::StravaAdapter;

use crate::error::MatchError;
use crate::types::{ActivityInput, RecordedLap};

/// Trait for activity source adapters
pub trait ActivitySourceAdapter {
    /// Parse raw JSON into laps (chronologically ordered) and optional totals
    fn parse(&self, raw_json: &str) -> Result<ActivityInput, MatchError>;
}

/// Look up an adapter by source name
pub fn adapter_for(source: &str) -> Result<Box<dyn ActivitySourceAdapter>, MatchError> {
    match source {
        "native" => Ok(Box::new(NativeAdapter)),
        "strava" => Ok(Box::new(StravaAdapter)),
        other => Err(MatchError::UnsupportedSource(other.to_string())),
    }
}

/// Order laps by their recorded index, keeping input order for ties
pub(crate) fn sort_laps(laps: &mut [RecordedLap]) {
    laps.sort_by_key(|lap| lap.lap_index);
}
