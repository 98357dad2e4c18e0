//! Lap alignment
//!
//! Maps recorded laps onto the flat-step sequence. Equal counts map one to
//! one; otherwise lap `i` of `N` maps to step `floor(i * M / N)`, which keeps
//! the mapping non-decreasing and reaches every step as `N` grows.

use crate::types::{FlatStep, MatchedLap, RecordedLap, StepType};
use tracing::debug;

/// Aligner for mapping laps to flat steps
pub struct Aligner;

impl Aligner {
    /// Align laps to flat steps. Returns exactly one entry per lap, in lap order.
    pub fn align(laps: &[RecordedLap], flat_steps: &[FlatStep]) -> Vec<MatchedLap> {
        let lap_count = laps.len();
        let step_count = flat_steps.len();

        debug!(
            lap_count,
            step_count,
            proportional = lap_count != step_count,
            "Aligning laps to plan"
        );

        laps.iter()
            .enumerate()
            .map(|(position, lap)| {
                let index = step_index_for(position, lap_count, step_count);
                match index.and_then(|i| flat_steps.get(i)) {
                    Some(step) => MatchedLap {
                        lap_index: lap.lap_index,
                        flat_step_index: index,
                        step_type: step.step_type,
                        step_label: Some(step.display_label()),
                    },
                    None => MatchedLap {
                        lap_index: lap.lap_index,
                        flat_step_index: None,
                        step_type: StepType::Other,
                        step_label: None,
                    },
                }
            })
            .collect()
    }
}

/// Flat step index for the lap at zero-based `position` out of `lap_count`
pub fn step_index_for(position: usize, lap_count: usize, step_count: usize) -> Option<usize> {
    if step_count == 0 || lap_count == 0 {
        return None;
    }
    if lap_count == step_count {
        return Some(position);
    }
    Some((position * step_count / lap_count).min(step_count - 1))
}
