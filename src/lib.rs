//! Workout Match - plan-vs-actual engine for structured workouts
//!
//! Workout Match compares what a coach planned with what an athlete recorded
//! through a deterministic pipeline: plan flattening → lap alignment →
//! execution scoring → report encoding.
//!
//! ## Modules
//!
//! - **Flattener**: Unroll repeat groups into a linear sequence of flat steps
//! - **Aligner**: Map recorded laps onto flat steps, even when counts differ
//! - **Scorer**: Compare planned and actual distance/duration into a 0-100 score

pub mod adapters;
pub mod aligner;
pub mod encoder;
pub mod error;
pub mod flattener;
pub mod pipeline;
pub mod schema;
pub mod scorer;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::MatchError;
pub use pipeline::{align, flatten, flatten_plan_json, match_workout_json, score, WorkoutMatcher};
pub use scorer::ScoringConfig;

// Schema exports
pub use schema::{parse_plan, validate_plan, PlanIssue};

/// Library version embedded in all reports
pub const WORKOUT_MATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "workout-match";
