//! Workout plan schema
//!
//! This module parses coach-authored plan JSON into plan entries and checks
//! plans for authoring problems the engine tolerates but a builder should
//! surface.

mod plan;
mod validation;

pub use plan::*;
pub use validation::*;
