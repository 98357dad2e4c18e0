//! Error types for Workout Match

use thiserror::Error;

/// Errors raised at the boundary of the engine (parsing, configuration, encoding).
///
/// The flatten/align/score stages themselves never fail; they degrade
/// gracefully on odd-but-valid input.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Unsupported activity source: {0}")]
    UnsupportedSource(String),
}
