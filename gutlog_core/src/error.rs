//! Error types for the gutlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gutlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input at event creation; the write is rejected
    #[error("Validation error: {0}")]
    Validation(String),

    /// Nutrient lookup failed; the food log write is aborted
    #[error("Nutrient lookup error: {0}")]
    Lookup(String),

    /// Too few paired observations to calibrate the predictor
    #[error("Insufficient data: {have} food/stool pairs, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// Stool history exists but no food intake covers the lookback window
    #[error("No food data in the lookback window; prediction is undefined")]
    NoFoodData,

    /// Event store boundary failure; transient, retry is the caller's call
    #[error("Event store unavailable: {0}")]
    Store(String),
}
