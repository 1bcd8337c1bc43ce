//! Error types for the loan risk pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Main error type for fitting, persistence and scoring
#[derive(Error, Debug)]
pub enum RiskError {
    /// Malformed or incomplete schema, at fit time or at artifact load time
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Degenerate statistics while fitting the encoder bank
    #[error("Fit error: {0}")]
    FitError(String),

    /// Degenerate range while fitting the scaler, or a width mismatch
    #[error("Scaler error: {0}")]
    ScalerError(String),

    /// Any failure during a single `score` call
    #[error("Scoring error: {0}")]
    ScoringError(#[source] Box<RiskError>),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RiskError {
    /// Wrap an upstream failure as a scoring failure. Already-wrapped errors
    /// are returned as is so nesting stays one level deep.
    pub fn scoring(err: RiskError) -> Self {
        match err {
            RiskError::ScoringError(_) => err,
            other => RiskError::ScoringError(Box::new(other)),
        }
    }

    /// Whether the error aborts a fitting run
    pub fn is_fit_time(&self) -> bool {
        matches!(
            self,
            RiskError::SchemaError(_) | RiskError::FitError(_) | RiskError::ScalerError(_)
        )
    }
}

impl From<polars::error::PolarsError> for RiskError {
    fn from(err: polars::error::PolarsError) -> Self {
        RiskError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RiskError {
    fn from(err: ndarray::ShapeError) -> Self {
        RiskError::DataError(format!("invalid shape: {}", err))
    }
}
