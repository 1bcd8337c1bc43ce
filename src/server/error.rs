//! Error types for the scoring service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::RiskError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The record could not be scored; not retryable
    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Scoring timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RiskError> for ServerError {
    fn from(err: RiskError) -> Self {
        match err {
            RiskError::ScoringError(_) | RiskError::DataError(_) => ServerError::Scoring(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Scoring(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::Timeout(ms) => {
                tracing::warn!(timeout_ms = ms, "Scoring call timed out");
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
