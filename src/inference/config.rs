//! Serving configuration

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Configuration for the scoring service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    pub host: String,

    pub port: u16,

    /// Upper bound on one scoring call, in milliseconds
    pub request_timeout_ms: u64,

    /// Probability at or above which a record is classified as a default
    pub classification_threshold: f64,

    /// Largest accepted batch on the batch endpoint
    pub max_batch_size: usize,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            request_timeout_ms: 2000,
            classification_threshold: 0.5,
            max_batch_size: 1000,
        }
    }
}

impl ServingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the bind address
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Builder method to set the per-call timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Builder method to set classification threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.classification_threshold = threshold;
        self
    }

    pub fn with_max_batch_size(mut self, n: usize) -> Self {
        self.max_batch_size = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(RiskError::ConfigError("request_timeout_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.classification_threshold) {
            return Err(RiskError::ConfigError(format!(
                "classification_threshold must be in [0, 1], got {}",
                self.classification_threshold
            )));
        }
        if self.max_batch_size == 0 {
            return Err(RiskError::ConfigError("max_batch_size must be positive".into()));
        }
        Ok(())
    }
}
