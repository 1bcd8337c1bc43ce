//! Training configuration

use crate::error::{Result, RiskError};
use crate::model::ModelConfig;
use crate::schema::FeatureSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one fitting run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Declared features and target
    pub features: FeatureSet,

    /// Fraction of rows held out for evaluation, per class
    pub test_size: f64,

    /// Seed for the train/holdout split
    pub random_state: u64,

    /// Threshold used for the holdout confusion matrix
    pub classification_threshold: f64,

    pub model: ModelConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            features: FeatureSet::home_credit(),
            test_size: 0.2,
            random_state: 22,
            classification_threshold: 0.5,
            model: ModelConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            RiskError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_size) {
            return Err(RiskError::ConfigError(format!(
                "test_size must be in [0, 1), got {}",
                self.test_size
            )));
        }
        if !(0.0..=1.0).contains(&self.classification_threshold) {
            return Err(RiskError::ConfigError(format!(
                "classification_threshold must be in [0, 1], got {}",
                self.classification_threshold
            )));
        }
        self.model.validate()?;
        self.features.validate()
    }
}
