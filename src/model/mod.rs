//! Classifiers behind the scoring contract
//!
//! The rest of the crate only sees [`Classifier`]: a scaled feature matrix in,
//! one positive-class probability per row out. Two implementations are
//! provided:
//! - [`BoostedClassifier`]: leaf-wise gradient-boosted trees
//! - [`LogisticClassifier`]: L2-regularised logistic regression

mod gbdt;
mod logistic;

pub use gbdt::{BoostedClassifier, BoostingConfig, MAX_TREE_DEPTH};
pub use logistic::{LogisticClassifier, LogisticConfig};

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// An opaque binary scorer
pub trait Classifier: Send + Sync {
    /// Positive-class probability for every row of `x`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of input columns the model was fitted on
    fn n_features(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// How training rows are weighted by class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every row counts once
    Uniform,
    /// Rows weighted by `n / (2 * n_class)` so both classes contribute equally
    #[default]
    Balanced,
}

impl ClassWeight {
    /// Per-row weights for binary labels in `{0, 1}`
    pub fn sample_weights(&self, y: &Array1<f64>) -> Result<Array1<f64>> {
        let n = y.len();
        if n == 0 {
            return Err(RiskError::TrainingError("no training rows".to_string()));
        }
        let positives = y.iter().filter(|&&v| v > 0.5).count();
        let negatives = n - positives;
        if positives == 0 || negatives == 0 {
            return Err(RiskError::TrainingError(format!(
                "training labels contain a single class ({} positive, {} negative)",
                positives, negatives
            )));
        }

        Ok(match self {
            ClassWeight::Uniform => Array1::ones(n),
            ClassWeight::Balanced => {
                let w_pos = n as f64 / (2.0 * positives as f64);
                let w_neg = n as f64 / (2.0 * negatives as f64);
                y.mapv(|v| if v > 0.5 { w_pos } else { w_neg })
            }
        })
    }
}

/// Which classifier a training run fits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    GradientBoosting(BoostingConfig),
    Logistic(LogisticConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::GradientBoosting(BoostingConfig::default())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelConfig::GradientBoosting(config) => config.validate(),
            ModelConfig::Logistic(_) => Ok(()),
        }
    }

    /// Fit the configured classifier on a scaled matrix and `{0, 1}` labels
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        if x.nrows() != y.len() {
            return Err(RiskError::TrainingError(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        match self {
            ModelConfig::GradientBoosting(config) => {
                let mut model = BoostedClassifier::new(config.clone());
                model.fit(x, y)?;
                Ok(TrainedModel::GradientBoosting(model))
            }
            ModelConfig::Logistic(config) => {
                let mut model = LogisticClassifier::new(config.clone());
                model.fit(x, y)?;
                Ok(TrainedModel::Logistic(model))
            }
        }
    }
}

/// A fitted classifier as persisted in `model.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainedModel {
    GradientBoosting(BoostedClassifier),
    Logistic(LogisticClassifier),
}

impl Classifier for TrainedModel {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::GradientBoosting(m) => m.predict_proba(x),
            TrainedModel::Logistic(m) => m.predict_proba(x),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            TrainedModel::GradientBoosting(m) => m.n_features(),
            TrainedModel::Logistic(m) => m.n_features(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TrainedModel::GradientBoosting(m) => m.name(),
            TrainedModel::Logistic(m) => m.name(),
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn check_width(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(RiskError::DataError(format!(
            "model expects {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}
