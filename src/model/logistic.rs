//! Logistic regression

use super::{check_width, sigmoid, ClassWeight, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// L2 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub tol: f64,
    pub learning_rate: f64,
    pub class_weight: ClassWeight,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.5,
            class_weight: ClassWeight::Balanced,
        }
    }
}

impl LogisticConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
}

/// Binary logistic regression fitted by batch gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub config: LogisticConfig,
    coefficients: Array1<f64>,
    intercept: f64,
    /// Iterations run before convergence or `max_iter`
    n_iter: usize,
}

impl LogisticClassifier {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            coefficients: Array1::zeros(0),
            intercept: 0.0,
            n_iter: 0,
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_features = x.ncols();
        if x.nrows() == 0 || n_features == 0 {
            return Err(RiskError::TrainingError("empty training matrix".into()));
        }
        let weights = self.config.class_weight.sample_weights(y)?;
        let total_weight = weights.sum();

        let mut coef: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0;
        let lr = self.config.learning_rate;
        let alpha = self.config.alpha;
        self.n_iter = self.config.max_iter;

        for iter in 0..self.config.max_iter {
            let predictions = (x.dot(&coef) + bias).mapv(sigmoid);
            let errors = (&predictions - y) * &weights;

            let dw = x.t().dot(&errors) / total_weight + alpha * &coef;
            let db = errors.sum() / total_weight;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.config.tol {
                self.n_iter = iter;
                break;
            }

            coef = coef - lr * dw;
            bias -= lr * db;
        }

        if !bias.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err(RiskError::TrainingError(
                "logistic regression diverged".into(),
            ));
        }

        self.coefficients = coef;
        self.intercept = bias;
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.coefficients.is_empty() {
            return Err(RiskError::TrainingError("model is not fitted".into()));
        }
        check_width(self.coefficients.len(), x)?;
        Ok((x.dot(&self.coefficients) + self.intercept).mapv(sigmoid))
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &'static str {
        "logistic"
    }
}
