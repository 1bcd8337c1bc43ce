//! The fitting pass

use super::TrainingConfig;
use crate::artifacts::ArtifactBundle;
use crate::error::{Result, RiskError};
use crate::evaluation::ModelMetrics;
use crate::model::Classifier;
use crate::preprocessing::MinMaxScaler;
use crate::record::TrainingBatch;
use crate::schema::{registry, SchemaFit};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a fitting run, persisted with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_holdout: usize,
    pub n_columns: usize,
    pub dropped_columns: Vec<String>,
    pub model: String,
    pub train_metrics: ModelMetrics,
    /// `None` when no rows were held out
    pub holdout_metrics: Option<ModelMetrics>,
    pub duration_secs: f64,
}

/// Untrained pipeline: holds the configuration, produces fitted artifacts
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit schema, encoders, scaler and classifier on `batch`.
    ///
    /// Every fitted piece comes from this one pass, so the returned bundle
    /// is internally consistent. Encoders see the whole batch; the constant
    /// column check, the scaler and the classifier see only the training rows.
    pub fn fit(&self, batch: &TrainingBatch) -> Result<ArtifactBundle> {
        let start = Instant::now();
        self.config.validate()?;
        info!(
            rows = batch.len(),
            features = self.config.features.features.len(),
            target = %self.config.features.target,
            "Starting fit"
        );

        let features = &self.config.features;
        registry::check_batch(features, batch)?;
        let labels = batch.labels(&features.target)?;
        let (train_idx, holdout_idx) =
            stratified_split(&labels, self.config.test_size, self.config.random_state);
        if train_idx.is_empty() {
            return Err(RiskError::TrainingError("holdout split left no training rows".into()));
        }

        let SchemaFit {
            schema,
            encoder,
            encoded,
            dropped,
        } = registry::build_for_rows(features, batch, &train_idx)?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Encoders fitted");

        // holdout rows stay out of the scaler ranges
        let scaler = MinMaxScaler::fit(&encoded.select(Axis(0), &train_idx), schema.columns())?;
        let x = scaler.transform(&encoded)?;
        let y = Array1::from(labels);
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            train_rows = train_idx.len(),
            "Scaler fitted"
        );

        let (x_train, y_train) = take_rows(&x, &y, &train_idx);

        let model = self.config.model.fit(&x_train, &y_train)?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            model = model.name(),
            "Classifier fitted"
        );

        let threshold = self.config.classification_threshold;
        let evaluate = |x: &Array2<f64>, y: &Array1<f64>| -> Result<ModelMetrics> {
            let proba = model.predict_proba(x)?;
            Ok(ModelMetrics::compute(&y.to_vec(), &proba.to_vec(), threshold))
        };
        let train_metrics = evaluate(&x_train, &y_train)?;
        let holdout_metrics = if holdout_idx.is_empty() {
            None
        } else {
            let (x_holdout, y_holdout) = take_rows(&x, &y, &holdout_idx);
            Some(evaluate(&x_holdout, &y_holdout)?)
        };

        let report = TrainingReport {
            n_rows: batch.len(),
            n_train: train_idx.len(),
            n_holdout: holdout_idx.len(),
            n_columns: schema.n_columns(),
            dropped_columns: dropped,
            model: model.name().to_string(),
            train_metrics,
            holdout_metrics,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        let bundle = ArtifactBundle::assemble(schema, encoder, scaler, model, report)?;
        info!(
            fit_id = %bundle.fit_id(),
            columns = bundle.schema().n_columns(),
            train_auc = ?bundle.report().train_metrics.roc_auc,
            holdout_auc = ?bundle.report().holdout_metrics.as_ref().and_then(|m| m.roc_auc),
            duration_secs = bundle.report().duration_secs,
            "Fit complete"
        );
        Ok(bundle)
    }
}

/// Seeded per-class holdout split over labels in `{0, 1}`.
///
/// Each class contributes `round(n_class * test_size)` rows to the holdout,
/// keeping at least one row of that class for training. Both index lists come
/// back sorted.
pub fn stratified_split(y: &[f64], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<bool, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label > 0.5).or_default().push(i);
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len());
    let mut holdout = Vec::new();
    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n_holdout = ((indices.len() as f64 * test_size).round() as usize)
            .min(indices.len().saturating_sub(1));
        holdout.extend_from_slice(&indices[..n_holdout]);
        train.extend_from_slice(&indices[n_holdout..]);
    }
    train.sort_unstable();
    holdout.sort_unstable();
    (train, holdout)
}

fn take_rows(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), indices), y.select(Axis(0), indices))
}
