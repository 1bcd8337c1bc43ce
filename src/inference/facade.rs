//! Scoring facade over a loaded artifact bundle

use crate::artifacts::ArtifactBundle;
use crate::error::{Result, RiskError};
use crate::model::Classifier;
use crate::preprocessing::{transform_record, transform_records};
use crate::record::Record;
use crate::schema::FeatureSchema;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A scored record with its decision at a threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub probability: f64,
    pub threshold: f64,
    /// `probability >= threshold`
    pub is_default: bool,
}

/// Read-only scorer over one fitted bundle.
///
/// Cloning is cheap and every method takes `&self`, so one facade can be
/// shared across threads without locking.
#[derive(Debug, Clone)]
pub struct ScoringFacade {
    bundle: Arc<ArtifactBundle>,
}

impl ScoringFacade {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self::from_shared(Arc::new(bundle))
    }

    pub fn from_shared(bundle: Arc<ArtifactBundle>) -> Self {
        Self { bundle }
    }

    /// Load artifacts from `dir` and start serving them
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        ArtifactBundle::load(dir).map(Self::new)
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.bundle.schema()
    }

    /// The scaled feature vector the classifier sees for `record`
    pub fn encode(&self, record: &Record) -> Result<Vec<f64>> {
        let bundle = &self.bundle;
        transform_record(record, bundle.schema(), bundle.encoder(), bundle.scaler())
            .map_err(RiskError::scoring)
    }

    /// The scaled feature matrix for many records, one row each
    pub fn encode_batch(&self, records: &[Record]) -> Result<Array2<f64>> {
        let bundle = &self.bundle;
        transform_records(records, bundle.schema(), bundle.encoder(), bundle.scaler())
            .map_err(RiskError::scoring)
    }

    /// Positive-class probability for one record
    pub fn score(&self, record: &Record) -> Result<f64> {
        let features = self.encode(record)?;
        let x = Array2::from_shape_vec((1, features.len()), features)
            .map_err(|e| RiskError::scoring(e.into()))?;
        let proba = self
            .bundle
            .model()
            .predict_proba(&x)
            .map_err(RiskError::scoring)?;

        let p = proba.first().copied().ok_or_else(|| {
            RiskError::scoring(RiskError::DataError("classifier returned no output".into()))
        })?;
        check_probability(p)
    }

    /// Score many records in parallel. Each result is independent of the
    /// others; one bad record fails only its own slot.
    pub fn score_batch(&self, records: &[Record]) -> Vec<Result<f64>> {
        let results: Vec<Result<f64>> = records.par_iter().map(|r| self.score(r)).collect();
        debug!(
            records = records.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Batch scored"
        );
        results
    }

    /// Score one record and compare against `threshold`
    pub fn classify(&self, record: &Record, threshold: f64) -> Result<Classification> {
        let probability = self.score(record)?;
        Ok(Classification {
            probability,
            threshold,
            is_default: probability >= threshold,
        })
    }
}

fn check_probability(p: f64) -> Result<f64> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(RiskError::scoring(RiskError::DataError(format!(
            "classifier produced an invalid probability: {}",
            p
        ))))
    }
}
