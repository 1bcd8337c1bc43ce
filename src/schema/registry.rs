//! Schema construction from a training batch

use crate::error::{Result, RiskError};
use crate::preprocessing::assembler::assemble_batch_fields;
use crate::preprocessing::scaler::column_range;
use crate::preprocessing::{EncoderBank, EncoderState};
use crate::record::TrainingBatch;
use super::{FeatureKind, FeatureSchema, FeatureSet};
use ndarray::{Array2, Axis};
use tracing::{debug, warn};

/// Output of the schema fit pass: the frozen schema, the encoder state it was
/// derived from, and the encoded training matrix (columns = `schema.columns()`).
#[derive(Debug, Clone)]
pub struct SchemaFit {
    pub schema: FeatureSchema,
    pub encoder: EncoderState,
    pub encoded: Array2<f64>,
    /// Encoded columns dropped for being constant over the fit rows
    pub dropped: Vec<String>,
}

/// Build the schema and encoder state from a training batch in one pass.
///
/// Fails with `SchemaError` when the batch lacks a declared feature or the
/// target, when a categorical feature has no observed categories, or when no
/// informative column survives; with `FitError` when a numeric feature is
/// entirely missing.
pub fn build(feature_set: &FeatureSet, batch: &TrainingBatch) -> Result<SchemaFit> {
    let all_rows: Vec<usize> = (0..batch.len()).collect();
    build_for_rows(feature_set, batch, &all_rows)
}

/// Like [`build`], but a column counts as constant when it is constant over
/// `fit_rows` alone. Encoders still see every row of the batch.
pub fn build_for_rows(
    feature_set: &FeatureSet,
    batch: &TrainingBatch,
    fit_rows: &[usize],
) -> Result<SchemaFit> {
    check_batch(feature_set, batch)?;
    if fit_rows.is_empty() {
        return Err(RiskError::SchemaError("no rows to fit the schema on".to_string()));
    }
    if let Some(&row) = fit_rows.iter().find(|&&row| row >= batch.len()) {
        return Err(RiskError::SchemaError(format!(
            "fit row {} is outside a batch of {} records",
            row,
            batch.len()
        )));
    }

    let rows = assemble_batch_fields(batch.records(), &feature_set.features)?;
    let encoder = EncoderBank::fit(&feature_set.features, &rows)?;

    if let Some(empty) = encoder
        .encoders()
        .iter()
        .find(|e| e.kind() != FeatureKind::Numeric && e.cardinality() == 0)
    {
        return Err(RiskError::SchemaError(format!(
            "categorical feature '{}' has no observed categories",
            empty.name()
        )));
    }

    let encoded = encoder.transform_batch(&rows)?;
    let fit_view = encoded.select(Axis(0), fit_rows);
    let constant: Vec<usize> = fit_view
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, column)| {
            let (min, max) = column_range(column.view());
            min == max
        })
        .map(|(i, _)| i)
        .collect();

    let dropped: Vec<String> = constant
        .iter()
        .map(|&i| {
            let name = encoder.layout()[i].name.clone();
            warn!(column = %name, value = fit_view[[0, i]], "Dropping constant training column");
            name
        })
        .collect();

    let (encoder, encoded) = if constant.is_empty() {
        (encoder, encoded)
    } else {
        let keep: Vec<usize> = (0..encoded.ncols()).filter(|i| !constant.contains(i)).collect();
        let encoded = encoded.select(Axis(1), &keep);
        (encoder.without_columns(&constant), encoded)
    };

    if encoder.n_columns() == 0 {
        return Err(RiskError::SchemaError(
            "no informative columns remain after dropping constant columns".to_string(),
        ));
    }

    let schema = FeatureSchema::new(
        feature_set.features.clone(),
        encoder.column_names(),
        feature_set.target.clone(),
    );
    debug!(
        fields = schema.fields().len(),
        columns = schema.n_columns(),
        fit_rows = fit_rows.len(),
        dropped = constant.len(),
        fingerprint = %schema.fingerprint(),
        "Schema frozen"
    );

    Ok(SchemaFit {
        schema,
        encoder,
        encoded,
        dropped,
    })
}

/// Check that a batch can be fitted against `feature_set`: non-empty, with
/// every declared feature and the target present.
pub fn check_batch(feature_set: &FeatureSet, batch: &TrainingBatch) -> Result<()> {
    feature_set.validate()?;

    if batch.is_empty() {
        return Err(RiskError::SchemaError("training batch is empty".to_string()));
    }
    let missing: Vec<&str> = feature_set
        .names()
        .into_iter()
        .filter(|name| !batch.has_column(name))
        .collect();
    if !missing.is_empty() {
        return Err(RiskError::SchemaError(format!(
            "training batch is missing declared features: {}",
            missing.join(", ")
        )));
    }
    if !batch.has_column(&feature_set.target) {
        return Err(RiskError::SchemaError(format!(
            "training batch is missing target column '{}'",
            feature_set.target
        )));
    }
    Ok(())
}
