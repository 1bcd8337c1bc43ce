//! Encoder bank: categorical encoding and numeric imputation
//!
//! [`EncoderBank::fit`] learns an [`EncoderState`] once from assembled training
//! rows. [`EncoderState::transform`] then applies it, read-only, to any
//! assembled row. Batch transform is a loop over the single-row transform.

use crate::error::{Result, RiskError};
use crate::schema::{FeatureKind, FeatureSpec};
use super::assembler::{AssembledRow, RawCell};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code emitted for a binary feature whose label was not seen during fitting
pub const UNSEEN_LABEL: f64 = -1.0;

/// Fitted encoder for one raw field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureEncoder {
    /// Categories observed at fit time, in first-seen order
    OneHot { name: String, categories: Vec<String> },
    /// Label ↔ code map; `labels[code]` is the label for `code`
    Binary {
        name: String,
        labels: Vec<String>,
        codes: BTreeMap<String, i64>,
    },
    /// Training-set mean used for imputation
    Numeric { name: String, mean: f64 },
}

impl FeatureEncoder {
    pub fn name(&self) -> &str {
        match self {
            FeatureEncoder::OneHot { name, .. }
            | FeatureEncoder::Binary { name, .. }
            | FeatureEncoder::Numeric { name, .. } => name,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureEncoder::OneHot { .. } => FeatureKind::OneHot,
            FeatureEncoder::Binary { .. } => FeatureKind::Binary,
            FeatureEncoder::Numeric { .. } => FeatureKind::Numeric,
        }
    }

    /// Number of distinct categories or labels (zero for numeric)
    pub fn cardinality(&self) -> usize {
        match self {
            FeatureEncoder::OneHot { categories, .. } => categories.len(),
            FeatureEncoder::Binary { labels, .. } => labels.len(),
            FeatureEncoder::Numeric { .. } => 0,
        }
    }

    /// Integer code for a binary label, `None` if unseen or not binary
    pub fn code_for(&self, label: &str) -> Option<i64> {
        match self {
            FeatureEncoder::Binary { codes, .. } => codes.get(label).copied(),
            _ => None,
        }
    }

    /// Label for a binary code
    pub fn label_for(&self, code: i64) -> Option<&str> {
        match self {
            FeatureEncoder::Binary { labels, .. } => usize::try_from(code)
                .ok()
                .and_then(|i| labels.get(i))
                .map(|s| s.as_str()),
            _ => None,
        }
    }

    fn output_slots(&self) -> Vec<(String, ColumnSlot)> {
        match self {
            FeatureEncoder::OneHot { name, categories } => categories
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("{}={}", name, c), ColumnSlot::Indicator(i)))
                .collect(),
            FeatureEncoder::Binary { name, .. } => vec![(name.clone(), ColumnSlot::Code)],
            FeatureEncoder::Numeric { name, .. } => vec![(name.clone(), ColumnSlot::Value)],
        }
    }
}

/// What an encoded column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSlot {
    /// Indicator for the category at this index
    Indicator(usize),
    /// Binary label code
    Code,
    /// Numeric value
    Value,
}

/// One output column of the encoder bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    /// Index of the source field in the assembled row
    pub field: usize,
    pub slot: ColumnSlot,
}

/// Fitted state of the encoder bank. Read-only after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    encoders: Vec<FeatureEncoder>,
    layout: Vec<EncodedColumn>,
}

impl EncoderState {
    /// Per-field encoders, aligned with the registered fields
    pub fn encoders(&self) -> &[FeatureEncoder] {
        &self.encoders
    }

    pub fn encoder(&self, name: &str) -> Option<&FeatureEncoder> {
        self.encoders.iter().find(|e| e.name() == name)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.encoders.iter().map(|e| e.name())
    }

    /// Output columns in emission order
    pub fn layout(&self) -> &[EncodedColumn] {
        &self.layout
    }

    pub fn column_names(&self) -> Vec<String> {
        self.layout.iter().map(|c| c.name.clone()).collect()
    }

    pub fn n_columns(&self) -> usize {
        self.layout.len()
    }

    /// Encode one assembled row into `n_columns()` values
    pub fn transform(&self, row: &AssembledRow) -> Result<Vec<f64>> {
        if row.len() != self.encoders.len() {
            return Err(RiskError::DataError(format!(
                "assembled row has {} fields, encoder expects {}",
                row.len(),
                self.encoders.len()
            )));
        }

        self.layout
            .iter()
            .map(|column| {
                let cell = row.cell(column.field).unwrap_or(&RawCell::Missing);
                self.encoders
                    .get(column.field)
                    .and_then(|encoder| encode_cell(encoder, column.slot, cell))
                    .ok_or_else(|| {
                        RiskError::SchemaError(format!(
                            "column '{}' does not match its encoder",
                            column.name
                        ))
                    })
            })
            .collect()
    }

    /// Encode many assembled rows into a `rows × n_columns()` matrix
    pub fn transform_batch(&self, rows: &[AssembledRow]) -> Result<Array2<f64>> {
        let mut flat = Vec::with_capacity(rows.len() * self.layout.len());
        for row in rows {
            flat.extend(self.transform(row)?);
        }
        Ok(Array2::from_shape_vec((rows.len(), self.layout.len()), flat)?)
    }

    /// Check the layout references valid fields and slots
    pub fn validate(&self) -> Result<()> {
        for column in &self.layout {
            let encoder = self.encoders.get(column.field).ok_or_else(|| {
                RiskError::SchemaError(format!(
                    "column '{}' references unknown field {}",
                    column.name, column.field
                ))
            })?;
            let valid = match (encoder, column.slot) {
                (FeatureEncoder::OneHot { categories, .. }, ColumnSlot::Indicator(i)) => {
                    i < categories.len()
                }
                (FeatureEncoder::Binary { .. }, ColumnSlot::Code) => true,
                (FeatureEncoder::Numeric { mean, .. }, ColumnSlot::Value) => mean.is_finite(),
                _ => false,
            };
            if !valid {
                return Err(RiskError::SchemaError(format!(
                    "column '{}' does not match its encoder",
                    column.name
                )));
            }
        }
        Ok(())
    }

    /// Drop output columns by index. Only used inside the fit pass, before the
    /// schema is frozen.
    pub(crate) fn without_columns(mut self, drop: &[usize]) -> Self {
        let mut index = 0;
        self.layout.retain(|_| {
            let keep = !drop.contains(&index);
            index += 1;
            keep
        });
        self
    }
}

fn encode_cell(encoder: &FeatureEncoder, slot: ColumnSlot, cell: &RawCell) -> Option<f64> {
    match (encoder, slot) {
        (FeatureEncoder::OneHot { categories, .. }, ColumnSlot::Indicator(i)) => {
            let category = categories.get(i)?;
            Some(match cell.as_category() {
                Some(label) if label == category => 1.0,
                _ => 0.0,
            })
        }
        (FeatureEncoder::Binary { codes, .. }, ColumnSlot::Code) => Some(
            cell.as_category()
                .and_then(|label| codes.get(label))
                .map(|&code| code as f64)
                .unwrap_or(UNSEEN_LABEL),
        ),
        (FeatureEncoder::Numeric { mean, .. }, ColumnSlot::Value) => {
            Some(cell.as_number().unwrap_or(*mean))
        }
        _ => None,
    }
}

/// Fits encoder state from assembled training rows
pub struct EncoderBank;

impl EncoderBank {
    /// Fit one encoder per field.
    ///
    /// Categorical fields record labels in first-seen order; numeric fields
    /// record the mean of non-missing values. A categorical field with no
    /// observed labels yields an empty encoder here; the schema registry
    /// rejects it.
    pub fn fit(fields: &[FeatureSpec], rows: &[AssembledRow]) -> Result<EncoderState> {
        if let Some(bad) = rows.iter().find(|r| r.len() != fields.len()) {
            return Err(RiskError::FitError(format!(
                "assembled row has {} fields, {} declared",
                bad.len(),
                fields.len()
            )));
        }

        let encoders = fields
            .iter()
            .enumerate()
            .map(|(index, spec)| fit_field(spec, index, rows))
            .collect::<Result<Vec<_>>>()?;

        let layout = encoders
            .iter()
            .enumerate()
            .flat_map(|(field, encoder)| {
                encoder
                    .output_slots()
                    .into_iter()
                    .map(move |(name, slot)| EncodedColumn { name, field, slot })
            })
            .collect();

        Ok(EncoderState { encoders, layout })
    }
}

fn fit_field(spec: &FeatureSpec, index: usize, rows: &[AssembledRow]) -> Result<FeatureEncoder> {
    let cells = rows.iter().filter_map(|r| r.cell(index));

    match spec.kind {
        FeatureKind::OneHot => {
            let mut categories: Vec<String> = Vec::new();
            for label in cells.filter_map(|c| c.as_category()) {
                if !categories.iter().any(|c| c == label) {
                    categories.push(label.to_string());
                }
            }
            Ok(FeatureEncoder::OneHot {
                name: spec.name.clone(),
                categories,
            })
        }
        FeatureKind::Binary => {
            let mut labels: Vec<String> = Vec::new();
            let mut codes = BTreeMap::new();
            for label in cells.filter_map(|c| c.as_category()) {
                if !codes.contains_key(label) {
                    codes.insert(label.to_string(), labels.len() as i64);
                    labels.push(label.to_string());
                }
            }
            Ok(FeatureEncoder::Binary {
                name: spec.name.clone(),
                labels,
                codes,
            })
        }
        FeatureKind::Numeric => {
            let (sum, count) = cells
                .filter_map(|c| c.as_number())
                .fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
            if count == 0 {
                return Err(RiskError::FitError(format!(
                    "numeric feature '{}' has no observed values, mean is undefined",
                    spec.name
                )));
            }
            Ok(FeatureEncoder::Numeric {
                name: spec.name.clone(),
                mean: sum / count as f64,
            })
        }
    }
}
