//! Feature assembly
//!
//! The one function that turns a raw [`Record`] into a row aligned with the
//! registered input fields. Training batches and single inference records both
//! go through [`assemble_fields`]; there is no second code path.

use crate::error::{Result, RiskError};
use crate::record::{FieldValue, Record};
use crate::schema::{FeatureSchema, FeatureSpec};
use serde::{Deserialize, Serialize};

/// A normalised raw value for one registered field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCell {
    Missing,
    Number(f64),
    Category(String),
}

impl RawCell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            RawCell::Category(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawCell::Missing)
    }
}

/// A record reconciled against the registered fields, one cell per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledRow {
    cells: Vec<RawCell>,
}

impl AssembledRow {
    pub fn cells(&self) -> &[RawCell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&RawCell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of fields that were absent or blank
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }
}

/// Assembles records against a frozen schema
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Assemble one record for the given schema.
    ///
    /// Extra keys in `record` are ignored; absent fields become
    /// [`RawCell::Missing`].
    pub fn assemble(record: &Record, schema: &FeatureSchema) -> Result<AssembledRow> {
        assemble_fields(record, schema.fields())
    }

    /// Assemble many records for the given schema
    pub fn assemble_batch(records: &[Record], schema: &FeatureSchema) -> Result<Vec<AssembledRow>> {
        assemble_batch_fields(records, schema.fields())
    }
}

/// Assemble one record against a list of field declarations
pub fn assemble_fields(record: &Record, fields: &[FeatureSpec]) -> Result<AssembledRow> {
    let cells = fields
        .iter()
        .map(|spec| normalise(spec, record.get(&spec.name)))
        .collect::<Result<Vec<_>>>()?;
    Ok(AssembledRow { cells })
}

/// Assemble many records against a list of field declarations
pub fn assemble_batch_fields(records: &[Record], fields: &[FeatureSpec]) -> Result<Vec<AssembledRow>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            assemble_fields(record, fields).map_err(|e| match e {
                RiskError::DataError(msg) => RiskError::DataError(format!("row {}: {}", row, msg)),
                other => other,
            })
        })
        .collect()
}

fn normalise(spec: &FeatureSpec, value: Option<&FieldValue>) -> Result<RawCell> {
    let value = match value {
        Some(v) if !v.is_missing() => v,
        _ => return Ok(RawCell::Missing),
    };

    if spec.is_categorical() {
        let label = match value {
            FieldValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => canonical_number(v),
                _ => s.trim().to_string(),
            },
            FieldValue::Number(v) => canonical_number(*v),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Null => return Ok(RawCell::Missing),
        };
        let label = spec.aliases.get(&label).cloned().unwrap_or(label);
        return Ok(RawCell::Category(label));
    }

    let raw = match value {
        FieldValue::Number(v) => *v,
        FieldValue::Bool(b) => f64::from(u8::from(*b)),
        FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            RiskError::DataError(format!(
                "field '{}' expects a number, got '{}'",
                spec.name, s
            ))
        })?,
        FieldValue::Null => return Ok(RawCell::Missing),
    };

    if raw.is_nan() || spec.missing_sentinels.iter().any(|s| *s == raw) {
        return Ok(RawCell::Missing);
    }
    if !raw.is_finite() {
        return Err(RiskError::DataError(format!(
            "field '{}' is not finite",
            spec.name
        )));
    }

    Ok(RawCell::Number(spec.unit.apply(raw)))
}

/// Render a number used as a category label: integral values lose the
/// fractional part so `1.0`, `"1.0"` and `"1"` encode the same way.
fn canonical_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
