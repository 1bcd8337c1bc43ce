//! Raw input records and training batches
//!
//! A [`Record`] is one row of raw input: a flat key/value mapping with no
//! guaranteed completeness. A [`TrainingBatch`] is a sequence of records with
//! declared column names, as handed over by the ingestion layer.

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single raw field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Whether the value carries no information (null, NaN or blank text)
    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Number(v) => v.is_nan(),
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Bool(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// One row of raw input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field names present in this record
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// A sequence of uniform records with declared column names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingBatch {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl TrainingBatch {
    /// Create a batch with explicitly declared columns
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Create a batch whose declared columns are the union of record keys
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.keys().map(str::to_string))
            .collect();
        Self {
            columns: columns.into_iter().collect(),
            records,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Extract binary labels (0 or 1) for the target column
    pub fn labels(&self, target: &str) -> Result<Vec<f64>> {
        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let value = record.get(target).ok_or_else(|| {
                    RiskError::DataError(format!("row {}: missing target '{}'", row, target))
                })?;
                parse_label(value).ok_or_else(|| {
                    RiskError::DataError(format!(
                        "row {}: target '{}' must be 0 or 1, got {}",
                        row, target, value
                    ))
                })
            })
            .collect()
    }
}

fn parse_label(value: &FieldValue) -> Option<f64> {
    let v = match value {
        FieldValue::Number(v) => *v,
        FieldValue::Bool(b) => f64::from(u8::from(*b)),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        FieldValue::Null => return None,
    };
    if v == 0.0 || v == 1.0 {
        Some(v)
    } else {
        None
    }
}
