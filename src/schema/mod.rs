//! Schema registry
//!
//! The frozen, ordered description of what the scorer consumes:
//! - the raw input fields a record may carry ([`FeatureSchema::fields`])
//! - the encoded column names handed to the classifier ([`FeatureSchema::columns`])
//! - per-field kind, unit convention, missing sentinels and label aliases
//!
//! A schema is only ever produced by [`registry::build`], in the same fit pass
//! that fits the encoder bank, so the encoder layout and `columns()` cannot
//! drift apart.

mod feature_set;
pub mod registry;

pub use feature_set::{FeatureSet, DAYS_EMPLOYED_ANOMALY};
pub use registry::{build, SchemaFit};

use crate::error::{Result, RiskError};
use crate::preprocessing::EncoderState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// How a feature is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// One indicator column per category observed at fit time
    OneHot,
    /// A single integer code per label, first-seen order, `-1` for unseen
    Binary,
    /// A numeric value, mean-imputed when missing
    Numeric,
}

/// Unit convention of a numeric feature, applied identically on every path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitConvention {
    /// Value is used as supplied
    #[default]
    AsIs,
    /// Value is a negative day offset (e.g. `DAYS_BIRTH = -12000`) and is
    /// converted to positive years: `-days / 365`
    NegatedDaysToYears,
}

impl UnitConvention {
    /// Convert a raw value into the unit the encoder sees
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            UnitConvention::AsIs => value,
            UnitConvention::NegatedDaysToYears => -value / 365.0,
        }
    }
}

/// Declaration of one raw input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    #[serde(default)]
    pub unit: UnitConvention,
    /// Raw numeric values that mean "missing" in the source data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_sentinels: Vec<f64>,
    /// Categorical label rewrites applied before encoding
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unit: UnitConvention::AsIs,
            missing_sentinels: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FeatureKind::Numeric)
    }

    pub fn one_hot(name: impl Into<String>) -> Self {
        Self::new(name, FeatureKind::OneHot)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, FeatureKind::Binary)
    }

    /// Builder method to set the unit convention
    pub fn with_unit(mut self, unit: UnitConvention) -> Self {
        self.unit = unit;
        self
    }

    /// Builder method to add a missing-value sentinel
    pub fn with_missing_sentinel(mut self, value: f64) -> Self {
        self.missing_sentinels.push(value);
        self
    }

    /// Builder method to add a label alias
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    pub fn is_categorical(&self) -> bool {
        self.kind != FeatureKind::Numeric
    }
}

/// Frozen schema captured from one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FeatureSpec>,
    columns: Vec<String>,
    target: String,
    fingerprint: String,
}

impl FeatureSchema {
    pub(crate) fn new(fields: Vec<FeatureSpec>, columns: Vec<String>, target: String) -> Self {
        let fingerprint = compute_fingerprint(&fields, &columns, &target);
        Self {
            fields,
            columns,
            target,
            fingerprint,
        }
    }

    /// Raw input fields in registered order
    pub fn fields(&self) -> &[FeatureSpec] {
        &self.fields
    }

    /// Raw input field names, i.e. what a form must collect
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Encoded column names in the order the scorer expects
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Content hash over fields, columns and target
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn field(&self, name: &str) -> Option<&FeatureSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Verify a deserialized schema is intact and matches the encoder state
    /// it was persisted with.
    pub fn verify(&self, encoder: &EncoderState) -> Result<()> {
        let expected = compute_fingerprint(&self.fields, &self.columns, &self.target);
        if expected != self.fingerprint {
            return Err(RiskError::SchemaError(
                "schema fingerprint does not match its content".to_string(),
            ));
        }

        let encoder_fields: Vec<&str> = encoder.feature_names().collect();
        if encoder_fields != self.field_names() {
            return Err(RiskError::SchemaError(format!(
                "encoder fields {:?} do not match schema fields {:?}",
                encoder_fields,
                self.field_names()
            )));
        }

        let encoder_columns = encoder.column_names();
        if encoder_columns != self.columns {
            return Err(RiskError::SchemaError(format!(
                "encoder emits {} columns, schema registers {}",
                encoder_columns.len(),
                self.columns.len()
            )));
        }

        encoder.validate()
    }
}

fn compute_fingerprint(fields: &[FeatureSpec], columns: &[String], target: &str) -> String {
    let mut hasher = Sha256::new();
    // serde_json output is stable here: structs serialize in field order and
    // aliases live in a BTreeMap.
    let fields_json = serde_json::to_vec(fields).unwrap_or_default();
    hasher.update(&fields_json);
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(target.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(UnitConvention::NegatedDaysToYears.apply(-3650.0), 10.0);
        assert_eq!(UnitConvention::AsIs.apply(-3650.0), -3650.0);
    }

    #[test]
    fn test_fingerprint_depends_on_columns() {
        let fields = vec![FeatureSpec::one_hot("CODE_GENDER")];
        let a = FeatureSchema::new(fields.clone(), vec!["CODE_GENDER=M".into()], "TARGET".into());
        let b = FeatureSchema::new(
            fields,
            vec!["CODE_GENDER=M".into(), "CODE_GENDER=F".into()],
            "TARGET".into(),
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_feature_kind_serialize() {
        let json = serde_json::to_string(&FeatureKind::OneHot).unwrap();
        assert_eq!(json, "\"OneHot\"");
    }
}
