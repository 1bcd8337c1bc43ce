//! Declared feature sets

use crate::error::{Result, RiskError};
use super::{FeatureKind, FeatureSpec, UnitConvention};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value used by the source loan data for "employment length unknown"
pub const DAYS_EMPLOYED_ANOMALY: f64 = 365243.0;

/// The features a training run is asked to use, plus the target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Vec<FeatureSpec>,
    pub target: String,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::home_credit()
    }
}

impl FeatureSet {
    /// Create a feature set with no features yet
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            features: Vec::new(),
            target: target.into(),
        }
    }

    /// Builder method to append a feature
    pub fn with_feature(mut self, spec: FeatureSpec) -> Self {
        self.features.push(spec);
        self
    }

    /// The loan application feature set used by the default model
    pub fn home_credit() -> Self {
        Self::new("TARGET")
            .with_feature(FeatureSpec::binary("NAME_CONTRACT_TYPE"))
            .with_feature(FeatureSpec::one_hot("CODE_GENDER").with_alias("XNA", "M"))
            .with_feature(FeatureSpec::binary("FLAG_OWN_CAR"))
            .with_feature(FeatureSpec::binary("FLAG_OWN_REALTY"))
            .with_feature(FeatureSpec::numeric("CNT_CHILDREN"))
            .with_feature(FeatureSpec::numeric("AMT_INCOME_TOTAL"))
            .with_feature(FeatureSpec::numeric("AMT_CREDIT"))
            .with_feature(FeatureSpec::numeric("AMT_GOODS_PRICE"))
            .with_feature(FeatureSpec::one_hot("NAME_INCOME_TYPE"))
            .with_feature(FeatureSpec::one_hot("NAME_EDUCATION_TYPE"))
            .with_feature(
                FeatureSpec::numeric("DAYS_BIRTH").with_unit(UnitConvention::NegatedDaysToYears),
            )
            .with_feature(
                FeatureSpec::numeric("DAYS_EMPLOYED")
                    .with_unit(UnitConvention::NegatedDaysToYears)
                    .with_missing_sentinel(DAYS_EMPLOYED_ANOMALY),
            )
            .with_feature(FeatureSpec::numeric("CNT_FAM_MEMBERS"))
            .with_feature(FeatureSpec::numeric("EXT_SOURCE_1"))
            .with_feature(FeatureSpec::numeric("EXT_SOURCE_2"))
            .with_feature(FeatureSpec::numeric("EXT_SOURCE_3"))
    }

    /// Names of the declared features, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Features of a given kind
    pub fn of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &FeatureSpec> {
        self.features.iter().filter(move |f| f.kind == kind)
    }

    /// Check the declaration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(RiskError::SchemaError("no features declared".to_string()));
        }
        if self.target.trim().is_empty() {
            return Err(RiskError::SchemaError("no target column declared".to_string()));
        }

        let mut seen = HashSet::new();
        for spec in &self.features {
            if spec.name.trim().is_empty() {
                return Err(RiskError::SchemaError("feature with empty name".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(RiskError::SchemaError(format!(
                    "feature '{}' declared more than once",
                    spec.name
                )));
            }
            if spec.name == self.target {
                return Err(RiskError::SchemaError(format!(
                    "target '{}' is also declared as a feature",
                    self.target
                )));
            }
            if spec.kind != FeatureKind::Numeric
                && (spec.unit != UnitConvention::AsIs || !spec.missing_sentinels.is_empty())
            {
                return Err(RiskError::SchemaError(format!(
                    "categorical feature '{}' cannot carry numeric unit or sentinel metadata",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}
