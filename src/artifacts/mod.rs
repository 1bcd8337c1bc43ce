//! Fitted artifact bundle and its on-disk form
//!
//! One fitting run produces one [`ArtifactBundle`]. On disk it is three JSON
//! files that share a header; loading checks that all three come from the same
//! run before anything is handed to the scorer.
//!
//! | File          | Contents                         |
//! |---------------|----------------------------------|
//! | `schema.json` | header, schema, encoder state    |
//! | `scaler.json` | header, scaler state             |
//! | `model.json`  | header, classifier, fit report   |

use crate::error::{Result, RiskError};
use crate::model::{Classifier, TrainedModel};
use crate::preprocessing::{EncoderState, ScalerState};
use crate::schema::FeatureSchema;
use crate::training::TrainingReport;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Version of the artifact file layout
pub const FORMAT_VERSION: u32 = 1;

pub const SCHEMA_FILE: &str = "schema.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";

/// Identity shared by the three files of one fitting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub fit_id: Uuid,
    pub schema_fingerprint: String,
    pub fitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct SchemaFile {
    header: ArtifactHeader,
    schema: FeatureSchema,
    encoder: EncoderState,
}

#[derive(Serialize, Deserialize)]
struct ScalerFile {
    header: ArtifactHeader,
    scaler: ScalerState,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    header: ArtifactHeader,
    model: TrainedModel,
    report: TrainingReport,
}

/// The matched schema, encoder state, scaler state and model of one fit.
///
/// Only [`Trainer::fit`](crate::training::Trainer::fit) and
/// [`ArtifactBundle::load`] create bundles, and both verify consistency, so
/// a bundle in hand is always usable for scoring.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    header: ArtifactHeader,
    schema: FeatureSchema,
    encoder: EncoderState,
    scaler: ScalerState,
    model: TrainedModel,
    report: TrainingReport,
}

impl ArtifactBundle {
    /// Seal freshly fitted parts into a bundle with a new fit id
    pub(crate) fn assemble(
        schema: FeatureSchema,
        encoder: EncoderState,
        scaler: ScalerState,
        model: TrainedModel,
        report: TrainingReport,
    ) -> Result<Self> {
        let header = ArtifactHeader {
            format_version: FORMAT_VERSION,
            fit_id: Uuid::new_v4(),
            schema_fingerprint: schema.fingerprint().to_string(),
            fitted_at: Utc::now(),
        };
        let bundle = Self {
            header,
            schema,
            encoder,
            scaler,
            model,
            report,
        };
        bundle.verify()?;
        Ok(bundle)
    }

    pub fn header(&self) -> &ArtifactHeader {
        &self.header
    }

    pub fn fit_id(&self) -> Uuid {
        self.header.fit_id
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    /// Check that every part agrees with the schema
    pub fn verify(&self) -> Result<()> {
        if self.header.schema_fingerprint != self.schema.fingerprint() {
            return Err(RiskError::SchemaError(
                "header fingerprint does not match the schema".to_string(),
            ));
        }
        self.schema.verify(&self.encoder)?;

        self.scaler
            .validate()
            .map_err(|e| RiskError::SchemaError(format!("scaler state unusable: {}", e)))?;
        if self.scaler.columns() != self.schema.columns() {
            return Err(RiskError::SchemaError(format!(
                "scaler covers {} columns, schema registers {}",
                self.scaler.n_columns(),
                self.schema.n_columns()
            )));
        }

        if self.model.n_features() != self.schema.n_columns() {
            return Err(RiskError::SchemaError(format!(
                "model expects {} inputs, schema registers {} columns",
                self.model.n_features(),
                self.schema.n_columns()
            )));
        }
        Ok(())
    }

    /// Write the three artifact files into `dir`, creating it if needed
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        write_json(
            &dir.join(SCHEMA_FILE),
            &SchemaFile {
                header: self.header.clone(),
                schema: self.schema.clone(),
                encoder: self.encoder.clone(),
            },
        )?;
        write_json(
            &dir.join(SCALER_FILE),
            &ScalerFile {
                header: self.header.clone(),
                scaler: self.scaler.clone(),
            },
        )?;
        write_json(
            &dir.join(MODEL_FILE),
            &ModelFile {
                header: self.header.clone(),
                model: self.model.clone(),
                report: self.report.clone(),
            },
        )?;

        info!(
            dir = %dir.display(),
            fit_id = %self.header.fit_id,
            "Artifacts saved"
        );
        Ok(())
    }

    /// Load and cross-check the three artifact files in `dir`.
    ///
    /// Fails with `SchemaError` if a file is missing, was written by another
    /// format version, or belongs to a different fitting run than its
    /// siblings.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let schema_file: SchemaFile = read_json(dir, SCHEMA_FILE)?;
        let scaler_file: ScalerFile = read_json(dir, SCALER_FILE)?;
        let model_file: ModelFile = read_json(dir, MODEL_FILE)?;

        let header = schema_file.header;
        if header.format_version != FORMAT_VERSION {
            return Err(RiskError::SchemaError(format!(
                "{} has format version {}, expected {}",
                SCHEMA_FILE, header.format_version, FORMAT_VERSION
            )));
        }
        for (name, other) in [(SCALER_FILE, &scaler_file.header), (MODEL_FILE, &model_file.header)] {
            if other.format_version != header.format_version {
                return Err(RiskError::SchemaError(format!(
                    "{} has format version {}, expected {}",
                    name, other.format_version, FORMAT_VERSION
                )));
            }
            if other.fit_id != header.fit_id {
                return Err(RiskError::SchemaError(format!(
                    "{} belongs to fit {}, {} belongs to fit {}",
                    name, other.fit_id, SCHEMA_FILE, header.fit_id
                )));
            }
            if other.schema_fingerprint != header.schema_fingerprint {
                return Err(RiskError::SchemaError(format!(
                    "{} was fitted against a different schema",
                    name
                )));
            }
        }

        let bundle = Self {
            header,
            schema: schema_file.schema,
            encoder: schema_file.encoder,
            scaler: scaler_file.scaler,
            model: model_file.model,
            report: model_file.report,
        };
        bundle.verify()?;

        debug!(
            dir = %dir.display(),
            fit_id = %bundle.header.fit_id,
            columns = bundle.schema.n_columns(),
            model = bundle.model.name(),
            "Artifacts loaded"
        );
        Ok(bundle)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(RiskError::SchemaError(format!(
            "artifact directory {} is missing {}",
            dir.display(),
            name
        )));
    }
    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text)
        .map_err(|e| RiskError::SerializationError(format!("{}: {}", path.display(), e)))
}
