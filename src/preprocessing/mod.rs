//! Feature preprocessing
//!
//! The shared transformation path used by both training and scoring:
//! - [`assembler`]: reconcile raw records with the registered fields
//! - [`encoder`]: one-hot and binary encoding, numeric mean imputation
//! - [`scaler`]: min-max scaling clamped to `[0, 1]`

pub mod assembler;
pub mod encoder;
pub mod scaler;

pub use assembler::{AssembledRow, FeatureAssembler, RawCell};
pub use encoder::{ColumnSlot, EncodedColumn, EncoderBank, EncoderState, FeatureEncoder, UNSEEN_LABEL};
pub use scaler::{MinMaxScaler, ScalerParams, ScalerState};

use crate::error::Result;
use crate::record::Record;
use crate::schema::FeatureSchema;
use ndarray::Array2;

/// Run assemble → encode → scale for a batch of records.
///
/// This is the only transform the trainer and the scorer use; a single record
/// is a batch of one.
pub fn transform_records(
    records: &[Record],
    schema: &FeatureSchema,
    encoder: &EncoderState,
    scaler: &ScalerState,
) -> Result<Array2<f64>> {
    let rows = FeatureAssembler::assemble_batch(records, schema)?;
    let encoded = encoder.transform_batch(&rows)?;
    scaler.transform(&encoded)
}

/// Run assemble → encode → scale for one record
pub fn transform_record(
    record: &Record,
    schema: &FeatureSchema,
    encoder: &EncoderState,
    scaler: &ScalerState,
) -> Result<Vec<f64>> {
    let row = FeatureAssembler::assemble(record, schema)?;
    let encoded = encoder.transform(&row)?;
    scaler.transform_row(&encoded)
}
