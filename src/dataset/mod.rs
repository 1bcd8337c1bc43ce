//! Dataset adapter
//!
//! Turns a loaded polars [`DataFrame`] into the core's [`TrainingBatch`] of
//! records. The pipeline itself never reads files; the CLI loads them with
//! [`DataLoader`] and converts here.

mod loader;

pub use loader::{DataLoader, FileFormat};

use crate::error::{Result, RiskError};
use crate::record::{FieldValue, Record, TrainingBatch};
use polars::prelude::*;
use std::path::Path;

/// Load a tabular file and convert it to a training batch
pub fn load_batch(path: impl AsRef<Path>) -> Result<TrainingBatch> {
    let df = DataLoader::new().load_auto(path)?;
    batch_from_dataframe(&df)
}

/// Convert every row of `df` into a [`Record`], keeping all columns.
///
/// Nulls become [`FieldValue::Null`]; numeric columns become numbers, boolean
/// columns booleans, everything else text.
pub fn batch_from_dataframe(df: &DataFrame) -> Result<TrainingBatch> {
    let height = df.height();
    let mut records = vec![Record::new(); height];
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = column.name().to_string();
        let values = column_values(column.as_materialized_series())
            .map_err(|e| RiskError::DataError(format!("column '{}': {}", name, e)))?;
        if values.len() != height {
            return Err(RiskError::DataError(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                height
            )));
        }
        for (record, value) in records.iter_mut().zip(values) {
            record.insert(name.clone(), value);
        }
        columns.push(name);
    }

    Ok(TrainingBatch::new(columns, records))
}

fn column_values(series: &Series) -> PolarsResult<Vec<FieldValue>> {
    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Bool))
            .collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string())))
            .collect(),
        dtype if dtype.is_primitive_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Number))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string())))
            .collect(),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataframe_to_batch() {
        let df = df!(
            "CODE_GENDER" => [Some("M"), None, Some("F")],
            "AMT_INCOME_TOTAL" => [Some(100_000i64), Some(50_000), None],
            "FLAG_OWN_CAR" => [true, false, true],
        )
        .unwrap();

        let batch = batch_from_dataframe(&df).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.has_column("AMT_INCOME_TOTAL"));

        let first = &batch.records()[0];
        assert_eq!(first.get("CODE_GENDER"), Some(&FieldValue::Text("M".into())));
        assert_eq!(first.get("AMT_INCOME_TOTAL"), Some(&FieldValue::Number(100_000.0)));
        assert_eq!(first.get("FLAG_OWN_CAR"), Some(&FieldValue::Bool(true)));

        assert_eq!(batch.records()[1].get("CODE_GENDER"), Some(&FieldValue::Null));
        assert_eq!(batch.records()[2].get("AMT_INCOME_TOTAL"), Some(&FieldValue::Null));
    }
}
