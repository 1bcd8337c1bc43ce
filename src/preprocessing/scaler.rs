//! Min-max feature scaling

use crate::error::{Result, RiskError};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub min: f64,
    pub max: f64,
}

impl ScalerParams {
    /// `(x - min) / (max - min)`, clamped to `[0, 1]`
    #[inline]
    pub fn scale(&self, x: f64) -> f64 {
        ((x - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Fitted scaler state, one entry per encoded column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    columns: Vec<String>,
    params: Vec<ScalerParams>,
}

impl ScalerState {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn n_columns(&self) -> usize {
        self.params.len()
    }

    /// Scale one encoded row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.params)
            .map(|(&x, p)| p.scale(x))
            .collect())
    }

    /// Scale an encoded matrix
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        let mut scaled = x.clone();
        for (mut column, params) in scaled.axis_iter_mut(Axis(1)).zip(&self.params) {
            column.mapv_inplace(|v| params.scale(v));
        }
        Ok(scaled)
    }

    /// Check the parameters are usable (finite, non-degenerate range)
    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != self.params.len() {
            return Err(RiskError::ScalerError(format!(
                "{} column names for {} parameter sets",
                self.columns.len(),
                self.params.len()
            )));
        }
        for (name, p) in self.columns.iter().zip(&self.params) {
            if !p.min.is_finite() || !p.max.is_finite() || p.max <= p.min {
                return Err(RiskError::ScalerError(format!(
                    "column '{}' has an unusable range [{}, {}]",
                    name, p.min, p.max
                )));
            }
        }
        Ok(())
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.params.len() {
            return Err(RiskError::ScalerError(format!(
                "expected {} columns, got {}",
                self.params.len(),
                width
            )));
        }
        Ok(())
    }
}

/// Fits [`ScalerState`] from an encoded training matrix
pub struct MinMaxScaler;

impl MinMaxScaler {
    /// Record per-column (min, max). Fails on an empty matrix or a constant
    /// column; constant columns are expected to be pruned from the schema
    /// before this point.
    pub fn fit(x: &Array2<f64>, columns: &[String]) -> Result<ScalerState> {
        if x.nrows() == 0 {
            return Err(RiskError::ScalerError("cannot fit on zero rows".to_string()));
        }
        if columns.len() != x.ncols() {
            return Err(RiskError::ScalerError(format!(
                "{} column names for a matrix with {} columns",
                columns.len(),
                x.ncols()
            )));
        }

        let params = x
            .axis_iter(Axis(1))
            .zip(columns)
            .map(|(column, name)| {
                let (min, max) = column_range(column);
                if max == min {
                    return Err(RiskError::ScalerError(format!(
                        "column '{}' is constant ({}), range is zero",
                        name, min
                    )));
                }
                Ok(ScalerParams { min, max })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ScalerState {
            columns: columns.to_vec(),
            params,
        })
    }
}

/// (min, max) of a column
pub(crate) fn column_range(column: ArrayView1<f64>) -> (f64, f64) {
    column
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    #[test]
    fn test_minmax_range() {
        let x = array![[1.0, 10.0], [3.0, 20.0], [5.0, 30.0]];
        let state = MinMaxScaler::fit(&x, &names(2)).unwrap();
        let scaled = state.transform(&x).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let x = array![[10000.0], [500000.0]];
        let state = MinMaxScaler::fit(&x, &["CREDIT_AMOUNT".to_string()]).unwrap();
        assert_eq!(state.transform_row(&[600000.0]).unwrap(), vec![1.0]);
        assert_eq!(state.transform_row(&[-500.0]).unwrap(), vec![0.0]);
        assert_eq!(state.transform_row(&[5_000_000.0]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_constant_column_rejected() {
        let x = array![[1.0, 2.0], [1.0, 3.0]];
        let err = MinMaxScaler::fit(&x, &names(2)).unwrap_err();
        assert!(matches!(err, RiskError::ScalerError(_)));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let x = array![[1.0, 2.0], [2.0, 3.0]];
        let state = MinMaxScaler::fit(&x, &names(2)).unwrap();
        assert!(state.transform_row(&[1.0]).is_err());
        assert!(MinMaxScaler::fit(&Array2::zeros((0, 2)), &names(2)).is_err());
    }

    #[test]
    fn test_row_and_matrix_agree() {
        let x = array![[1.0, -4.0], [9.0, 4.0], [5.0, 0.0]];
        let state = MinMaxScaler::fit(&x, &names(2)).unwrap();
        let matrix = state.transform(&x).unwrap();
        for i in 0..x.nrows() {
            let row = state.transform_row(x.row(i).as_slice().unwrap()).unwrap();
            assert_eq!(matrix.row(i).to_vec(), row);
        }
    }
}
