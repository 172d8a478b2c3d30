use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::schema::{FEATURE_NAMES, N_FEATURES, ZERO_SENTINEL_COLUMNS};

/// training-time medians for the columns where zero means "not measured"
///
/// fitted once on the raw training table, persisted with the other
/// artifacts, and reapplied to every serving request so a sentinel zero
/// is treated the same way it was during training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationTable {
    medians: Vec<(usize, f64)>, // (column index, median of non-zero values)
}

impl ImputationTable {
    /// compute the median of the non-zero values of each designated column
    pub fn fit(features: ArrayView2<'_, f64>) -> Result<Self> {
        if features.ncols() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "expected {} columns, got {}",
                N_FEATURES,
                features.ncols()
            )));
        }

        let mut medians = Vec::with_capacity(ZERO_SENTINEL_COLUMNS.len());

        for &col in ZERO_SENTINEL_COLUMNS.iter() {
            let mut observed: Vec<f64> = features
                .column(col)
                .iter()
                .copied()
                .filter(|&v| v != 0.0)
                .collect();

            if observed.is_empty() {
                return Err(RiskError::invalid_dataset(format!(
                    "column {} has no measured (non-zero) values to impute from",
                    FEATURE_NAMES[col]
                )));
            }

            observed.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mid = observed.len() / 2;
            let median = if observed.len() % 2 == 0 {
                (observed[mid - 1] + observed[mid]) / 2.0
            } else {
                observed[mid]
            };

            medians.push((col, median));
        }

        Ok(Self { medians })
    }

    /// replace sentinel zeros in the designated columns; other columns
    /// (and legitimate zeros like pregnancies = 0) pass through untouched
    pub fn apply(&self, features: &mut Array2<f64>) {
        for &(col, median) in &self.medians {
            for value in features.column_mut(col).iter_mut() {
                if *value == 0.0 {
                    *value = median;
                }
            }
        }
    }

    /// same substitution for a single serving-time row
    pub fn apply_row(&self, row: &mut Array1<f64>) -> Result<()> {
        if row.len() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "expected {} feature values, got {}",
                N_FEATURES,
                row.len()
            )));
        }

        for &(col, median) in &self.medians {
            if row[col] == 0.0 {
                row[col] = median;
            }
        }
        Ok(())
    }

    pub fn medians(&self) -> &[(usize, f64)] {
        &self.medians
    }
}

/// fitted standardization parameters, one (mean, std) pair per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaler {
    /// compute per-column mean and population standard deviation
    /// over the training split only
    pub fn fit(features: ArrayView2<'_, f64>) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(RiskError::invalid_dataset("cannot fit scaler on no rows"));
        }

        let means = features
            .mean_axis(Axis(0))
            .ok_or_else(|| RiskError::numerical_error("mean computation failed"))?;
        let stds = features.std_axis(Axis(0), 0.0);

        Ok(Self {
            means: means.to_vec(),
            stds: stds.to_vec(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// standardize a matrix column-by-column: (x - mean) / std
    ///
    /// a zero-variance column maps to 0.0 instead of dividing by zero
    pub fn transform(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(RiskError::invalid_dimensions(format!(
                "scaler fitted on {} columns, input has {}",
                self.n_features(),
                features.ncols()
            )));
        }

        let mut out = features.to_owned();
        for j in 0..self.n_features() {
            let mean = self.means[j];
            let std = self.stds[j];
            for value in out.column_mut(j).iter_mut() {
                *value = if std == 0.0 { 0.0 } else { (*value - mean) / std };
            }
        }
        Ok(out)
    }

    /// standardize one serving-time row
    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if row.len() != self.n_features() {
            return Err(RiskError::invalid_dimensions(format!(
                "scaler fitted on {} columns, row has {}",
                self.n_features(),
                row.len()
            )));
        }

        let mut out = row.to_owned();
        for j in 0..self.n_features() {
            let std = self.stds[j];
            out[j] = if std == 0.0 {
                0.0
            } else {
                (out[j] - self.means[j]) / std
            };
        }
        Ok(out)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}
