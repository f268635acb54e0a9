//! Location and scale parameter vectors.

use crate::error::{Result, ScaleError};
use serde::{Deserialize, Serialize};

/// Row and column location/scale estimates for a matrix.
///
/// `alpha` and `tao` hold one entry per row, `beta` and `gamma` one
/// entry per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParameters {
    /// Row locations.
    pub alpha: Vec<f64>,
    /// Column locations.
    pub beta: Vec<f64>,
    /// Row scales.
    pub tao: Vec<f64>,
    /// Column scales.
    pub gamma: Vec<f64>,
}

impl ScaleParameters {
    /// Number of rows these parameters describe.
    pub fn n_rows(&self) -> usize {
        self.alpha.len()
    }

    /// Number of columns these parameters describe.
    pub fn n_cols(&self) -> usize {
        self.beta.len()
    }

    /// Check vector lengths against a matrix shape.
    pub fn check_shape(&self, n_rows: usize, n_cols: usize) -> Result<()> {
        for (len, expected) in [
            (self.alpha.len(), n_rows),
            (self.tao.len(), n_rows),
            (self.beta.len(), n_cols),
            (self.gamma.len(), n_cols),
        ] {
            if len != expected {
                return Err(ScaleError::DimensionMismatch {
                    expected,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

/// Per-iteration parameter changes produced by the update engine.
pub type Deltas = ScaleParameters;
