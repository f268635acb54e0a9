//! Location/scale transform applied to every present cell.

use crate::data::{DataMatrix, ScaleParameters};
use crate::error::Result;

/// Remove row and column effects from a matrix.
///
/// Each present cell becomes `(m[i][j] - alpha[i] - beta[j]) / gamma[j] / tao[i]`.
/// Missing cells stay missing and the input is left untouched.
pub fn rescale(matrix: &DataMatrix, params: &ScaleParameters) -> Result<DataMatrix> {
    params.check_shape(matrix.n_rows(), matrix.n_cols())?;
    Ok(matrix.map_present(|i, j, v| {
        (v - params.alpha[i] - params.beta[j]) / params.gamma[j] / params.tao[i]
    }))
}
