//! Parameter update equations and the convergence heuristic.

use crate::data::{DataMatrix, Deltas};
use crate::error::{Axis, Result, ScaleError, ScaleParameter};
use rayon::prelude::*;

/// Location delta for each row.
///
/// For row i: the sum of its present cells divided by the sum over the same
/// cells of `gamma[j] / tao[i]`.
pub fn alpha_deltas(matrix: &DataMatrix, tao: &[f64], gamma: &[f64]) -> Result<Vec<f64>> {
    check_scales(matrix, tao, gamma)?;
    let data = matrix.matrix();
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            let (sum, weight, count) = data
                .row(i)
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .fold((0.0, 0.0, 0usize), |(sum, weight, count), (j, &v)| {
                    (sum + v, weight + gamma[j] / tao[i], count + 1)
                });
            if count == 0 {
                return Err(ScaleError::EmptyAggregate { axis: Axis::Row, index: i });
            }
            Ok(sum / weight)
        })
        .collect()
}

/// Location delta for each column, weighted like [`alpha_deltas`].
pub fn beta_deltas(matrix: &DataMatrix, tao: &[f64], gamma: &[f64]) -> Result<Vec<f64>> {
    check_scales(matrix, tao, gamma)?;
    let data = matrix.matrix();
    (0..matrix.n_cols())
        .into_par_iter()
        .map(|j| {
            let (sum, weight, count) = data
                .column(j)
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .fold((0.0, 0.0, 0usize), |(sum, weight, count), (i, &v)| {
                    (sum + v, weight + gamma[j] / tao[i], count + 1)
                });
            if count == 0 {
                return Err(ScaleError::EmptyAggregate { axis: Axis::Column, index: j });
            }
            Ok(sum / weight)
        })
        .collect()
}

/// Scale delta for each row: the root-mean-square of its present cells.
pub fn tao_deltas(matrix: &DataMatrix) -> Result<Vec<f64>> {
    let data = matrix.matrix();
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            root_mean_square(data.row(i).iter().copied())
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Row, index: i })
        })
        .collect()
}

/// Scale delta for each column: the root-mean-square of its present cells.
pub fn gamma_deltas(matrix: &DataMatrix) -> Result<Vec<f64>> {
    let data = matrix.matrix();
    (0..matrix.n_cols())
        .into_par_iter()
        .map(|j| {
            root_mean_square(data.column(j).iter().copied())
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Column, index: j })
        })
        .collect()
}

/// Compute all four deltas for one iteration.
pub fn compute_deltas(matrix: &DataMatrix, tao: &[f64], gamma: &[f64]) -> Result<Deltas> {
    Ok(Deltas {
        alpha: alpha_deltas(matrix, tao, gamma)?,
        beta: beta_deltas(matrix, tao, gamma)?,
        tao: tao_deltas(matrix)?,
        gamma: gamma_deltas(matrix)?,
    })
}

/// Scalar convergence signal for a set of deltas.
///
/// Sum of squared location deltas plus sum of squared log scale deltas.
/// Every scale delta must be strictly positive.
pub fn heuristic(deltas: &Deltas) -> Result<f64> {
    let location: f64 = deltas
        .alpha
        .iter()
        .chain(deltas.beta.iter())
        .map(|v| v * v)
        .sum();

    let mut log_scale = 0.0;
    for (parameter, values) in [
        (ScaleParameter::Gamma, &deltas.gamma),
        (ScaleParameter::Tao, &deltas.tao),
    ] {
        for (index, &value) in values.iter().enumerate() {
            if value.is_nan() || value <= 0.0 {
                return Err(ScaleError::NonPositiveScale {
                    parameter,
                    index,
                    value,
                });
            }
            let ln = value.ln();
            log_scale += ln * ln;
        }
    }

    Ok(location + log_scale)
}

fn root_mean_square(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v * v, count + 1));
    (count > 0).then(|| (sum / count as f64).sqrt())
}

fn check_scales(matrix: &DataMatrix, tao: &[f64], gamma: &[f64]) -> Result<()> {
    if tao.len() != matrix.n_rows() {
        return Err(ScaleError::DimensionMismatch {
            expected: matrix.n_rows(),
            actual: tao.len(),
        });
    }
    if gamma.len() != matrix.n_cols() {
        return Err(ScaleError::DimensionMismatch {
            expected: matrix.n_cols(),
            actual: gamma.len(),
        });
    }
    Ok(())
}
