//! Mean and standard deviation over the present cells of a matrix.

use crate::data::DataMatrix;
use crate::error::{Axis, Result, ScaleError};
use rayon::prelude::*;

/// Mean of the non-missing values, or `None` if every value is missing.
pub fn mean(values: &[f64]) -> Option<f64> {
    masked_mean(values.iter().copied())
}

/// Population standard deviation of the non-missing values around `center`.
///
/// Returns `None` if every value is missing.
pub fn standard_deviation(values: &[f64], center: f64) -> Option<f64> {
    masked_sd(values.iter().copied(), center)
}

/// Mean over every non-missing cell of the matrix.
pub fn global_mean(matrix: &DataMatrix) -> Result<f64> {
    masked_mean(matrix.matrix().iter().copied()).ok_or(ScaleError::EmptyAggregate {
        axis: Axis::Global,
        index: 0,
    })
}

/// Standard deviation over every non-missing cell, around the global mean.
pub fn global_standard_deviation(matrix: &DataMatrix) -> Result<f64> {
    let center = global_mean(matrix)?;
    masked_sd(matrix.matrix().iter().copied(), center).ok_or(ScaleError::EmptyAggregate {
        axis: Axis::Global,
        index: 0,
    })
}

/// Mean of each row.
pub fn row_means(matrix: &DataMatrix) -> Result<Vec<f64>> {
    let data = matrix.matrix();
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            masked_mean(data.row(i).iter().copied())
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Row, index: i })
        })
        .collect()
}

/// Mean of each column.
pub fn col_means(matrix: &DataMatrix) -> Result<Vec<f64>> {
    let data = matrix.matrix();
    (0..matrix.n_cols())
        .into_par_iter()
        .map(|j| {
            masked_mean(data.column(j).iter().copied())
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Column, index: j })
        })
        .collect()
}

/// Standard deviation of each row around the matching entry of `centers`.
pub fn row_standard_deviations(matrix: &DataMatrix, centers: &[f64]) -> Result<Vec<f64>> {
    check_len(centers, matrix.n_rows())?;
    let data = matrix.matrix();
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            masked_sd(data.row(i).iter().copied(), centers[i])
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Row, index: i })
        })
        .collect()
}

/// Standard deviation of each column around the matching entry of `centers`.
pub fn col_standard_deviations(matrix: &DataMatrix, centers: &[f64]) -> Result<Vec<f64>> {
    check_len(centers, matrix.n_cols())?;
    let data = matrix.matrix();
    (0..matrix.n_cols())
        .into_par_iter()
        .map(|j| {
            masked_sd(data.column(j).iter().copied(), centers[j])
                .ok_or(ScaleError::EmptyAggregate { axis: Axis::Column, index: j })
        })
        .collect()
}

fn check_len(centers: &[f64], expected: usize) -> Result<()> {
    if centers.len() != expected {
        return Err(ScaleError::DimensionMismatch {
            expected,
            actual: centers.len(),
        });
    }
    Ok(())
}

fn masked_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn masked_sd(values: impl Iterator<Item = f64>, center: f64) -> Option<f64> {
    masked_mean(values.map(|v| (v - center) * (v - center))).map(f64::sqrt)
}
