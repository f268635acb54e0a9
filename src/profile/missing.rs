//! Missing-value profiling for data matrices.

use crate::data::DataMatrix;
use serde::{Deserialize, Serialize};

/// Profile of missing cells in a matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingProfile {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// Total number of cells (rows × columns).
    pub total_entries: usize,
    /// Number of missing cells.
    pub missing_entries: usize,
    /// Proportion of missing cells.
    pub missing_fraction: f64,
    /// Missing cells per row.
    pub row_missing: Vec<usize>,
    /// Missing cells per column.
    pub col_missing: Vec<usize>,
    /// Rows with no present cell.
    pub empty_rows: Vec<usize>,
    /// Columns with no present cell.
    pub empty_cols: Vec<usize>,
}

impl MissingProfile {
    /// Every row and column has at least one present cell.
    pub fn is_normalizable(&self) -> bool {
        self.empty_rows.is_empty() && self.empty_cols.is_empty()
    }
}

impl std::fmt::Display for MissingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Missing Value Profile")?;
        writeln!(f, "  Dimensions:       {} rows x {} columns", self.n_rows, self.n_cols)?;
        writeln!(f, "  Total entries:    {}", self.total_entries)?;
        writeln!(f, "  Missing entries:  {}", self.missing_entries)?;
        writeln!(f, "  Missing fraction: {:.2}%", self.missing_fraction * 100.0)?;
        writeln!(f, "  Empty rows:       {:?}", self.empty_rows)?;
        writeln!(f, "  Empty columns:    {:?}", self.empty_cols)?;
        writeln!(
            f,
            "  Normalizable:     {}",
            if self.is_normalizable() { "yes" } else { "no" }
        )?;
        Ok(())
    }
}

/// Profile the missing cells of a matrix.
pub fn profile_missing(matrix: &DataMatrix) -> MissingProfile {
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    let total_entries = n_rows * n_cols;

    let mut row_missing = vec![0usize; n_rows];
    let mut col_missing = vec![0usize; n_cols];
    for i in 0..n_rows {
        for j in 0..n_cols {
            if matrix.is_missing(i, j) {
                row_missing[i] += 1;
                col_missing[j] += 1;
            }
        }
    }

    let missing_entries: usize = row_missing.iter().sum();
    let missing_fraction = if total_entries == 0 {
        0.0
    } else {
        missing_entries as f64 / total_entries as f64
    };

    let empty_rows = (0..n_rows).filter(|&i| row_missing[i] == n_cols).collect();
    let empty_cols = (0..n_cols).filter(|&j| col_missing[j] == n_rows).collect();

    MissingProfile {
        n_rows,
        n_cols,
        total_entries,
        missing_entries,
        missing_fraction,
        row_missing,
        col_missing,
        empty_rows,
        empty_cols,
    }
}
