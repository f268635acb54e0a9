//! Dense numeric table with NaN-encoded missing values.

use crate::error::{Result, ScaleError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// How to treat a field that is present but does not parse as a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Fail with `ScaleError::MalformedField`.
    #[default]
    Error,
    /// Substitute the missing sentinel.
    Missing,
    /// Substitute zero (legacy behaviour).
    Zero,
}

/// Options for reading a delimited table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Field delimiter byte (default: `,`).
    pub delimiter: u8,
    /// Whether the first record is a header to be discarded from the data.
    pub has_header: bool,
    /// Policy for unparseable fields.
    pub malformed: MalformedPolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            malformed: MalformedPolicy::Error,
        }
    }
}

/// Options for writing a delimited table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Field delimiter byte (default: `,`).
    pub delimiter: u8,
    /// Significant digits per cell (default: 8).
    pub significant_digits: usize,
    /// Write the header row back out if the matrix carries one.
    pub write_header: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            significant_digits: 8,
            write_header: false,
        }
    }
}

/// A rectangular table of `f64` values where NaN marks a missing cell.
///
/// Rows and columns carry no identifiers beyond an optional header, which
/// is kept so the table can be written back in the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    data: DMatrix<f64>,
    header: Option<Vec<String>>,
}

impl DataMatrix {
    /// Wrap a dense matrix. NaN cells are treated as missing.
    pub fn new(data: DMatrix<f64>) -> Self {
        Self { data, header: None }
    }

    /// Build a matrix from row vectors, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_rows = rows.len();
        if n_rows == 0 {
            return Err(ScaleError::EmptyData("No rows in table".to_string()));
        }
        let n_cols = rows[0].len();
        if n_cols == 0 {
            return Err(ScaleError::EmptyData("No columns in table".to_string()));
        }
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(ScaleError::RaggedRow {
                    row: row_idx,
                    expected: n_cols,
                    actual: row.len(),
                });
            }
        }
        let data = DMatrix::from_fn(n_rows, n_cols, |i, j| rows[i][j]);
        Ok(Self::new(data))
    }

    /// Attach column names, which must match the number of columns.
    pub fn with_header(mut self, header: Vec<String>) -> Result<Self> {
        if header.len() != self.n_cols() {
            return Err(ScaleError::DimensionMismatch {
                expected: self.n_cols(),
                actual: header.len(),
            });
        }
        self.header = Some(header);
        Ok(self)
    }

    /// Load a comma-separated table with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_with_options(path, &ReadOptions::default())
    }

    /// Load a delimited table from a file.
    pub fn from_csv_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ScaleError::InputUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, options)
    }

    /// Parse a delimited table from any reader.
    ///
    /// Empty fields become missing. Fields that fail to parse (or parse to
    /// an infinity) are handled according to `options.malformed`.
    pub fn from_reader<R: Read>(reader: R, options: &ReadOptions) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header = if options.has_header {
            Some(
                csv_reader
                    .headers()?
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };

        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .enumerate()
                .map(|(col_idx, field)| parse_field(field, row_idx, col_idx, options.malformed))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }

        let matrix = Self::from_rows(&rows)?;
        match header {
            Some(names) => matrix.with_header(names),
            None => Ok(matrix),
        }
    }

    /// Write the table as comma-separated values with 8 significant digits.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_csv_with_options(path, &WriteOptions::default())
    }

    /// Write the table to a file. Any failure is wrapped in `OutputWrite`.
    pub fn to_csv_with_options<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        let wrap = |source: ScaleError| ScaleError::OutputWrite {
            path: path.to_path_buf(),
            source: Box::new(source),
        };
        let file = File::create(path).map_err(|e| wrap(e.into()))?;
        self.to_writer(BufWriter::new(file), options).map_err(wrap)
    }

    /// Serialize the table to any writer. Missing cells are written as empty fields.
    pub fn to_writer<W: Write>(&self, writer: W, options: &WriteOptions) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);

        if options.write_header {
            if let Some(header) = &self.header {
                csv_writer.write_record(header)?;
            }
        }

        for i in 0..self.n_rows() {
            let record: Vec<String> = self
                .data
                .row(i)
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        String::new()
                    } else {
                        format_significant(v, options.significant_digits)
                    }
                })
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col); NaN when missing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Whether the cell at (row, col) is missing.
    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.data[(row, col)].is_nan()
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    /// Number of missing cells.
    pub fn n_missing(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Column names, if the table was read with a header.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Get a row as a vector (missing cells stay NaN).
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().cloned().collect()
    }

    /// Get a column as a vector (missing cells stay NaN).
    pub fn col(&self, col: usize) -> Vec<f64> {
        self.data.column(col).iter().cloned().collect()
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Apply `f` to every non-missing cell, keeping shape, header and missing cells.
    pub fn map_present<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, usize, f64) -> f64,
    {
        let data = DMatrix::from_fn(self.n_rows(), self.n_cols(), |i, j| {
            let v = self.data[(i, j)];
            if v.is_nan() {
                v
            } else {
                f(i, j, v)
            }
        });
        Self {
            data,
            header: self.header.clone(),
        }
    }
}

fn parse_field(field: &str, row: usize, col: usize, policy: MalformedPolicy) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    match field.parse::<f64>() {
        Ok(v) if !v.is_infinite() => Ok(v),
        _ => match policy {
            MalformedPolicy::Error => Err(ScaleError::MalformedField {
                value: field.to_string(),
                row,
                col,
            }),
            MalformedPolicy::Missing => Ok(f64::NAN),
            MalformedPolicy::Zero => Ok(0.0),
        },
    }
}

/// Format a float with `digits` significant digits, like C's `%g`.
///
/// Scientific notation is used when the decimal exponent is below -4 or
/// at least `digits`; trailing zeros are removed in both forms.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
