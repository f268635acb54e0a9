//! Error types for the scale2d library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The axis an aggregate was computed along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Column,
    Global,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Column => write!(f, "column"),
            Axis::Global => write!(f, "matrix"),
        }
    }
}

/// Which of the two scale vectors a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleParameter {
    Tao,
    Gamma,
}

impl fmt::Display for ScaleParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleParameter::Tao => write!(f, "tao"),
            ScaleParameter::Gamma => write!(f, "gamma"),
        }
    }
}

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("Cannot read input '{}': {source}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed numeric field '{value}' at row {row}, column {col}")]
    MalformedField {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Ragged input: row {row} has {actual} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No non-missing values in {axis} {index}")]
    EmptyAggregate { axis: Axis, index: usize },

    #[error("Zero variance in {axis} {index}; scale is undefined")]
    DegenerateScale { axis: Axis, index: usize },

    #[error("Non-positive {parameter} delta {value} at index {index}")]
    NonPositiveScale {
        parameter: ScaleParameter,
        index: usize,
        value: f64,
    },

    #[error("Did not converge after {iterations} iterations (last heuristic {last_heuristic})")]
    DidNotConverge {
        iterations: usize,
        last_heuristic: f64,
    },

    #[error("Cannot write output '{}': {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: Box<ScaleError>,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, ScaleError>;
