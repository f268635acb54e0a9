//! Data structures for two-way normalization.

mod matrix;
mod params;

pub use matrix::{format_significant, DataMatrix, MalformedPolicy, ReadOptions, WriteOptions};
pub use params::{Deltas, ScaleParameters};
