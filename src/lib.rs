//! Two-Way Location/Scale Normalization Library
//!
//! This library normalizes a numeric table with missing entries by
//! iteratively estimating and removing row and column location (additive)
//! and scale (multiplicative) effects until the estimates stop changing.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (DataMatrix, ScaleParameters) and CSV I/O
//! - **stats**: Missing-value-aware mean and standard deviation
//! - **normalize**: Parameter updates, rescaling and the convergence loop
//! - **profile**: Missing-value profiling
//!
//! # Example
//!
//! ```no_run
//! use scale2d::prelude::*;
//!
//! let matrix = DataMatrix::from_csv("data.csv").unwrap();
//! let result = norm_scale2d_with_config(&matrix, &ScaleConfig::default()).unwrap();
//! result.data.to_csv("convergence.csv").unwrap();
//! ```

pub mod data;
pub mod error;
pub mod normalize;
pub mod profile;
pub mod stats;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        format_significant, DataMatrix, Deltas, MalformedPolicy, ReadOptions, ScaleParameters,
        WriteOptions,
    };
    pub use crate::error::{Axis, Result, ScaleError, ScaleParameter};
    pub use crate::normalize::{
        compute_deltas, fit_initial, heuristic, norm_scale2d, norm_scale2d_with_config, rescale,
        standardize, ScaleConfig, ScaledMatrix, ZeroVariancePolicy,
    };
    pub use crate::profile::{profile_missing, MissingProfile};
    pub use crate::stats::{
        col_means, col_standard_deviations, global_mean, global_standard_deviation, mean,
        row_means, row_standard_deviations, standard_deviation,
    };
}
