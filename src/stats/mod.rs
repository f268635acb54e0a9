//! Missing-value-aware summary statistics.
//!
//! Every statistic here skips NaN cells instead of propagating them.

mod dispersion;

pub use dispersion::{
    col_means, col_standard_deviations, global_mean, global_standard_deviation, mean,
    row_means, row_standard_deviations, standard_deviation,
};
