//! Two-way location/scale normalization.
//!
//! - **update**: per-iteration deltas for `alpha`, `beta`, `tao`, `gamma`
//!   and the convergence heuristic
//! - **rescale**: the stateless location/scale transform
//! - **convergence**: the fixed-point loop and its configuration

pub mod convergence;
pub mod rescale;
pub mod update;

pub use convergence::{
    fit_initial, norm_scale2d, norm_scale2d_with_config, standardize, ScaleConfig, ScaledMatrix,
    ZeroVariancePolicy,
};
pub use rescale::rescale;
pub use update::{alpha_deltas, beta_deltas, compute_deltas, gamma_deltas, heuristic, tao_deltas};
