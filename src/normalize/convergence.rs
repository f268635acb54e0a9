//! Fixed-point loop that alternates parameter re-estimation and rescaling.
//!
//! # Algorithm
//!
//! 1. Optionally z-score the whole matrix by its global mean and SD
//! 2. Fit initial row/column means (`alpha`, `beta`) and standard
//!    deviations around them (`tao`, `gamma`)
//! 3. Repeat: compute deltas against the initial scales, score them with
//!    the heuristic, and stop once two consecutive heuristics differ by
//!    less than `tolerance`; otherwise rescale with the initial estimates
//! 4. Give up after `max_iterations` rescales and keep the latest matrix

use crate::data::{DataMatrix, Deltas, ScaleParameters};
use crate::error::{Axis, Result, ScaleError};
use crate::normalize::rescale::rescale;
use crate::normalize::update::{compute_deltas, heuristic};
use crate::stats::{
    col_means, col_standard_deviations, global_mean, global_standard_deviation, row_means,
    row_standard_deviations,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What to do with a row or column whose standard deviation is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariancePolicy {
    /// Use a scale of 1.0 for that row/column and log a warning.
    #[default]
    Unit,
    /// Fail with `ScaleError::DegenerateScale`.
    Error,
}

/// Configuration for the normalization loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Maximum number of rescale steps (default: 1000).
    pub max_iterations: usize,
    /// Absolute difference between consecutive heuristics that counts as
    /// converged (default: 1e-9).
    pub tolerance: f64,
    /// Handling of zero-variance rows/columns in the initial fit.
    pub zero_variance: ZeroVariancePolicy,
    /// Z-score the whole matrix before fitting (default: false).
    pub standardize: bool,
    /// Return an error instead of the latest matrix when the cap is hit.
    pub fail_on_non_convergence: bool,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-9,
            zero_variance: ZeroVariancePolicy::Unit,
            standardize: false,
            fail_on_non_convergence: false,
        }
    }
}

impl ScaleConfig {
    /// Load from YAML string. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ScaleError::from)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ScaleError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ScaleError::InvalidParameter(
                "tolerance must be positive and finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of two-way normalization.
#[derive(Debug, Clone, Serialize)]
pub struct ScaledMatrix {
    /// The normalized data.
    #[serde(skip)]
    pub data: DataMatrix,
    /// Estimates from the initial fit, used for every rescale.
    pub initial: ScaleParameters,
    /// Deltas computed on `data`.
    pub deltas: Deltas,
    /// Heuristic value for each pass, in order.
    pub heuristics: Vec<f64>,
    /// Number of rescale steps applied.
    pub iterations: usize,
    /// Rescale step that produced `data`. Equals `iterations` when converged;
    /// otherwise the step whose heuristic changed least.
    pub selected_iteration: usize,
    /// Whether the heuristic settled within tolerance.
    pub converged: bool,
}

impl ScaledMatrix {
    /// Get the normalized value for a row and column.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col)
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.data.n_cols()
    }

    /// The most recent heuristic value.
    pub fn final_heuristic(&self) -> Option<f64> {
        self.heuristics.last().copied()
    }

    /// Serialize the run summary (everything but the matrix) as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ScaleError::from)
    }
}

/// Z-score every present cell by the global mean and standard deviation.
pub fn standardize(matrix: &DataMatrix) -> Result<DataMatrix> {
    let mean = global_mean(matrix)?;
    let sd = global_standard_deviation(matrix)?;
    if is_degenerate(sd, mean) {
        return Err(ScaleError::DegenerateScale {
            axis: Axis::Global,
            index: 0,
        });
    }
    Ok(matrix.map_present(|_, _, v| (v - mean) / sd))
}

/// Initial location and scale estimates: per-row/per-column means and
/// standard deviations around those means.
pub fn fit_initial(matrix: &DataMatrix, policy: ZeroVariancePolicy) -> Result<ScaleParameters> {
    let alpha = row_means(matrix)?;
    let beta = col_means(matrix)?;
    let tao = row_standard_deviations(matrix, &alpha)?;
    let gamma = col_standard_deviations(matrix, &beta)?;

    Ok(ScaleParameters {
        tao: resolve_scales(tao, &alpha, Axis::Row, policy)?,
        gamma: resolve_scales(gamma, &beta, Axis::Column, policy)?,
        alpha,
        beta,
    })
}

/// Normalize with the default configuration.
pub fn norm_scale2d(matrix: &DataMatrix) -> Result<ScaledMatrix> {
    norm_scale2d_with_config(matrix, &ScaleConfig::default())
}

/// Normalize with a custom configuration.
pub fn norm_scale2d_with_config(matrix: &DataMatrix, config: &ScaleConfig) -> Result<ScaledMatrix> {
    config.validate()?;

    let mut current = if config.standardize {
        standardize(matrix)?
    } else {
        matrix.clone()
    };
    let initial = fit_initial(&current, config.zero_variance)?;

    let mut heuristics = Vec::new();
    let mut previous: Option<f64> = None;
    let mut iterations = 0;
    // (heuristic change, step, matrix, deltas) of the steadiest pass so far
    let mut best: Option<(f64, usize, DataMatrix, Deltas)> = None;

    let (deltas, converged) = loop {
        // tao/gamma stay at their initial estimates; scale deltas only feed the heuristic.
        let deltas = compute_deltas(&current, &initial.tao, &initial.gamma)?;
        let h = heuristic(&deltas)?;
        heuristics.push(h);
        debug!(iteration = iterations, heuristic = h, "computed deltas");

        if !h.is_finite() {
            warn!(iteration = iterations, "heuristic is not finite; stopping");
            break (deltas, false);
        }
        if let Some(prev) = previous {
            let change = (prev - h).abs();
            if change < config.tolerance {
                break (deltas, true);
            }
            if best.as_ref().map_or(true, |(c, ..)| change < *c) {
                best = Some((change, iterations, current.clone(), deltas.clone()));
            }
        }
        if iterations >= config.max_iterations {
            break (deltas, false);
        }

        // Rescaling is anchored to the initial fit, not to the fresh deltas.
        let next = rescale(&current, &initial)?;
        if next.matrix().iter().any(|v| v.is_infinite()) {
            warn!(iteration = iterations, "rescaled values overflowed; stopping");
            break (deltas, false);
        }
        current = next;
        previous = Some(h);
        iterations += 1;
    };

    let last = heuristics.last().copied().unwrap_or(0.0);
    if !converged {
        if config.fail_on_non_convergence {
            return Err(ScaleError::DidNotConverge {
                iterations,
                last_heuristic: last,
            });
        }
    }

    let (data, deltas, selected_iteration) = match best {
        Some((_, step, matrix, best_deltas)) if !converged => (matrix, best_deltas, step),
        _ => (current, deltas, iterations),
    };
    if !converged {
        warn!(
            iterations,
            selected_iteration,
            heuristic = last,
            "did not converge; returning the steadiest matrix seen"
        );
    }
    info!(iterations, converged, heuristic = last, "normalization finished");

    Ok(ScaledMatrix {
        data,
        initial,
        deltas,
        heuristics,
        iterations,
        selected_iteration,
        converged,
    })
}

fn is_degenerate(sd: f64, center: f64) -> bool {
    sd == 0.0 || sd <= f64::EPSILON * center.abs()
}

fn resolve_scales(
    mut scales: Vec<f64>,
    centers: &[f64],
    axis: Axis,
    policy: ZeroVariancePolicy,
) -> Result<Vec<f64>> {
    for (index, scale) in scales.iter_mut().enumerate() {
        if is_degenerate(*scale, centers[index]) {
            match policy {
                ZeroVariancePolicy::Error => {
                    return Err(ScaleError::DegenerateScale { axis, index });
                }
                ZeroVariancePolicy::Unit => {
                    warn!(%axis, index, "zero variance; using unit scale");
                    *scale = 1.0;
                }
            }
        }
    }
    Ok(scales)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_matrix() -> DataMatrix {
        DataMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()
    }

    #[test]
    fn test_fit_initial() {
        let params = fit_initial(&create_test_matrix(), ZeroVariancePolicy::Error).unwrap();
        assert_eq!(params.alpha, vec![1.5, 3.5]);
        assert_eq!(params.beta, vec![2.0, 3.0]);
        assert_relative_eq!(params.tao[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(params.tao[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(params.gamma[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(params.gamma[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_one_iteration() {
        let config = ScaleConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let result = norm_scale2d_with_config(&create_test_matrix(), &config).unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.selected_iteration, 1);
        assert!(!result.converged);
        assert_eq!(result.heuristics.len(), 2);

        // Deltas on the input: alpha = [0.75, 1.75], beta = [1, 1.5],
        // tao = [sqrt(2.5), sqrt(12.5)], gamma = [sqrt(5), sqrt(10)]
        let ln2 = |x: f64| x.sqrt().ln().powi(2);
        let expected = 0.75_f64.powi(2) + 1.75_f64.powi(2) + 1.0 + 1.5_f64.powi(2)
            + ln2(2.5) + ln2(12.5) + ln2(5.0) + ln2(10.0);
        assert_relative_eq!(result.heuristics[0], expected, epsilon = 1e-8);

        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(result.get(i, j), -5.0, epsilon = 1e-8);
            }
        }

        // Deltas on the all -5 matrix
        assert_relative_eq!(result.deltas.alpha[0], -2.5, epsilon = 1e-8);
        assert_relative_eq!(result.deltas.tao[1], 5.0, epsilon = 1e-8);
        let expected = 4.0 * 6.25 + 4.0 * 5.0_f64.ln().powi(2);
        assert_relative_eq!(result.heuristics[1], expected, epsilon = 1e-8);
    }

    #[test]
    fn test_single_cell_converges_in_one_iteration() {
        let mat = DataMatrix::from_rows(&[vec![3.0]]).unwrap();
        let result = norm_scale2d(&mat).unwrap();

        assert!(result.converged);
        assert!(result.iterations <= 1);
        assert_relative_eq!(result.get(0, 0), -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_converges_to_fixed_point() {
        // Every tao[i] * gamma[j] exceeds 1, so rescaling contracts towards
        // m = -(alpha[i] + beta[j]) / (tao[i] * gamma[j] - 1).
        let mat = DataMatrix::from_rows(&[vec![1.0, 5.0], vec![9.0, 2.0]]).unwrap();
        let result = norm_scale2d(&mat).unwrap();

        assert!(result.converged);
        assert!(result.iterations < 100);

        let p = &result.initial;
        for i in 0..2 {
            for j in 0..2 {
                let s = p.tao[i] * p.gamma[j];
                let fixed = -(p.alpha[i] + p.beta[j]) / (s - 1.0);
                assert_relative_eq!(result.get(i, j), fixed, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_missing_cell_excluded() {
        let mat = DataMatrix::from_rows(&[vec![1.0, f64::NAN], vec![3.0, 4.0]]).unwrap();
        let config = ScaleConfig {
            max_iterations: 5,
            ..Default::default()
        };
        let result = norm_scale2d_with_config(&mat, &config).unwrap();

        assert_eq!(result.initial.alpha[0], 1.0);
        assert!(result.data.is_missing(0, 1));
        assert!(result.heuristics.iter().all(|h| !h.is_nan()));
    }

    #[test]
    fn test_zero_variance_policy() {
        let mat = DataMatrix::from_rows(&[vec![2.0, 2.0], vec![3.0, 5.0]]).unwrap();

        let params = fit_initial(&mat, ZeroVariancePolicy::Unit).unwrap();
        assert_eq!(params.tao[0], 1.0);

        assert!(matches!(
            fit_initial(&mat, ZeroVariancePolicy::Error),
            Err(ScaleError::DegenerateScale { axis: Axis::Row, index: 0 })
        ));
    }

    #[test]
    fn test_small_magnitude_rows_keep_their_spread() {
        let mat = DataMatrix::from_rows(&[vec![1e-17, 3e-17], vec![2e-17, 7e-17]]).unwrap();

        let params = fit_initial(&mat, ZeroVariancePolicy::Error).unwrap();
        assert_relative_eq!(params.tao[0], 1e-17, max_relative = 1e-9);
        assert_relative_eq!(params.tao[1], 2.5e-17, max_relative = 1e-9);

        let unit = fit_initial(&mat, ZeroVariancePolicy::Unit).unwrap();
        assert_eq!(unit.tao, params.tao);
    }

    #[test]
    fn test_empty_row_fails_run() {
        let mat = DataMatrix::from_rows(&[vec![f64::NAN, f64::NAN], vec![3.0, 4.0]]).unwrap();
        assert!(matches!(
            norm_scale2d(&mat),
            Err(ScaleError::EmptyAggregate { axis: Axis::Row, index: 0 })
        ));
    }

    #[test]
    fn test_fail_on_non_convergence() {
        let config = ScaleConfig {
            max_iterations: 3,
            fail_on_non_convergence: true,
            ..Default::default()
        };
        assert!(matches!(
            norm_scale2d_with_config(&create_test_matrix(), &config),
            Err(ScaleError::DidNotConverge { iterations: 3, .. })
        ));
    }

    #[test]
    fn test_divergent_run_returns_steadiest_matrix() {
        // Heuristic changes grow every pass, so the first rescale (all -5) is
        // the steadiest state and the loop stops once the heuristic overflows.
        let result = norm_scale2d(&create_test_matrix()).unwrap();
        assert!(!result.converged);
        assert!(result.iterations < 1000);
        assert!(result.final_heuristic().unwrap().is_infinite());

        assert_eq!(result.selected_iteration, 1);
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(result.get(i, j), -5.0, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(result.deltas.alpha[0], -2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_converged_run_returns_latest_matrix() {
        let mat = DataMatrix::from_rows(&[vec![1.0, 5.0], vec![9.0, 2.0]]).unwrap();
        let result = norm_scale2d(&mat).unwrap();
        assert!(result.converged);
        assert_eq!(result.selected_iteration, result.iterations);
    }

    #[test]
    fn test_standardize_option() {
        let config = ScaleConfig {
            standardize: true,
            max_iterations: 1,
            ..Default::default()
        };
        let result = norm_scale2d_with_config(&create_test_matrix(), &config).unwrap();
        let sd = 1.25_f64.sqrt();
        assert_relative_eq!(result.initial.alpha[0], -1.0 / sd, epsilon = 1e-12);
        assert_relative_eq!(result.initial.beta[1], 0.5 / sd, epsilon = 1e-12);
    }

    #[test]
    fn test_standardize_constant_matrix() {
        let mat = DataMatrix::from_rows(&[vec![4.0, 4.0]]).unwrap();
        assert!(matches!(
            standardize(&mat),
            Err(ScaleError::DegenerateScale { axis: Axis::Global, .. })
        ));
    }

    #[test]
    fn test_config_yaml() {
        let config = ScaleConfig::from_yaml("max_iterations: 50\nzero_variance: error\n").unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.zero_variance, ZeroVariancePolicy::Error);
        assert_eq!(config.tolerance, 1e-9);

        let yaml = config.to_yaml().unwrap();
        let reloaded = ScaleConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reloaded.max_iterations, 50);

        assert!(ScaleConfig::from_yaml("tolerance: -1.0\n").is_err());
    }

    #[test]
    fn test_report_json() {
        let result = norm_scale2d(&DataMatrix::from_rows(&[vec![3.0]]).unwrap()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["converged"], serde_json::Value::Bool(true));
        assert!(json.get("data").is_none());
        assert_eq!(json["initial"]["alpha"][0], 3.0);
    }
}
