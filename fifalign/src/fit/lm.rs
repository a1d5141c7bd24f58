//! Levenberg-Marquardt optimizer for 1D profile fitting.
//!
//! Generic over [`FitModel`], used by both marginal-sum centroiders.
//! Uses f64 throughout.

use serde::{Deserialize, Serialize};

use super::models::FitModel;
use crate::error::FitFailure;
use crate::math::{invert, solve};

/// Upper bound on iterations regardless of configuration.
pub const MAX_ITERATION_CEILING: usize = 10_000;

/// Damping beyond this means no downhill step exists at float precision.
const MAX_LAMBDA: f64 = 1e16;

/// Configuration for Levenberg-Marquardt optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum iterations, clamped to [`MAX_ITERATION_CEILING`].
    pub max_iterations: usize,
    /// Relative parameter-step tolerance.
    pub xtol: f64,
    /// Relative chi-squared reduction tolerance.
    pub ftol: f64,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Factor to increase lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on an accepted step.
    pub lambda_down: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            xtol: 1e-10,
            ftol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) {
        assert!(self.max_iterations > 0, "max_iterations must be positive");
        assert!(self.xtol > 0.0, "xtol must be positive");
        assert!(self.ftol >= 0.0, "ftol must be non-negative");
        assert!(self.initial_lambda > 0.0, "initial_lambda must be positive");
        assert!(self.lambda_up > 1.0, "lambda_up must be greater than 1");
        assert!(
            self.lambda_down > 0.0 && self.lambda_down < 1.0,
            "lambda_down must be in (0, 1)"
        );
    }

    #[inline]
    pub fn iteration_cap(&self) -> usize {
        self.max_iterations.min(MAX_ITERATION_CEILING)
    }
}

/// Result of a converged fit.
#[derive(Debug, Clone, Copy)]
pub struct FitResult<const N: usize> {
    pub params: [f64; N],
    pub chi2: f64,
    pub iterations: usize,
    /// `s² (JᵀJ)⁻¹` with `s² = χ² / (n − N)`; absent when `n ≤ N` or `JᵀJ`
    /// is singular at the solution.
    pub covariance: Option<[[f64; N]; N]>,
}

impl<const N: usize> FitResult<N> {
    /// One-sigma uncertainty of parameter `index`.
    pub fn std_error(&self, index: usize) -> Option<f64> {
        self.covariance
            .map(|cov| cov[index][index].max(0.0).sqrt())
            .filter(|e| e.is_finite())
    }
}

/// Fit `model` to `(xs, ys)` starting from `seed`.
pub fn optimize<const N: usize, M: FitModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    seed: [f64; N],
    config: &FitConfig,
) -> Result<FitResult<N>, FitFailure> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n < N {
        return Err(FitFailure::TooFewSamples {
            samples: n,
            params: N,
        });
    }

    let mut params = seed;
    model.constrain(&mut params);
    let mut chi2 = compute_chi2(model, xs, ys, &params);
    if !chi2.is_finite() {
        return Err(FitFailure::NonFinite);
    }

    let mut lambda = config.initial_lambda;
    let mut converged = chi2 == 0.0;
    let mut iterations = 0;
    let (mut hessian, mut gradient) = normal_equations(model, xs, ys, &params);

    while !converged && iterations < config.iteration_cap() {
        iterations += 1;

        let floor = 1e-12 * max_diagonal(&hessian).max(f64::MIN_POSITIVE);
        let mut damped = hessian;
        for (i, row) in damped.iter_mut().enumerate() {
            row[i] = row[i] * (1.0 + lambda) + lambda * floor;
        }

        let Some(delta) = solve(&damped, &gradient) else {
            lambda *= config.lambda_up;
            if lambda > MAX_LAMBDA {
                return Err(FitFailure::Singular);
            }
            continue;
        };

        let mut candidate = params;
        for (p, d) in candidate.iter_mut().zip(delta.iter()) {
            *p += d;
        }
        model.constrain(&mut candidate);
        let new_chi2 = compute_chi2(model, xs, ys, &candidate);

        let small_step = params
            .iter()
            .zip(delta.iter())
            .all(|(p, d)| d.abs() <= config.xtol * (p.abs() + config.xtol));

        if new_chi2.is_finite() && new_chi2 <= chi2 {
            let reduction = if chi2 > 0.0 { (chi2 - new_chi2) / chi2 } else { 0.0 };
            params = candidate;
            chi2 = new_chi2;
            lambda *= config.lambda_down;
            converged = small_step || reduction <= config.ftol || chi2 == 0.0;
            if !converged {
                (hessian, gradient) = normal_equations(model, xs, ys, &params);
            }
        } else if small_step {
            // Already at the minimum to within step tolerance.
            converged = true;
        } else {
            lambda *= config.lambda_up;
            if lambda > MAX_LAMBDA {
                break;
            }
        }
    }

    if !converged {
        tracing::debug!(iterations, chi2, "LM fit did not converge");
        return Err(FitFailure::NotConverged { iterations });
    }
    if params.iter().any(|p| !p.is_finite()) {
        return Err(FitFailure::NonFinite);
    }

    let covariance = if n > N {
        let (hessian, _) = normal_equations(model, xs, ys, &params);
        let s2 = chi2 / (n - N) as f64;
        invert(&hessian).map(|mut inv| {
            for row in inv.iter_mut() {
                for v in row.iter_mut() {
                    *v *= s2;
                }
            }
            inv
        })
    } else {
        None
    };

    Ok(FitResult {
        params,
        chi2,
        iterations,
        covariance,
    })
}

/// `JᵀJ` and `Jᵀr` at `params`.
fn normal_equations<const N: usize, M: FitModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let residual = y - model.evaluate(x, params);
        let row = model.jacobian_row(x, params);
        for i in 0..N {
            gradient[i] += row[i] * residual;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

#[inline]
fn compute_chi2<const N: usize, M: FitModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    params: &[f64; N],
) -> f64 {
    xs.iter()
        .zip(ys.iter())
        .map(|(&x, &y)| {
            let r = y - model.evaluate(x, params);
            r * r
        })
        .sum()
}

#[inline]
fn max_diagonal<const N: usize>(matrix: &[[f64; N]; N]) -> f64 {
    (0..N).fold(0.0f64, |acc, i| acc.max(matrix[i][i].abs()))
}
