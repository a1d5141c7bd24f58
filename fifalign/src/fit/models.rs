//! 1D Gaussian profile models.
//!
//! Parameter order is part of the contract: seeds built by the centroiders
//! index into these arrays directly.
//!
//! - [`Gaussian`]: `[amplitude, mean, sigma]`
//! - [`GaussianWithBackground`]: `[background, amplitude, mean, sigma]`
//! - [`TwoGaussians`]: `[a1, m1, s1, a2, m2, s2]`

/// Sigmas are kept at least this far from zero while iterating.
const MIN_SIGMA: f64 = 1e-3;

/// A model that can be fit with [`super::optimize`].
pub trait FitModel<const N: usize> {
    /// Model value at `x`.
    fn evaluate(&self, x: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives with respect to each parameter at `x`.
    fn jacobian_row(&self, x: f64, params: &[f64; N]) -> [f64; N];

    /// Keep parameters in a numerically safe region after an update.
    fn constrain(&self, _params: &mut [f64; N]) {}

    /// Model values over a coordinate array.
    fn evaluate_all(&self, xs: &[f64], params: &[f64; N]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x, params)).collect()
    }
}

/// `a * exp(-(x - m)^2 / (2 s^2))`
#[inline]
pub fn gaussian(x: f64, [a, m, s]: [f64; 3]) -> f64 {
    let d = x - m;
    a * (-(d * d) / (2.0 * s * s)).exp()
}

/// `b + a * exp(-(x - m)^2 / (2 s^2))`
#[inline]
pub fn gaussian_with_background(x: f64, [b, a, m, s]: [f64; 4]) -> f64 {
    b + gaussian(x, [a, m, s])
}

/// `a1 * exp(-(x - m1)^2 / (2 s1^2)) + a2 * exp(-(x - m2)^2 / (2 s2^2))`
#[inline]
pub fn two_gaussians(x: f64, [a1, m1, s1, a2, m2, s2]: [f64; 6]) -> f64 {
    gaussian(x, [a1, m1, s1]) + gaussian(x, [a2, m2, s2])
}

/// Derivatives of a single Gaussian term w.r.t. `[a, m, s]`.
#[inline]
fn gaussian_partials(x: f64, a: f64, m: f64, s: f64) -> [f64; 3] {
    let d = x - m;
    let s2 = s * s;
    let e = (-(d * d) / (2.0 * s2)).exp();
    let ae = a * e;
    [e, ae * d / s2, ae * d * d / (s2 * s)]
}

#[inline]
fn keep_sigma_off_zero(sigma: &mut f64) {
    if sigma.abs() < MIN_SIGMA {
        *sigma = if *sigma < 0.0 { -MIN_SIGMA } else { MIN_SIGMA };
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl FitModel<3> for Gaussian {
    #[inline]
    fn evaluate(&self, x: f64, params: &[f64; 3]) -> f64 {
        gaussian(x, *params)
    }

    #[inline]
    fn jacobian_row(&self, x: f64, params: &[f64; 3]) -> [f64; 3] {
        let [a, m, s] = *params;
        gaussian_partials(x, a, m, s)
    }

    fn constrain(&self, params: &mut [f64; 3]) {
        keep_sigma_off_zero(&mut params[2]);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianWithBackground;

impl FitModel<4> for GaussianWithBackground {
    #[inline]
    fn evaluate(&self, x: f64, params: &[f64; 4]) -> f64 {
        gaussian_with_background(x, *params)
    }

    #[inline]
    fn jacobian_row(&self, x: f64, params: &[f64; 4]) -> [f64; 4] {
        let [_b, a, m, s] = *params;
        let [da, dm, ds] = gaussian_partials(x, a, m, s);
        [1.0, da, dm, ds]
    }

    fn constrain(&self, params: &mut [f64; 4]) {
        keep_sigma_off_zero(&mut params[3]);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoGaussians;

impl FitModel<6> for TwoGaussians {
    #[inline]
    fn evaluate(&self, x: f64, params: &[f64; 6]) -> f64 {
        two_gaussians(x, *params)
    }

    #[inline]
    fn jacobian_row(&self, x: f64, params: &[f64; 6]) -> [f64; 6] {
        let [a1, m1, s1, a2, m2, s2] = *params;
        let [da1, dm1, ds1] = gaussian_partials(x, a1, m1, s1);
        let [da2, dm2, ds2] = gaussian_partials(x, a2, m2, s2);
        [da1, dm1, ds1, da2, dm2, ds2]
    }

    fn constrain(&self, params: &mut [f64; 6]) {
        keep_sigma_off_zero(&mut params[2]);
        keep_sigma_off_zero(&mut params[5]);
    }
}
