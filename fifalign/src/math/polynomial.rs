//! Least-squares polynomial and straight-line fits.

use glam::DVec2;

use super::linear_solver::solve_dynamic;

/// Grid resolution used to bracket derivative roots of higher-order fits.
const ROOT_SCAN_STEPS: usize = 512;
const BISECTION_ITERATIONS: usize = 60;

/// Polynomial fitted in normalized coordinates `t = (x - shift) / scale`.
///
/// Normalizing keeps the normal equations well conditioned when `x` is a
/// raw focus distance in the hundreds or thousands.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients of `t^0, t^1, ...`.
    coeffs: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// Ordinary least-squares fit of the given order.
    ///
    /// Returns `None` with fewer than `order + 1` samples or when the
    /// normal equations are singular (e.g. repeated abscissae).
    pub fn fit(xs: &[f64], ys: &[f64], order: usize) -> Option<Self> {
        assert_eq!(xs.len(), ys.len(), "xs and ys must have equal length");
        let terms = order + 1;
        if xs.len() < terms {
            return None;
        }

        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let shift = 0.5 * (lo + hi);
        let half_span = 0.5 * (hi - lo);
        let scale = if half_span > 0.0 { half_span } else { 1.0 };

        // Normal equations: (A^T A) c = A^T y with A[i][k] = t_i^k
        let mut ata = vec![vec![0.0; terms]; terms];
        let mut aty = vec![0.0; terms];
        let mut powers = vec![0.0; terms];
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let t = (x - shift) / scale;
            let mut p = 1.0;
            for power in powers.iter_mut() {
                *power = p;
                p *= t;
            }
            for i in 0..terms {
                aty[i] += powers[i] * y;
                for j in 0..terms {
                    ata[i][j] += powers[i] * powers[j];
                }
            }
        }

        let coeffs = solve_dynamic(&ata, &aty)?;
        if coeffs.iter().any(|c| !c.is_finite()) {
            return None;
        }

        Some(Self {
            coeffs,
            shift,
            scale,
        })
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    #[inline]
    fn normalize(&self, x: f64) -> f64 {
        (x - self.shift) / self.scale
    }

    /// Value at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        horner(&self.coeffs, self.normalize(x))
    }

    /// First derivative `dP/dx` at `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        let t = self.normalize(x);
        horner(&derivative_coeffs(&self.coeffs), t) / self.scale
    }

    /// Coefficients of `x^0, x^1, ...` in raw (unnormalized) coordinates.
    pub fn raw_coefficients(&self) -> Vec<f64> {
        // P(x) = Σ c_k ((x - s) / h)^k, expanded binomially.
        let n = self.coeffs.len();
        let mut raw = vec![0.0; n];
        for (k, &c) in self.coeffs.iter().enumerate() {
            let factor = c / self.scale.powi(k as i32);
            let mut binom = 1.0;
            for j in 0..=k {
                // term: binom(k, j) x^j (-s)^(k-j)
                raw[j] += factor * binom * (-self.shift).powi((k - j) as i32);
                binom = binom * (k - j) as f64 / (j + 1) as f64;
            }
        }
        raw
    }

    /// Abscissa where the derivative vanishes.
    ///
    /// Order 2 uses the closed-form vertex, which may fall outside
    /// `[lo, hi]`. Higher orders bracket sign changes of the derivative
    /// inside `[lo, hi]` and return the most pronounced stationary point.
    pub fn stationary_point(&self, lo: f64, hi: f64) -> Option<f64> {
        match self.order() {
            0 | 1 => None,
            2 => {
                let (b, a) = (self.coeffs[1], self.coeffs[2]);
                if a == 0.0 {
                    return None;
                }
                let t = -b / (2.0 * a);
                Some(self.shift + self.scale * t)
            }
            _ => self.scan_stationary_point(lo, hi),
        }
    }

    fn scan_stationary_point(&self, lo: f64, hi: f64) -> Option<f64> {
        let deriv = derivative_coeffs(&self.coeffs);
        let (t_lo, t_hi) = (self.normalize(lo), self.normalize(hi));
        let step = (t_hi - t_lo) / ROOT_SCAN_STEPS as f64;
        let baseline = 0.5 * (horner(&self.coeffs, t_lo) + horner(&self.coeffs, t_hi));

        let mut best: Option<(f64, f64)> = None;
        let mut a = t_lo;
        let mut fa = horner(&deriv, a);
        for i in 1..=ROOT_SCAN_STEPS {
            let b = t_lo + step * i as f64;
            let fb = horner(&deriv, b);
            if fa == 0.0 || fa.signum() != fb.signum() {
                let root = bisect(&deriv, a, b);
                let prominence = (horner(&self.coeffs, root) - baseline).abs();
                if best.map_or(true, |(_, p)| prominence > p) {
                    best = Some((root, prominence));
                }
            }
            a = b;
            fa = fb;
        }

        best.map(|(t, _)| self.shift + self.scale * t)
    }
}

/// Straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// Ordinary least-squares line. Needs at least two distinct abscissae.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        assert_eq!(xs.len(), ys.len(), "xs and ys must have equal length");
        if xs.len() < 2 {
            return None;
        }
        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            sxx += (x - mean_x) * (x - mean_x);
            sxy += (x - mean_x) * (y - mean_y);
        }
        if sxx <= 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Crossing point with `other`; `None` for parallel lines.
    pub fn intersection(&self, other: &Line) -> Option<DVec2> {
        let denom = self.slope - other.slope;
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let x = (other.intercept - self.intercept) / denom;
        Some(DVec2::new(x, self.eval(x)))
    }
}

#[inline]
fn horner(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

fn derivative_coeffs(coeffs: &[f64]) -> Vec<f64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, &c)| k as f64 * c)
        .collect()
}

fn bisect(coeffs: &[f64], mut a: f64, mut b: f64) -> f64 {
    let mut fa = horner(coeffs, a);
    if fa == 0.0 {
        return a;
    }
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (a + b);
        let fm = horner(coeffs, mid);
        if fm == 0.0 {
            return mid;
        }
        if fm.signum() == fa.signum() {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
    }
    0.5 * (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_exact_quadratic() {
        // y = 2x^2 - 3x + 1
        let xs: Vec<f64> = (0..7).map(|i| 100.0 + 50.0 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * x * x - 3.0 * x + 1.0).collect();
        let poly = Polynomial::fit(&xs, &ys, 2).unwrap();
        assert_eq!(poly.order(), 2);
        for &x in &xs {
            let expected = 2.0 * x * x - 3.0 * x + 1.0;
            assert!((poly.eval(x) - expected).abs() < 1e-6 * expected.abs());
        }
        let raw = poly.raw_coefficients();
        assert!((raw[0] - 1.0).abs() < 1e-4);
        assert!((raw[1] + 3.0).abs() < 1e-6);
        assert!((raw[2] - 2.0).abs() < 1e-9);
        assert!((poly.derivative(200.0) - (4.0 * 200.0 - 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_quadratic_vertex() {
        // y = (x - 320)^2 + 5
        let xs = [100.0, 200.0, 300.0, 400.0, 500.0];
        let ys: Vec<f64> = xs.iter().map(|&x| (x - 320.0) * (x - 320.0) + 5.0).collect();
        let poly = Polynomial::fit(&xs, &ys, 2).unwrap();
        let vertex = poly.stationary_point(100.0, 500.0).unwrap();
        assert!((vertex - 320.0).abs() < 1e-6);
    }

    #[test]
    fn test_underdetermined_fit_is_none() {
        assert!(Polynomial::fit(&[1.0, 2.0], &[1.0, 2.0], 2).is_none());
        // Repeated abscissa: singular normal equations
        assert!(Polynomial::fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], 2).is_none());
    }

    #[test]
    fn test_quartic_stationary_point_by_scan() {
        // y = (x - 2.5)^4 + (x - 2.5)^2 has a single minimum at 2.5
        let xs: Vec<f64> = (0..11).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|&x| (x - 2.5f64).powi(4) + (x - 2.5f64).powi(2))
            .collect();
        let poly = Polynomial::fit(&xs, &ys, 4).unwrap();
        let root = poly.stationary_point(0.0, 5.0).unwrap();
        assert!((root - 2.5).abs() < 1e-6, "root = {root}");
    }

    #[test]
    fn test_line_fit_and_intersection() {
        let left = Line::fit(&[0.0, 1.0, 2.0], &[4.0, 2.0, 0.0]).unwrap();
        assert!((left.slope + 2.0).abs() < 1e-12);
        assert!((left.intercept - 4.0).abs() < 1e-12);

        let right = Line::fit(&[2.0, 3.0], &[0.0, 1.0]).unwrap();
        let p = left.intersection(&right).unwrap();
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);

        assert!(left.intersection(&left).is_none());
        assert!(Line::fit(&[1.0], &[1.0]).is_none());
        assert!(Line::fit(&[1.0, 1.0], &[0.0, 2.0]).is_none());
    }
}
