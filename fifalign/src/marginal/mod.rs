//! Marginal-sum centroiders.
//!
//! Both methods collapse a window to a 1D mean profile per requested axis
//! and fit Gaussian models to it:
//!
//! - [`gms`]: one Gaussian on a constant background, centroid = fitted mean.
//! - [`sms`]: two Gaussians on the squared Sobel derivative of the profile,
//!   centroid = midpoint of the two edges (bisector).

pub mod gms;
pub mod sms;


pub use gms::{gms, gms_point};
pub use sms::{sms, sms_point, SmsConfig};

use glam::DVec2;

use crate::axis::{Axis, AxisSelector};
use crate::error::{Error, FitFailure};
use crate::image::{Image, Window};

/// Per-axis outcome of a marginal fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEstimate {
    /// Centroid coordinate in the input image frame.
    pub center: f64,
    /// One-sigma uncertainty of `center`, when the fit produced a covariance.
    pub uncertainty: Option<f64>,
    /// Fitted sigma for GMS, edge-to-edge separation for SMS.
    pub width: f64,
}

/// Result of a marginal-sum centroid over one or both axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarginalCentroid {
    pub x: Option<AxisEstimate>,
    pub y: Option<AxisEstimate>,
}

impl MarginalCentroid {
    pub fn get(&self, axis: Axis) -> Option<&AxisEstimate> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
        }
    }

    fn set(&mut self, axis: Axis, estimate: AxisEstimate) {
        match axis {
            Axis::X => self.x = Some(estimate),
            Axis::Y => self.y = Some(estimate),
        }
    }

    /// Both coordinates, when both axes were solved.
    pub fn position(&self) -> Option<DVec2> {
        Some(DVec2::new(self.x?.center, self.y?.center))
    }

    /// Per-axis uncertainty, when both axes carry one.
    pub fn uncertainty(&self) -> Option<DVec2> {
        Some(DVec2::new(self.x?.uncertainty?, self.y?.uncertainty?))
    }
}

/// Two-axis centroid with optional per-axis uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEstimate {
    pub position: DVec2,
    pub uncertainty: Option<DVec2>,
}

impl PointEstimate {
    pub(crate) fn from_axes(x: &AxisEstimate, y: &AxisEstimate) -> Self {
        Self {
            position: DVec2::new(x.center, y.center),
            uncertainty: x
                .uncertainty
                .zip(y.uncertainty)
                .map(|(ex, ey)| DVec2::new(ex, ey)),
        }
    }
}

/// Mean profile of a window along one axis, with image-frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Profile {
    pub coords: Vec<f64>,
    pub values: Vec<f64>,
}

impl Profile {
    /// Mean per column for [`Axis::X`], mean per row for [`Axis::Y`].
    pub fn extract(image: &Image, window: &Window, axis: Axis) -> Self {
        let len = window.len(axis);
        let mut sums = vec![0.0; len];
        for y in window.y_range() {
            let row = &image.row(y)[window.x_range()];
            match axis {
                Axis::X => {
                    for (sum, &v) in sums.iter_mut().zip(row) {
                        *sum += v;
                    }
                }
                Axis::Y => sums[y - window.y0] += row.iter().sum::<f64>(),
            }
        }

        let count = window.len(axis.orthogonal()) as f64;
        let origin = window.origin(axis);
        Self {
            coords: (0..len).map(|i| (origin + i) as f64).collect(),
            values: sums.into_iter().map(|s| s / count).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Run `solve` for every axis in `selector`.
pub(crate) fn solve_axes(
    selector: AxisSelector,
    mut solve: impl FnMut(Axis) -> crate::Result<AxisEstimate>,
) -> crate::Result<MarginalCentroid> {
    let mut centroid = MarginalCentroid::default();
    for &axis in selector.axes() {
        centroid.set(axis, solve(axis)?);
    }
    Ok(centroid)
}

/// Fitted sigma must be non-zero and no wider than the profile.
pub(crate) fn check_sigma(axis: Axis, sigma: f64, profile_len: usize) -> crate::Result<f64> {
    let sigma = sigma.abs();
    if !sigma.is_finite() || sigma == 0.0 || sigma > profile_len as f64 {
        return Err(Error::FitDidNotConverge {
            axis,
            reason: FitFailure::InvalidSigma { sigma },
        });
    }
    Ok(sigma)
}
