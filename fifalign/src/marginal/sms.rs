//! Sobel marginal-sum bisector centroid.
//!
//! Suited to flat-topped spots (defocused pinholes) where a single Gaussian
//! is a poor model: the two edges of the profile show up as peaks in the
//! squared derivative and the centroid is taken halfway between them.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{check_sigma, solve_axes, AxisEstimate, MarginalCentroid, PointEstimate, Profile};
use crate::axis::{Axis, AxisSelector};
use crate::error::{Error, Result};
use crate::fit::{optimize, FitConfig, TwoGaussians};
use crate::image::{Image, Window};
use crate::math::{argmax, median};

/// Minimum profile length for a central-difference derivative.
const MIN_PROFILE_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Replace pixels brighter than `median + 2 sqrt(median)` by the median
    /// before profiling, suppressing stray stars in the window.
    pub clip_stars: bool,
    /// Multiplier applied to the requested half-widths.
    pub enlarge: f64,
    pub fit: FitConfig,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            clip_stars: false,
            enlarge: 1.0,
            fit: FitConfig::default(),
        }
    }
}

impl SmsConfig {
    pub fn validate(&self) {
        assert!(self.enlarge >= 1.0, "enlarge must be at least 1.0");
        self.fit.validate();
    }

    fn enlarged(&self, half: usize) -> usize {
        (half as f64 * self.enlarge).round() as usize
    }
}

pub fn sms(
    image: &Image,
    center: DVec2,
    half_x: usize,
    half_y: usize,
    selector: AxisSelector,
    config: &SmsConfig,
) -> Result<MarginalCentroid> {
    config.validate();
    let region = SmsRegion::new(image, center, half_x, half_y, config)?;
    solve_axes(selector, |axis| region.fit_axis(axis, &config.fit))
}

/// [`sms`] over both axes.
pub fn sms_point(
    image: &Image,
    center: DVec2,
    half_x: usize,
    half_y: usize,
    config: &SmsConfig,
) -> Result<PointEstimate> {
    config.validate();
    let region = SmsRegion::new(image, center, half_x, half_y, config)?;
    let x = region.fit_axis(Axis::X, &config.fit)?;
    let y = region.fit_axis(Axis::Y, &config.fit)?;
    Ok(PointEstimate::from_axes(&x, &y))
}

/// Enlarged, optionally star-clipped copy of the window.
struct SmsRegion {
    window: Window,
    sub: Image,
}

impl SmsRegion {
    fn new(
        image: &Image,
        center: DVec2,
        half_x: usize,
        half_y: usize,
        config: &SmsConfig,
    ) -> Result<Self> {
        let window = Window::clipped(
            center,
            config.enlarged(half_x),
            config.enlarged(half_y),
            image,
        )?;
        let mut sub = window.crop(image);
        if config.clip_stars {
            clip_bright_pixels(sub.pixels_mut());
        }
        Ok(Self { window, sub })
    }

    fn fit_axis(&self, axis: Axis, config: &FitConfig) -> Result<AxisEstimate> {
        let local = Window {
            x0: 0,
            y0: 0,
            x1: self.window.width(),
            y1: self.window.height(),
        };
        let mut profile = Profile::extract(&self.sub, &local, axis);
        let origin = self.window.origin(axis) as f64;
        profile.coords.iter_mut().for_each(|c| *c += origin);
        fit_profile(axis, &profile, config)
    }
}

fn clip_bright_pixels(pixels: &mut [f64]) {
    let med = median(pixels);
    let threshold = med + 2.0 * med.max(0.0).sqrt();
    let mut clipped = 0usize;
    for p in pixels.iter_mut().filter(|p| **p > threshold) {
        *p = med;
        clipped += 1;
    }
    tracing::debug!(threshold, clipped, "SMS star clipping");
}

/// Squared central-difference derivative with clamped borders. The first
/// and last samples are zeroed.
fn squared_sobel(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let prev = values[i.saturating_sub(1)];
            let next = values[(i + 1).min(n - 1)];
            let d = next - prev;
            d * d
        })
        .collect();
    out[0] = 0.0;
    out[n - 1] = 0.0;
    out
}

fn fit_profile(axis: Axis, profile: &Profile, config: &FitConfig) -> Result<AxisEstimate> {
    let n = profile.len();
    if n < MIN_PROFILE_LEN {
        return Err(Error::WindowTooSmall {
            axis,
            samples: n,
            required: MIN_PROFILE_LEN,
        });
    }

    let edges = squared_sobel(&profile.values);
    let half = n / 2;
    let (left_index, left_peak) = argmax(&edges[..half]);
    let (right_index, right_peak) = argmax(&edges[half..]);
    let seed = [
        left_peak,
        profile.coords[left_index],
        1.0,
        right_peak,
        profile.coords[half + right_index],
        1.0,
    ];

    let fit = optimize(&TwoGaussians, &profile.coords, &edges, seed, config)
        .map_err(|reason| Error::FitDidNotConverge { axis, reason })?;

    let [_, m1, s1, _, m2, s2] = fit.params;
    check_sigma(axis, s1, n)?;
    check_sigma(axis, s2, n)?;

    let center = 0.5 * (m1 + m2);
    let separation = (m2 - m1).abs();
    let uncertainty = fit.covariance.and_then(|cov| {
        let e = 0.5 * (cov[1][1] + cov[4][4]).max(0.0).sqrt();
        e.is_finite().then_some(e)
    });
    tracing::debug!(%axis, m1, m2, center, separation, "SMS fit");

    Ok(AxisEstimate {
        center,
        uncertainty,
        width: separation,
    })
}
