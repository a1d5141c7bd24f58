//! Weighted-derivative centroid (DAOPHOT `cntrd` style).
//!
//! Closed form, no regression: the centroid offset within a small box around
//! the brightest pixel is found from where the weighted first difference of
//! the marginal profile crosses zero.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::{Error, Result};
use crate::image::{Image, Window};
use crate::math::{mean, median_mut};

/// Box half-size scale: `nhalf = floor(0.637 * fwhm)`.
const FWHM_TO_HALF_BOX: f64 = 0.637;
const MIN_HALF_BOX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeConfig {
    /// Extra pixels added around the box when searching for the maximum.
    pub extend_box: usize,
    /// Skip estimation and use this FWHM.
    pub fwhm: Option<f64>,
}

impl DerivativeConfig {
    pub fn validate(&self) {
        if let Some(fwhm) = self.fwhm {
            assert!(
                fwhm.is_finite() && fwhm >= 0.0,
                "fwhm must be finite and non-negative"
            );
        }
    }
}

/// Sub-pixel centroid and the integer pixel it was measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivativeCentroid {
    pub position: DVec2,
    /// Brightest pixel the working box was centered on.
    pub anchor: (usize, usize),
    /// `anchor - position`, per axis.
    pub offset: DVec2,
}

/// Rough FWHM from the number of pixels above half maximum.
///
/// The floor is the median; if that leaves no height above it (saturated or
/// flat images) the mean is used instead.
pub fn estimate_fwhm(image: &Image) -> f64 {
    if image.is_empty() {
        return 0.0;
    }
    let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut scratch = image.pixels().to_vec();
    let mut floor = median_mut(&mut scratch);
    let mut height = max - floor;
    if height == 0.0 {
        floor = mean(image.pixels());
        height = max - floor;
    }
    let threshold = floor + 0.5 * height;
    let above = image.iter().filter(|&&p| p > threshold).count();
    (above as f64).sqrt()
}

/// Half-size of the working box for a given FWHM.
#[inline]
pub fn half_box(fwhm: f64) -> usize {
    ((FWHM_TO_HALF_BOX * fwhm).floor() as usize).max(MIN_HALF_BOX)
}

/// Weighted-derivative centroider for one image geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivativeSearch {
    nhalf: usize,
    extend_box: usize,
}

impl DerivativeSearch {
    /// Box size from `config.fwhm`, or estimated from `image`.
    pub fn new(image: &Image, config: &DerivativeConfig) -> Self {
        config.validate();
        let fwhm = config.fwhm.unwrap_or_else(|| estimate_fwhm(image));
        let nhalf = half_box(fwhm);
        tracing::debug!(fwhm, nhalf, "derivative search box");
        Self {
            nhalf,
            extend_box: config.extend_box,
        }
    }

    #[inline]
    pub fn half_box(&self) -> usize {
        self.nhalf
    }

    pub fn locate(&self, image: &Image, guess: DVec2) -> Result<DerivativeCentroid> {
        self.locate_inner(image, guess).inspect_err(|err| {
            tracing::debug!(x = guess.x, y = guess.y, error = %err, "derivative centroid rejected");
        })
    }

    fn locate_inner(&self, image: &Image, guess: DVec2) -> Result<DerivativeCentroid> {
        let nhalf = self.nhalf;
        let search = Window::strict(
            guess.x.round() as i64,
            guess.y.round() as i64,
            nhalf + self.extend_box,
            image,
        )?;

        let (ax, ay) = tied_max(image, &search);
        let working = Window::strict(ax as i64, ay as i64, nhalf, image)?;
        let patch = working.crop(image);

        let dx = axis_offset(&patch, nhalf, Axis::X)?;
        let dy = axis_offset(&patch, nhalf, Axis::Y)?;
        let offset = DVec2::new(dx, dy);

        Ok(DerivativeCentroid {
            position: DVec2::new(ax as f64, ay as f64) - offset,
            anchor: (ax, ay),
            offset,
        })
    }
}

/// Brightest pixel in `window`; tied maxima are averaged and rounded.
fn tied_max(image: &Image, window: &Window) -> (usize, usize) {
    let mut best = f64::NEG_INFINITY;
    let (mut sx, mut sy, mut count) = (0usize, 0usize, 0usize);
    for y in window.y_range() {
        for x in window.x_range() {
            let v = image[(x, y)];
            if v > best {
                best = v;
                (sx, sy, count) = (x, y, 1);
            } else if v == best {
                sx += x;
                sy += y;
                count += 1;
            }
        }
    }
    let avg = |sum: usize| (sum as f64 / count as f64).round() as usize;
    (avg(sx), avg(sy))
}

/// Sub-pixel offset of the peak from the box center along `axis`.
fn axis_offset(patch: &Image, nhalf: usize, axis: Axis) -> Result<f64> {
    let nbox = 2 * nhalf + 1;
    let ir = nhalf.saturating_sub(1).max(1);
    let band = (nhalf - ir)..=(nhalf + ir);

    let at = |along: usize, across: usize| match axis {
        Axis::X => patch[(along, across)],
        Axis::Y => patch[(across, along)],
    };

    let (mut sumc, mut sumd, mut sumxd, mut sumxsq) = (0.0, 0.0, 0.0, 0.0);
    for k in 0..nbox - 1 {
        let d = k as f64 + 0.5 - nhalf as f64;
        let w = 1.0 - 0.5 * (d.abs() - 0.5) / (nhalf as f64 - 0.5);
        let deriv: f64 = band.clone().map(|j| at(k + 1, j) - at(k, j)).sum();
        sumc += w;
        sumd += w * deriv;
        sumxd += w * d * deriv;
        sumxsq += w * d * d;
    }

    if sumxd >= 0.0 {
        return Err(Error::MonotonicityViolation { axis });
    }
    let offset = sumxsq * sumd / (sumc * sumxd);
    if offset.abs() > nhalf as f64 {
        return Err(Error::CentroidOutOfBox {
            axis,
            offset,
            half_size: nhalf,
        });
    }
    Ok(offset)
}

/// Centroid every guess in one image, sharing the box size.
pub fn derivative_centroids(
    image: &Image,
    guesses: &[DVec2],
    config: &DerivativeConfig,
) -> Vec<Result<DerivativeCentroid>> {
    let search = DerivativeSearch::new(image, config);
    guesses.iter().map(|&g| search.locate(image, g)).collect()
}

/// Centroid the same guesses in every image of a stack.
///
/// Warns when an image's shape differs from the one before it.
pub fn centroid_stack(
    images: &[Image],
    guesses: &[DVec2],
    config: &DerivativeConfig,
) -> Vec<Vec<Result<DerivativeCentroid>>> {
    let mut previous: Option<(usize, usize)> = None;
    images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let shape = image.shape();
            if let Some(prev) = previous.filter(|&prev| prev != shape) {
                tracing::warn!(
                    index,
                    ?shape,
                    previous = ?prev,
                    "image size differs from previous image"
                );
            }
            previous = Some(shape);
            derivative_centroids(image, guesses, config)
        })
        .collect()
}

#[cfg(test)]
mod tests;
