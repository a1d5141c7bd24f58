//! Best-focus estimation from a through-focus image stack.
//!
//! Every image is reduced to a dispersion score. A polynomial fitted to
//! score against distance locates the turning point of the curve, which
//! splits the samples into two near-linear branches; best focus is where the
//! straight-line fits of the two branches cross.
//!
//! The score assumes sharper spots spread intensity further from the mean.
//! Which way the curve opens depends on the rig and is not checked.

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::math::{std_dev, Line, Polynomial};

/// Samples needed on each side of the split for a line fit.
const MIN_BRANCH_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Order of the polynomial used to find the split.
    pub order: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { order: 2 }
    }
}

/// One image of the stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusSample {
    pub distance: f64,
    pub score: f64,
}

impl FocusSample {
    pub fn from_image(distance: f64, image: &Image) -> Self {
        Self {
            distance,
            score: focus_score(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocusSolution {
    /// Distance where the branch lines intersect.
    pub best_focus: f64,
    /// Score of the branch lines at `best_focus`.
    pub score_at_best: f64,
    /// Stationary point of the polynomial separating the branches.
    pub split: f64,
    pub left: Line,
    pub right: Line,
    pub polynomial: Polynomial,
    /// Input samples sorted by distance.
    pub samples: Vec<FocusSample>,
}

impl FocusSolution {
    /// True when the branches slope in opposite directions (a proper V).
    pub fn is_v_shaped(&self) -> bool {
        self.left.slope.signum() != self.right.slope.signum()
    }
}

/// Population standard deviation of all pixels.
pub fn focus_score(image: &Image) -> f64 {
    if image.is_empty() {
        return 0.0;
    }
    std_dev(image.pixels())
}

/// Focus distance encoded in a file-name-like label: the stem without
/// directory or extension, e.g. `"scans/1250.fits"` → 1250.
pub fn distance_from_label(label: &str) -> Result<f64> {
    let invalid = || Error::InvalidDistanceLabel(label.to_string());
    let stem = Path::new(label.trim())
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid)?;
    let distance: f64 = stem.trim().parse().map_err(|_| invalid())?;
    if !distance.is_finite() {
        return Err(invalid());
    }
    Ok(distance)
}

pub fn solve_focus_curve(samples: &[FocusSample], config: &FocusConfig) -> Result<FocusSolution> {
    let order = config.order;
    if order < 2 {
        return Err(Error::UnsupportedPolynomialOrder(order));
    }
    if samples.len() < order + 1 {
        return Err(Error::TooFewFocusSamples {
            found: samples.len(),
            required: order + 1,
        });
    }
    if samples
        .iter()
        .any(|s| !s.distance.is_finite() || !s.score.is_finite())
    {
        return Err(Error::DegenerateFit("non-finite focus sample"));
    }

    let mut samples = samples.to_vec();
    samples.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let distances: Vec<f64> = samples.iter().map(|s| s.distance).collect();
    let scores: Vec<f64> = samples.iter().map(|s| s.score).collect();

    let polynomial = Polynomial::fit(&distances, &scores, order)
        .ok_or(Error::DegenerateFit("singular polynomial normal equations"))?;
    let lo = distances[0];
    let hi = distances[distances.len() - 1];
    let split = polynomial
        .stationary_point(lo, hi)
        .ok_or(Error::DegenerateFit("polynomial has no stationary point"))?;

    let cut = distances.partition_point(|&d| d <= split);
    let (left_x, right_x) = distances.split_at(cut);
    let (left_y, right_y) = scores.split_at(cut);
    if left_x.len() < MIN_BRANCH_SAMPLES || right_x.len() < MIN_BRANCH_SAMPLES {
        tracing::debug!(split, left = left_x.len(), right = right_x.len(), "focus split");
        return Err(Error::InsufficientSamples {
            left: left_x.len(),
            right: right_x.len(),
        });
    }

    let left = Line::fit(left_x, left_y)
        .ok_or(Error::DegenerateFit("repeated distances in left branch"))?;
    let right = Line::fit(right_x, right_y)
        .ok_or(Error::DegenerateFit("repeated distances in right branch"))?;
    let crossing = left
        .intersection(&right)
        .ok_or(Error::DegenerateFit("branch lines are parallel"))?;

    tracing::info!(
        best_focus = crossing.x,
        split,
        left_slope = left.slope,
        right_slope = right.slope,
        "focus curve solved"
    );

    Ok(FocusSolution {
        best_focus: crossing.x,
        score_at_best: crossing.y,
        split,
        left,
        right,
        polynomial,
        samples,
    })
}

/// Score each image and solve. `(distance, image)` pairs need not be sorted.
pub fn solve_focus_stack<'a>(
    stack: impl IntoIterator<Item = (f64, &'a Image)>,
    config: &FocusConfig,
) -> Result<FocusSolution> {
    let samples: Vec<FocusSample> = stack
        .into_iter()
        .map(|(distance, image)| FocusSample::from_image(distance, image))
        .collect();
    solve_focus_curve(&samples, config)
}

/// Parse a distance from each label, pair it with its image and solve.
pub fn solve_from_labelled_images<S: AsRef<str>>(
    labels: &[S],
    images: &[Image],
    config: &FocusConfig,
) -> Result<FocusSolution> {
    if labels.len() != images.len() {
        return Err(Error::LabelCountMismatch {
            labels: labels.len(),
            images: images.len(),
        });
    }
    let distances = labels
        .iter()
        .map(|label| distance_from_label(label.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    solve_focus_stack(distances.into_iter().zip(images.iter()), config)
}
