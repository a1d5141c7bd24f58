//! Gaussian marginal-sum centroid.

use glam::DVec2;

use super::{check_sigma, solve_axes, AxisEstimate, MarginalCentroid, PointEstimate, Profile};
use crate::axis::{Axis, AxisSelector};
use crate::error::{Error, Result};
use crate::fit::{optimize, FitConfig, GaussianWithBackground};
use crate::image::{Image, Window};
use crate::math::{argmax, median_mut};

/// Fit a Gaussian on a constant background to the marginal mean profile of
/// the window `center ± (half_x, half_y)` along each selected axis.
///
/// The window is clipped to the image. The background seed is the median of
/// the whole window, so it is shared by both axes.
pub fn gms(
    image: &Image,
    center: DVec2,
    half_x: usize,
    half_y: usize,
    selector: AxisSelector,
    config: &FitConfig,
) -> Result<MarginalCentroid> {
    config.validate();
    let (window, background) = prepare(image, center, half_x, half_y)?;
    solve_axes(selector, |axis| {
        fit_axis(axis, &Profile::extract(image, &window, axis), background, config)
    })
}

/// [`gms`] over both axes.
pub fn gms_point(
    image: &Image,
    center: DVec2,
    half_x: usize,
    half_y: usize,
    config: &FitConfig,
) -> Result<PointEstimate> {
    config.validate();
    let (window, background) = prepare(image, center, half_x, half_y)?;
    let x = fit_axis(Axis::X, &Profile::extract(image, &window, Axis::X), background, config)?;
    let y = fit_axis(Axis::Y, &Profile::extract(image, &window, Axis::Y), background, config)?;
    Ok(PointEstimate::from_axes(&x, &y))
}

fn prepare(image: &Image, center: DVec2, half_x: usize, half_y: usize) -> Result<(Window, f64)> {
    let window = Window::clipped(center, half_x, half_y, image)?;
    let mut pixels = window.crop(image).into_vec();
    let background = median_mut(&mut pixels);
    Ok((window, background))
}

fn fit_axis(
    axis: Axis,
    profile: &Profile,
    background: f64,
    config: &FitConfig,
) -> Result<AxisEstimate> {
    let (peak_index, peak) = argmax(&profile.values);
    let seed = [
        background,
        peak - background,
        profile.coords[peak_index],
        1.0,
    ];

    let fit = optimize(
        &GaussianWithBackground,
        &profile.coords,
        &profile.values,
        seed,
        config,
    )
    .map_err(|reason| Error::FitDidNotConverge { axis, reason })?;

    let [_, amplitude, mean, sigma] = fit.params;
    let sigma = check_sigma(axis, sigma, profile.len())?;
    tracing::debug!(
        %axis,
        mean,
        sigma,
        amplitude,
        iterations = fit.iterations,
        "GMS fit"
    );

    Ok(AxisEstimate {
        center: mean,
        uncertainty: fit.std_error(2),
        width: sigma,
    })
}
